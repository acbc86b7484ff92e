//! Declarative input schemas: validation, defaulting and JSON Schema export.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use serde_json::{json, Map, Value as JsonValue};

use crate::core::error::CapabilityError;

pub type JsonObject = Map<String, JsonValue>;

// local@label.label.tld; leading and doubled dots are rejected in `is_email`.
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@(?:[A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Absolute URL.
    Url,
    Email,
    Text { non_empty: bool },
    Integer { min: i64, max: i64 },
    Boolean,
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Int(i64),
    Bool(bool),
    Str(&'static str),
}

impl From<DefaultValue> for ParamValue {
    fn from(d: DefaultValue) -> Self {
        match d {
            DefaultValue::Int(v) => ParamValue::Int(v),
            DefaultValue::Bool(v) => ParamValue::Bool(v),
            DefaultValue::Str(v) => ParamValue::Str(v.to_owned()),
        }
    }
}

/// One declared input field. A field without a default is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ParamKind,
    pub default: Option<DefaultValue>,
}

impl ParamSpec {
    pub const fn required(name: &'static str, description: &'static str, kind: ParamKind) -> Self {
        Self { name, description, kind, default: None }
    }

    pub const fn optional(
        name: &'static str,
        description: &'static str,
        kind: ParamKind,
        default: DefaultValue,
    ) -> Self {
        Self { name, description, kind, default: Some(default) }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    fn check(&self, raw: &JsonValue) -> Result<ParamValue, CapabilityError> {
        let invalid = |reason: String| CapabilityError::validation(self.name, reason);
        match self.kind {
            ParamKind::Integer { min, max } => {
                let n = coerce_integer(raw).ok_or_else(|| invalid("expected an integer".into()))?;
                if n < min || n > max {
                    return Err(invalid(format!("must be between {min} and {max}, got {n}")));
                }
                Ok(ParamValue::Int(n))
            }
            ParamKind::Boolean => coerce_bool(raw)
                .map(ParamValue::Bool)
                .ok_or_else(|| invalid("expected a boolean".into())),
            ParamKind::Url => {
                let s = expect_str(raw).ok_or_else(|| invalid("expected a string".into()))?;
                Url::parse(s).map_err(|e| invalid(format!("must be a valid URL ({e})")))?;
                Ok(ParamValue::Str(s.to_owned()))
            }
            ParamKind::Email => {
                let s = expect_str(raw).ok_or_else(|| invalid("expected a string".into()))?;
                if !is_email(s) {
                    return Err(invalid("must be a valid email address".into()));
                }
                Ok(ParamValue::Str(s.to_owned()))
            }
            ParamKind::Text { non_empty } => {
                let s = expect_str(raw).ok_or_else(|| invalid("expected a string".into()))?;
                if non_empty && s.is_empty() {
                    return Err(invalid("must not be empty".into()));
                }
                Ok(ParamValue::Str(s.to_owned()))
            }
            ParamKind::Choice(options) => {
                let s = expect_str(raw).ok_or_else(|| invalid("expected a string".into()))?;
                if !options.contains(&s) {
                    return Err(invalid(format!("must be one of {}", options.join(", "))));
                }
                Ok(ParamValue::Str(s.to_owned()))
            }
        }
    }

    fn json_schema(&self) -> JsonValue {
        let mut prop = match self.kind {
            ParamKind::Url => json!({ "type": "string", "format": "uri" }),
            ParamKind::Email => json!({ "type": "string", "format": "email" }),
            ParamKind::Text { non_empty: true } => json!({ "type": "string", "minLength": 1 }),
            ParamKind::Text { non_empty: false } => json!({ "type": "string" }),
            ParamKind::Integer { min, max } => {
                json!({ "type": "integer", "minimum": min, "maximum": max })
            }
            ParamKind::Boolean => json!({ "type": "boolean" }),
            ParamKind::Choice(options) => json!({ "type": "string", "enum": options }),
        };
        prop["description"] = json!(self.description);
        if let Some(default) = self.default {
            prop["default"] = ParamValue::from(default).to_json();
        }
        prop
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl ParamValue {
    /// Query-string rendering (`true`/`false`, decimal integers).
    pub fn to_query(&self) -> String {
        match self {
            ParamValue::Str(s) => s.clone(),
            ParamValue::Int(n) => n.to_string(),
            ParamValue::Bool(b) => b.to_string(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            ParamValue::Str(s) => json!(s),
            ParamValue::Int(n) => json!(n),
            ParamValue::Bool(b) => json!(b),
        }
    }
}

/// Validated arguments in schema order, defaults filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(&'static str, ParamValue)>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> {
        self.0.iter().map(|(n, v)| (*n, v))
    }
}

/// Validate raw invocation arguments against `specs`. Unknown keys are
/// ignored; `null` counts as absent.
pub fn validate(specs: &[ParamSpec], args: &JsonObject) -> Result<Params, CapabilityError> {
    let mut out = Vec::with_capacity(specs.len());
    for spec in specs {
        let value = match args.get(spec.name).filter(|v| !v.is_null()) {
            Some(raw) => spec.check(raw)?,
            None => match spec.default {
                Some(default) => default.into(),
                None => return Err(CapabilityError::validation(spec.name, "is required")),
            },
        };
        out.push((spec.name, value));
    }
    Ok(Params(out))
}

/// JSON Schema advertised in `tools/list`.
pub fn input_schema(specs: &[ParamSpec]) -> JsonObject {
    let properties: JsonObject = specs
        .iter()
        .map(|s| (s.name.to_owned(), s.json_schema()))
        .collect();
    let required: Vec<&str> = specs.iter().filter(|s| s.is_required()).map(|s| s.name).collect();
    let mut schema = JsonObject::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), JsonValue::Object(properties));
    schema.insert("required".into(), json!(required));
    schema.insert("additionalProperties".into(), json!(false));
    schema
}

pub fn is_email(s: &str) -> bool {
    !s.starts_with('.') && !s.contains("..") && EMAIL.is_match(s)
}

fn expect_str(raw: &JsonValue) -> Option<&str> {
    raw.as_str()
}

fn coerce_integer(raw: &JsonValue) -> Option<i64> {
    match raw {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_bool(raw: &JsonValue) -> Option<bool> {
    match raw {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: ParamSpec = ParamSpec::optional(
        "width",
        "Viewport width",
        ParamKind::Integer { min: 320, max: 3840 },
        DefaultValue::Int(1280),
    );
    const URL: ParamSpec = ParamSpec::required("url", "URL", ParamKind::Url);
    const KIND: ParamSpec = ParamSpec::optional(
        "type",
        "Alert type",
        ParamKind::Choice(&["latest", "whales", "launches"]),
        DefaultValue::Str("latest"),
    );

    fn obj(v: JsonValue) -> JsonObject {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn integer_bounds_are_inclusive() {
        for ok in [320, 3840] {
            let p = validate(&[WIDTH], &obj(json!({ "width": ok }))).unwrap();
            assert_eq!(p.get("width"), Some(&ParamValue::Int(ok)));
        }
        for bad in [319, 3841] {
            let err = validate(&[WIDTH], &obj(json!({ "width": bad }))).unwrap_err();
            assert_eq!(err.kind(), "validation");
            assert!(err.to_string().contains("width"));
        }
    }

    #[test]
    fn defaults_fill_missing_and_null_fields() {
        let p = validate(&[WIDTH, KIND], &obj(json!({ "width": null }))).unwrap();
        assert_eq!(p.get("width"), Some(&ParamValue::Int(1280)));
        assert_eq!(p.get("type"), Some(&ParamValue::Str("latest".into())));
    }

    #[test]
    fn missing_required_field_fails() {
        let err = validate(&[URL], &JsonObject::new()).unwrap_err();
        assert_eq!(err.to_string(), "invalid argument `url`: is required");
    }

    #[test]
    fn coerces_integral_floats_and_numeric_strings() {
        let p = validate(&[WIDTH], &obj(json!({ "width": 1024.0 }))).unwrap();
        assert_eq!(p.get("width"), Some(&ParamValue::Int(1024)));
        let p = validate(&[WIDTH], &obj(json!({ "width": " 800 " }))).unwrap();
        assert_eq!(p.get("width"), Some(&ParamValue::Int(800)));
        assert!(validate(&[WIDTH], &obj(json!({ "width": 1024.5 }))).is_err());
        assert!(validate(&[WIDTH], &obj(json!({ "width": true }))).is_err());
    }

    #[test]
    fn urls_must_parse() {
        assert!(validate(&[URL], &obj(json!({ "url": "https://example.com/a?b=c" }))).is_ok());
        assert!(validate(&[URL], &obj(json!({ "url": "not a url" }))).is_err());
        assert!(validate(&[URL], &obj(json!({ "url": 42 }))).is_err());
    }

    #[test]
    fn enum_membership_is_enforced() {
        assert!(validate(&[KIND], &obj(json!({ "type": "whales" }))).is_ok());
        let err = validate(&[KIND], &obj(json!({ "type": "rugs" }))).unwrap_err();
        assert!(err.to_string().contains("latest, whales, launches"));
    }

    #[test]
    fn email_shape() {
        assert!(is_email("someone@example.com"));
        assert!(is_email("first.last+tag@mail.example.co"));
        assert!(!is_email("someone@"));
        assert!(!is_email("@example.com"));
        assert!(!is_email(".lead@example.com"));
        assert!(!is_email("double..dot@example.com"));
        assert!(!is_email("no-tld@example"));
    }

    #[test]
    fn booleans_accept_strings() {
        let spec = ParamSpec::optional("full_page", "", ParamKind::Boolean, DefaultValue::Bool(false));
        let p = validate(&[spec], &obj(json!({ "full_page": "true" }))).unwrap();
        assert_eq!(p.get("full_page"), Some(&ParamValue::Bool(true)));
        assert!(validate(&[spec], &obj(json!({ "full_page": 1 }))).is_err());
    }

    #[test]
    fn params_preserve_schema_order() {
        let p = validate(&[KIND, WIDTH], &JsonObject::new()).unwrap();
        let names: Vec<_> = p.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["type", "width"]);
    }

    #[test]
    fn schema_lists_required_fields_and_constraints() {
        let schema = input_schema(&[URL, WIDTH, KIND]);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["url"]));
        assert_eq!(schema["properties"]["width"]["minimum"], 320);
        assert_eq!(schema["properties"]["width"]["default"], 1280);
        assert_eq!(schema["properties"]["url"]["format"], "uri");
        assert_eq!(schema["properties"]["type"]["enum"], json!(["latest", "whales", "launches"]));
    }

    #[test]
    fn query_rendering() {
        assert_eq!(ParamValue::Bool(false).to_query(), "false");
        assert_eq!(ParamValue::Int(1280).to_query(), "1280");
        assert_eq!(ParamValue::Str("a b".into()).to_query(), "a b");
    }
}
