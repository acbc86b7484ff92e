use serde_json::{Map, Value as JsonValue};

use crate::core::content::Outcome;
use crate::core::encoding::Encoding;
use crate::core::error::CapabilityError;
use crate::core::schema::{self, JsonObject, ParamSpec, Params};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// How validated parameters become an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestShape {
    /// GET `path?wire=value...`; `fields` maps parameter name to wire name,
    /// `fixed` pairs are appended verbatim.
    Query {
        path: &'static str,
        fields: &'static [(&'static str, &'static str)],
        fixed: &'static [(&'static str, &'static str)],
    },
    /// POST `path` with a JSON object built from the named parameters.
    JsonBody {
        path: &'static str,
        fields: &'static [&'static str],
    },
}

impl RequestShape {
    pub fn method(&self) -> HttpMethod {
        match self {
            RequestShape::Query { .. } => HttpMethod::Get,
            RequestShape::JsonBody { .. } => HttpMethod::Post,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            RequestShape::Query { path, .. } | RequestShape::JsonBody { path, .. } => *path,
        }
    }

    pub fn query_pairs(&self, params: &Params) -> Vec<(String, String)> {
        let RequestShape::Query { fields, fixed, .. } = self else {
            return Vec::new();
        };
        fields
            .iter()
            .filter_map(|(name, wire)| params.get(name).map(|v| ((*wire).to_owned(), v.to_query())))
            .chain(fixed.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())))
            .collect()
    }

    pub fn json_body(&self, params: &Params) -> Option<JsonValue> {
        let RequestShape::JsonBody { fields, .. } = self else {
            return None;
        };
        let body: Map<String, JsonValue> = fields
            .iter()
            .filter_map(|name| params.get(name).map(|v| ((*name).to_owned(), v.to_json())))
            .collect();
        Some(JsonValue::Object(body))
    }
}

/// A capability expressed as data: one generic handler runs every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityDefinition {
    /// Published tool name, e.g. `pylon_qr_code`.
    pub name: &'static str,
    /// Endpoint directory key, e.g. `qr_code`. Also accepted as an alias.
    pub group: &'static str,
    /// Human-readable action used in failure messages ("QR code").
    pub action: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    pub request: RequestShape,
    pub encoding: Encoding,
}

impl CapabilityDefinition {
    pub fn method(&self) -> HttpMethod {
        self.request.method()
    }

    pub fn input_schema(&self) -> JsonObject {
        schema::input_schema(self.params)
    }

    pub fn validate(&self, args: &JsonObject) -> Result<Params, CapabilityError> {
        schema::validate(self.params, args)
    }

    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.group == name
    }

    /// `"<action> failed: <diagnostic>"`
    pub fn failure(&self, err: &CapabilityError) -> Outcome {
        Outcome::failure(format!("{} failed: {err}", self.action))
    }
}
