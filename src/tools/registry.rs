use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

use crate::clients::transport::{HttpTransport, Transport, TransportRequest};
use crate::core::content::Outcome;
use crate::core::error::CapabilityError;
use crate::core::schema::JsonObject;
use crate::core::tool::{CapabilityDefinition, RequestShape};
use crate::domain::EndpointDirectory;
use crate::infra::config::AppConfig;
use crate::infra::logging::record_latency;

use super::catalogue::CAPABILITIES;

/// Immutable after construction; cheap to clone into every session.
#[derive(Clone)]
pub struct CapabilityRegistry {
    definitions: Arc<[CapabilityDefinition]>,
    index: Arc<HashMap<&'static str, usize>>,
    endpoints: Arc<EndpointDirectory>,
    transport: Arc<dyn Transport>,
}

impl CapabilityRegistry {
    pub fn new(
        definitions: &[CapabilityDefinition],
        endpoints: EndpointDirectory,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, CapabilityError> {
        let mut index = HashMap::with_capacity(definitions.len() * 2);
        for (i, def) in definitions.iter().enumerate() {
            endpoints.resolve(def.group)?;
            if index.insert(def.name, i).is_some() {
                return Err(CapabilityError::DuplicateTool(def.name.to_owned()));
            }
            // bare group alias, e.g. `qr_code`
            if def.group != def.name && index.insert(def.group, i).is_some() {
                return Err(CapabilityError::DuplicateTool(def.group.to_owned()));
            }
        }
        Ok(Self {
            definitions: definitions.into(),
            index: Arc::new(index),
            endpoints: Arc::new(endpoints),
            transport,
        })
    }

    /// The ten built-in capabilities over a real HTTP transport.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let endpoints = cfg.endpoint_directory()?;
        let transport = HttpTransport::from_config(&cfg.transport)?;
        Ok(Self::new(CAPABILITIES, endpoints, Arc::new(transport))?)
    }

    pub fn list(&self) -> &[CapabilityDefinition] {
        &self.definitions
    }

    pub fn get(&self, name: &str) -> Option<&CapabilityDefinition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    pub fn endpoints(&self) -> &EndpointDirectory {
        &self.endpoints
    }

    /// Only an unknown name is an `Err`; everything else is an `Outcome`.
    pub async fn call(
        &self,
        name: &str,
        args: &JsonObject,
        cancel: &CancellationToken,
    ) -> Result<Outcome, CapabilityError> {
        let def = self
            .get(name)
            .ok_or_else(|| CapabilityError::UnknownTool(name.to_owned()))?;
        Ok(self.invoke(def, args, cancel).await)
    }

    pub async fn invoke(
        &self,
        def: &CapabilityDefinition,
        args: &JsonObject,
        cancel: &CancellationToken,
    ) -> Outcome {
        let start = Instant::now();
        tracing::debug!(tool = def.name, "capability invoked");

        let result = self.run(def, args, cancel).await;
        let elapsed = start.elapsed();
        record_latency(def.group, def.name, elapsed);
        let elapsed_ms = elapsed.as_millis() as u64;

        match result {
            Ok(outcome) => {
                metrics::counter!("pylon_capability_calls_total", "capability" => def.group, "outcome" => "success")
                    .increment(1);
                tracing::info!(tool = def.name, outcome = "success", elapsed_ms, "capability completed");
                outcome
            }
            Err(err) => {
                metrics::counter!("pylon_capability_calls_total", "capability" => def.group, "outcome" => "failure")
                    .increment(1);
                if matches!(err, CapabilityError::Transport(_)) {
                    metrics::counter!("pylon_upstream_errors_total", "capability" => def.group).increment(1);
                }
                tracing::warn!(
                    tool = def.name,
                    outcome = "failure",
                    kind = err.kind(),
                    error = %err,
                    elapsed_ms,
                    "capability failed"
                );
                def.failure(&err)
            }
        }
    }

    async fn run(
        &self,
        def: &CapabilityDefinition,
        args: &JsonObject,
        cancel: &CancellationToken,
    ) -> Result<Outcome, CapabilityError> {
        let params = def.validate(args)?;
        let base = self.endpoints.resolve(def.group)?;
        let request = match def.request {
            RequestShape::Query { path, .. } => {
                TransportRequest::get(base, path).with_query(def.request.query_pairs(&params))
            }
            RequestShape::JsonBody { path, .. } => {
                let body = def
                    .request
                    .json_body(&params)
                    .unwrap_or_else(|| JsonValue::Object(Default::default()));
                TransportRequest::post(base, path, body)
            }
        };
        let response = self.transport.send(&request, cancel).await?;
        let item = def
            .encoding
            .encode(&response.body, response.content_type.as_deref())?;
        Ok(Outcome::success(item))
    }
}
