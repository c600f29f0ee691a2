use reqwest::blocking::Client;
use serde_json::{Map, Value};
use tracing::debug;

use super::dispatcher::CalculationService;
use super::types::TransportError;
use crate::config::CalcConfig;

/// JSON-over-HTTP client for the calculation endpoints.
pub struct HttpCalcService {
    base_url: String,
    client: Client,
}

impl HttpCalcService {
    pub fn new(cfg: &CalcConfig) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(cfg.timeout).build()?;
        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl CalculationService for HttpCalcService {
    fn call(&self, endpoint: &str, payload: &Map<String, Value>) -> Result<Map<String, Value>, TransportError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%url, "calculation request");
        let resp = self.client.post(url).json(payload).send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        match resp.json::<Value>().map_err(|err| TransportError::Decode(err.to_string()))? {
            Value::Object(map) => Ok(map),
            other => Err(TransportError::Decode(format!("expected a JSON object, got {}", other))),
        }
    }
}
