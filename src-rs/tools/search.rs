use reqwest::blocking::Client;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::debug;

use super::dispatcher::SearchProvider;
use super::types::TransportError;
use crate::config::SearchConfig;

/// SerpAPI client using the Google engine.
pub struct SerpApiClient {
    cfg: SearchConfig,
    client: Client,
}

impl SerpApiClient {
    pub fn new(cfg: SearchConfig) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(cfg.timeout).build()?;
        Ok(Self { cfg, client })
    }
}

impl SearchProvider for SerpApiClient {
    fn search(&self, query: &str) -> Result<Value, TransportError> {
        let endpoint = format!("{}/search", self.cfg.base_url.trim_end_matches('/'));
        let num = self.cfg.num_results.to_string();
        debug!(%endpoint, query, "serpapi request");

        let resp = self
            .client
            .get(endpoint)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("api_key", self.cfg.api_key.expose_secret().as_str()),
                ("num", num.as_str()),
            ])
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        resp.json::<Value>().map_err(|err| TransportError::Decode(err.to_string()))
    }
}
