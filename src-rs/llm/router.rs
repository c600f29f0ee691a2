use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::types::{CompletionRequest, LLMResponse, ProviderAdapter, ProviderError};

pub struct LLMRouter {
    default_provider: String,
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl LLMRouter {
    pub fn new(default_provider: &str) -> Self {
        Self {
            default_provider: default_provider.to_string(),
            providers: HashMap::new(),
        }
    }

    pub fn register_provider(&mut self, name: &str, adapter: Arc<dyn ProviderAdapter>) {
        self.providers.insert(name.to_string(), adapter);
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered provider names, sorted.
    pub fn provider_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Fails unless the default provider has an adapter, so a misconfigured
    /// agent is caught before its first session.
    pub fn ensure_default(&self) -> Result<(), ProviderError> {
        if self.has_provider(&self.default_provider) {
            return Ok(());
        }
        Err(ProviderError::new(
            "provider_missing",
            &format!(
                "provider not registered: {} (available: {})",
                self.default_provider,
                self.provider_names().join(", ")
            ),
        ))
    }

    pub fn complete(&self, request: CompletionRequest) -> Result<LLMResponse, ProviderError> {
        let provider = request
            .provider
            .clone()
            .unwrap_or_else(|| self.default_provider.clone());
        let adapter = self.providers.get(&provider).ok_or_else(|| {
            ProviderError::new("provider_missing", &format!("provider not registered: {}", provider))
        })?;
        debug!(%provider, messages = request.messages.len(), "model exchange");
        adapter.complete(request)
    }
}
