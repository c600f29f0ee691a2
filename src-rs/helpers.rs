use std::sync::Arc;

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::llm::{GeminiAdapter, LLMRouter, OllamaAdapter};
use crate::tools::{Dispatcher, HttpCalcService, SerpApiClient};

/// Registers every provider the configuration can support. Ollama needs no
/// credentials; Gemini is added only when `GEMINI_API_KEY` was set.
pub fn build_llm_router(cfg: &AgentConfig) -> Result<LLMRouter, AgentError> {
    let mut router = LLMRouter::new(&cfg.provider);

    let ollama = OllamaAdapter::new(&cfg.llm, &cfg.model, cfg.temperature)?;
    router.register_provider("ollama", Arc::new(ollama));

    match &cfg.llm.gemini_api_key {
        Some(key) => {
            let gemini = GeminiAdapter::new(&cfg.llm, key.clone(), &cfg.model, cfg.temperature)?;
            router.register_provider("gemini", Arc::new(gemini));
        }
        None if cfg.provider == "gemini" => {
            return Err(AgentError::MissingCredentials("gemini".to_string(), "GEMINI_API_KEY"));
        }
        None => {}
    }

    router.ensure_default()?;
    Ok(router)
}

pub fn build_dispatcher(cfg: &AgentConfig) -> Result<Dispatcher, AgentError> {
    let search = SerpApiClient::new(cfg.search.clone())?;
    let calc = HttpCalcService::new(&cfg.calc)?;
    Ok(Dispatcher::new(Arc::new(search), Arc::new(calc)))
}
