use std::env;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_SERPAPI_URL: &str = "https://serpapi.com";
const DEFAULT_CALC_URL: &str = "http://localhost:8000";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} env-var not set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub num_results: u32,
    pub timeout: Duration,
}

impl SearchConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            base_url: DEFAULT_SERPAPI_URL.to_string(),
            num_results: 10,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Clone, Debug)]
pub struct CalcConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CALC_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub ollama_base_url: String,
    pub gemini_base_url: String,
    pub gemini_api_key: Option<SecretString>,
    pub timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            ollama_base_url: DEFAULT_OLLAMA_URL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_URL.to_string(),
            gemini_api_key: None,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Everything a comparison session needs, built once and handed to the agent.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f64,
    pub enable_run_store: bool,
    pub runs_file: Option<PathBuf>,
    pub search: SearchConfig,
    pub calc: CalcConfig,
    pub llm: ModelConfig,
}

impl AgentConfig {
    pub fn new(search: SearchConfig) -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3".to_string(),
            temperature: 0.3,
            enable_run_store: true,
            runs_file: None,
            search,
            calc: CalcConfig::default(),
            llm: ModelConfig::default(),
        }
    }

    /// Reads `.env` (when present) and the process environment.
    ///
    /// `SERPAPI_API_KEY` is the only required variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let api_key = env_opt("SERPAPI_API_KEY").ok_or(ConfigError::Missing("SERPAPI_API_KEY"))?;
        let mut search = SearchConfig::new(api_key);
        if let Some(url) = env_opt("SERPAPI_BASE_URL") {
            search.base_url = url;
        }
        if let Some(raw) = env_opt("SERPAPI_NUM_RESULTS") {
            search.num_results = parse_var("SERPAPI_NUM_RESULTS", &raw)?;
        }

        let mut cfg = Self::new(search);
        if let Some(provider) = env_opt("STOCK_AGENT_PROVIDER") {
            cfg.provider = provider;
        }
        if let Some(model) = env_opt("STOCK_AGENT_MODEL") {
            cfg.model = model;
        }
        if let Some(raw) = env_opt("STOCK_AGENT_TEMPERATURE") {
            cfg.temperature = parse_var("STOCK_AGENT_TEMPERATURE", &raw)?;
        }
        if let Some(path) = env_opt("STOCK_AGENT_RUNS_FILE") {
            cfg.runs_file = Some(PathBuf::from(path));
        }
        if let Some(url) = env_opt("CALC_BASE_URL") {
            cfg.calc.base_url = url;
        }
        if let Some(url) = env_opt("OLLAMA_BASE_URL") {
            cfg.llm.ollama_base_url = url;
        }
        if let Some(url) = env_opt("GEMINI_BASE_URL") {
            cfg.llm.gemini_base_url = url;
        }
        cfg.llm.gemini_api_key = env_opt("GEMINI_API_KEY").map(SecretString::new);

        Ok(cfg)
    }
}

fn env_opt(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse::<T>().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}
