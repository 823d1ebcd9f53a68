use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Medbrief server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Backend that produces summaries and chat replies.
    pub generation_provider: GenerationProvider,
    /// Model identifier passed to the provider.
    pub generation_model: String,
    /// Optional endpoint override for the provider API.
    pub generation_base_url: Option<String>,
    /// API key for the OpenAI provider.
    pub openai_api_key: Option<String>,
    /// API key for the Anthropic provider.
    pub anthropic_api_key: Option<String>,
    /// Upper bound for a single generation round trip, in seconds.
    pub generation_timeout_secs: u64,
    /// Output token ceiling for summary generation.
    pub summary_max_tokens: u32,
    /// Output token ceiling for chat replies.
    pub chat_max_tokens: u32,
    /// Sampling temperature forwarded to the provider.
    pub generation_temperature: f32,
    /// Maximum number of files accepted by a single analysis request.
    pub max_documents_per_analysis: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported generation backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Hosted OpenAI chat completions API.
    OpenAI,
    /// Hosted Anthropic messages API.
    Anthropic,
    /// Local Ollama runtime.
    Ollama,
}

impl GenerationProvider {
    /// Model used when `GENERATION_MODEL` is not set.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4-turbo",
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::Ollama => "llama3.1",
        }
    }

    /// Lowercase provider name used in logs and health responses.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let generation_provider: GenerationProvider = load_env("GENERATION_PROVIDER")?
            .parse()
            .map_err(|()| ConfigError::InvalidValue("GENERATION_PROVIDER".to_string()))?;
        let base_url_key = match generation_provider {
            GenerationProvider::Ollama => load_env_optional("OLLAMA_URL"),
            _ => None,
        };

        Ok(Self {
            generation_provider,
            generation_model: load_env_optional("GENERATION_MODEL")
                .unwrap_or_else(|| generation_provider.default_model().to_string()),
            generation_base_url: load_env_optional("GENERATION_BASE_URL").or(base_url_key),
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            anthropic_api_key: load_env_optional("ANTHROPIC_API_KEY"),
            generation_timeout_secs: parse_env_or("GENERATION_TIMEOUT_SECS", 120)?,
            summary_max_tokens: parse_env_or("SUMMARY_MAX_TOKENS", 2000)?,
            chat_max_tokens: parse_env_or("CHAT_MAX_TOKENS", 1500)?,
            generation_temperature: parse_env_or("GENERATION_TEMPERATURE", 0.7)?,
            max_documents_per_analysis: parse_env_or("MAX_DOCUMENTS_PER_ANALYSIS", 10)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }

    /// Emit the settings that shape generation. Call once tracing is installed.
    pub fn log_loaded(&self) {
        tracing::info!(
            provider = self.generation_provider.as_str(),
            model = %self.generation_model,
            timeout_secs = self.generation_timeout_secs,
            max_documents = self.max_documents_per_analysis,
            server_port = ?self.server_port,
            "Loaded configuration"
        );
    }

    /// Generation timeout as a [`Duration`].
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs.max(1))
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl std::str::FromStr for GenerationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    CONFIG.set(config).expect("Failed to set config");
}
