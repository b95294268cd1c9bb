//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, PromptTemplates};

/// Environment variable selecting the `config/{env}` overlay
pub const ENV_VAR: &str = "FLEET_ASSISTANT_ENV";

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Response cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Example store and acceptance thresholds
    #[serde(default)]
    pub learning: LearningConfig,

    /// Text generation backend
    #[serde(default)]
    pub generation: GenerationConfig,

    /// System prompt, canned responses and status summary
    #[serde(default)]
    pub prompts: PromptTemplates,

    /// Optional YAML intent rule table; the built-in table is used when unset
    #[serde(default)]
    pub rules_path: Option<String>,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_cache()?;
        self.validate_learning()?;
        self.validate_generation()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }
        Ok(())
    }

    fn validate_cache(&self) -> Result<(), ConfigError> {
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.ttl_secs".to_string(),
                message: "TTL must be at least 1 second".to_string(),
            });
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.sweep_interval_secs".to_string(),
                message: "Sweep interval must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }

    fn validate_learning(&self) -> Result<(), ConfigError> {
        let learning = &self.learning;

        if learning.max_examples == 0 {
            return Err(ConfigError::InvalidValue {
                field: "learning.max_examples".to_string(),
                message: "Capacity must be at least 1".to_string(),
            });
        }
        if learning.max_similar == 0 {
            return Err(ConfigError::InvalidValue {
                field: "learning.max_similar".to_string(),
                message: "Must return at least 1 similar example".to_string(),
            });
        }

        for (field, value) in [
            ("learning.similarity_threshold", learning.similarity_threshold),
            ("learning.acceptance_threshold", learning.acceptance_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("Must be within [0, 1], got {}", value),
                });
            }
        }
        Ok(())
    }

    fn validate_generation(&self) -> Result<(), ConfigError> {
        let generation = &self.generation;

        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "generation.temperature".to_string(),
                message: format!("Must be within [0, 2], got {}", generation.temperature),
            });
        }
        if generation.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "generation.max_tokens".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&generation.generated_confidence) {
            return Err(ConfigError::InvalidValue {
                field: "generation.generated_confidence".to_string(),
                message: format!("Must be within [0, 1], got {}", generation.generated_confidence),
            });
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Interval between expiry sweeps in seconds
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_ttl_secs() -> u64 {
    24 * 60 * 60
}
fn default_sweep_interval_secs() -> u64 {
    60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Learning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Maximum number of stored examples
    #[serde(default = "default_max_examples")]
    pub max_examples: usize,

    /// Minimum Jaccard similarity for a historical example to count
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f32,

    /// Number of similar examples considered
    #[serde(default = "default_max_similar")]
    pub max_similar: usize,

    /// Minimum rule confidence to accept the top intent
    #[serde(default = "default_threshold")]
    pub acceptance_threshold: f32,
}

fn default_max_examples() -> usize {
    1000
}
fn default_threshold() -> f32 {
    0.7
}
fn default_max_similar() -> usize {
    5
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            max_examples: default_max_examples(),
            similarity_threshold: default_threshold(),
            max_similar: default_max_similar(),
            acceptance_threshold: default_threshold(),
        }
    }
}

/// Text generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key, usually supplied through FLEET_ASSISTANT__GENERATION__API_KEY
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-call timeout in seconds; no timeout when unset
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: Option<u64>,

    /// Retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Confidence reported for generated answers
    #[serde(default = "default_generated_confidence")]
    pub generated_confidence: f32,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    150
}
fn default_timeout_secs() -> Option<u64> {
    Some(30)
}
fn default_max_retries() -> u32 {
    3
}
fn default_generated_confidence() -> f32 {
    0.9
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            generated_confidence: default_generated_confidence(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Sources, later ones overriding earlier ones:
/// `config/default`, `config/{env}`, then `FLEET_ASSISTANT__SECTION__KEY`
/// environment variables.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Load settings with an explicit configuration directory
pub fn load_settings_from(dir: &str, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name(&format!("{}/default", dir)).required(false));

    if let Some(env_name) = env {
        builder = builder
            .add_source(File::with_name(&format!("{}/{}", dir, env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("FLEET_ASSISTANT")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
