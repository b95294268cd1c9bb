//! Configuration management for the fleet assistant
//!
//! Supports loading configuration from:
//! - YAML/TOML files under `config/`
//! - Environment variables (FLEET_ASSISTANT_ prefix)
//!
//! The intent rule table and the response templates are plain data so that
//! deployments can tune them without a code change.

pub mod prompts;
pub mod rules;
pub mod settings;

pub use prompts::{IntentUsage, PromptTemplates, ResponseTemplates, StatusTemplates, SystemPrompt};
pub use rules::{IntentRuleDefinition, IntentRulesConfig};
pub use settings::{
    load_settings, load_settings_from, CacheConfig, GenerationConfig, LearningConfig, ObservabilityConfig,
    ServerConfig, Settings, ENV_VAR,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for fleet_assistant_core::Error {
    fn from(err: ConfigError) -> Self {
        fleet_assistant_core::Error::Config(err.to_string())
    }
}
