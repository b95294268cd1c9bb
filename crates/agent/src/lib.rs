//! Intent resolution for the fleet assistant
//!
//! Features:
//! - Text normalization shared by cache keys and scoring
//! - Rule-based intent scoring with runtime rule updates
//! - Bounded example store consulted when rule confidence is low
//! - Expiring response cache with fuzzy key lookup
//! - Interaction log with explicit feedback and unlearning
//! - Teach-by-example and status commands

pub mod cache;
pub mod feedback;
pub mod learning;
pub mod postprocess;
pub mod resolver;
pub mod rules;
pub mod scorer;
pub mod teach;
pub mod text;

pub use cache::{find_similar_key, CacheStats, ResponseCache};
pub use feedback::FeedbackCollector;
pub use learning::{ExampleStore, ExampleStoreConfig, InMemoryExampleStore, LearningStats};
pub use resolver::{IntentResolver, ResolverConfig, StatusReport};
pub use rules::{RuleSet, RuleUpdate};
pub use scorer::IntentScorer;
pub use teach::{TeachCommand, TeachError};
pub use text::{normalize, tokenize};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Generation timed out after {0} ms")]
    Timeout(u64),

    #[error("Learning error: {0}")]
    Learning(String),

    #[error("Rule error: {0}")]
    Rules(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<fleet_assistant_core::Error> for AgentError {
    fn from(err: fleet_assistant_core::Error) -> Self {
        match err {
            fleet_assistant_core::Error::Timeout(ms) => AgentError::Timeout(ms),
            fleet_assistant_core::Error::Llm(msg) => AgentError::Generation(msg),
            other => AgentError::Internal(other.to_string()),
        }
    }
}

impl From<regex::Error> for AgentError {
    fn from(err: regex::Error) -> Self {
        AgentError::Rules(err.to_string())
    }
}
