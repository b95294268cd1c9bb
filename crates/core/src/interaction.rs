//! Recorded interactions and feedback

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Intent;

/// Opaque interaction identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InteractionId(Uuid);

impl InteractionId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for InteractionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InteractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One answered message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub message: String,
    pub response: String,
    pub intent: Intent,
    pub timestamp: DateTime<Utc>,
    /// Explicit feedback, last write wins
    pub was_helpful: Option<bool>,
}

impl Interaction {
    pub fn new(message: impl Into<String>, response: impl Into<String>, intent: Intent) -> Self {
        Self {
            id: InteractionId::new(),
            message: message.into(),
            response: response.into(),
            intent,
            timestamp: Utc::now(),
            was_helpful: None,
        }
    }
}
