//! Core traits and types for the fleet assistant
//!
//! This crate provides foundational types used across all other crates:
//! - The closed intent set and scoring/learning types
//! - Interactions and explicit feedback
//! - Resolution results with keyboard hints
//! - LLM request/response types and the generation trait
//! - Error types

pub mod error;
pub mod intent;
pub mod interaction;
pub mod llm_types;
pub mod resolution;
pub mod traits;

pub use error::{Error, Result};
pub use intent::{Intent, IntentExample, IntentScore, ParseIntentError};
pub use interaction::{Interaction, InteractionId};
pub use llm_types::{FinishReason, GenerateRequest, GenerateResponse, Message, Role, TokenUsage};
pub use resolution::{KeyboardButton, KeyboardHint, Resolution};

pub use traits::LanguageModel;
