//! Core traits for the fleet assistant
//!
//! External capabilities are consumed through traits so that backends can be
//! swapped by configuration and replaced with mocks in tests.
//!
//! ```text
//! Language Models:
//!   - LanguageModel: system prompt + user message -> generated text
//! ```

mod llm;

pub use llm::LanguageModel;
