//! Example store
//!
//! Keeps confirmed (text, intent) pairs for the fallback path of intent
//! resolution. The store is bounded: on overflow the lowest-confidence
//! examples are dropped.

use std::collections::HashSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use fleet_assistant_config::LearningConfig;
use fleet_assistant_core::{Intent, IntentExample};

use crate::AgentError;

/// Example store operations
pub trait ExampleStore: Send + Sync {
    /// Record an example, evicting the weakest ones past capacity
    fn learn(&self, text: &str, intent: Intent, confirmed: bool) -> Result<(), AgentError>;

    /// Most confident examples similar to `text`
    fn similar(&self, text: &str) -> Vec<IntentExample>;

    /// Remove every example with exactly this text and intent
    fn forget(&self, text: &str, intent: Intent) -> usize;

    fn stats(&self) -> LearningStats;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningStats {
    pub total: usize,
    pub confirmed: usize,
}

impl LearningStats {
    /// Share of confirmed examples; 0 for an empty store
    pub fn accuracy_rate(&self) -> f64 {
        self.confirmed as f64 / self.total.max(1) as f64
    }
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct ExampleStoreConfig {
    pub max_examples: usize,
    pub similarity_threshold: f32,
    pub max_similar: usize,
}

impl Default for ExampleStoreConfig {
    fn default() -> Self {
        Self {
            max_examples: 1000,
            similarity_threshold: 0.7,
            max_similar: 5,
        }
    }
}

impl From<&LearningConfig> for ExampleStoreConfig {
    fn from(config: &LearningConfig) -> Self {
        Self {
            max_examples: config.max_examples,
            similarity_threshold: config.similarity_threshold,
            max_similar: config.max_similar,
        }
    }
}

/// Process-local example store
pub struct InMemoryExampleStore {
    config: ExampleStoreConfig,
    examples: RwLock<Vec<IntentExample>>,
}

impl InMemoryExampleStore {
    pub fn new(config: ExampleStoreConfig) -> Self {
        Self {
            config,
            examples: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of stored examples
    pub fn examples(&self) -> Vec<IntentExample> {
        self.examples.read().clone()
    }

    pub fn len(&self) -> usize {
        self.examples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.read().is_empty()
    }
}

impl Default for InMemoryExampleStore {
    fn default() -> Self {
        Self::new(ExampleStoreConfig::default())
    }
}

impl ExampleStore for InMemoryExampleStore {
    fn learn(&self, text: &str, intent: Intent, confirmed: bool) -> Result<(), AgentError> {
        if self.config.max_examples == 0 {
            return Err(AgentError::Learning("example store has no capacity".to_string()));
        }

        let example = IntentExample::new(text, intent, confirmed);
        {
            let mut examples = self.examples.write();
            examples.push(example);

            if examples.len() > self.config.max_examples {
                // sort_by is stable: equal confidence keeps insertion order
                examples.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
                examples.truncate(self.config.max_examples);
            }
        }

        tracing::info!(text, intent = %intent, confirmed, "Added learning example");
        Ok(())
    }

    fn similar(&self, text: &str) -> Vec<IntentExample> {
        let query = word_set(text);
        let mut matches: Vec<IntentExample> = self
            .examples
            .read()
            .iter()
            .filter(|e| jaccard(&query, &word_set(&e.text)) >= self.config.similarity_threshold)
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        matches.truncate(self.config.max_similar);
        matches
    }

    fn forget(&self, text: &str, intent: Intent) -> usize {
        let mut examples = self.examples.write();
        let before = examples.len();
        examples.retain(|e| !(e.text == text && e.intent == intent));
        before - examples.len()
    }

    fn stats(&self) -> LearningStats {
        let examples = self.examples.read();
        LearningStats {
            total: examples.len(),
            confirmed: examples.iter().filter(|e| e.confirmed).count(),
        }
    }
}

fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of two word sets; 0 when both are empty
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

/// Most frequent intent, ties going to the earliest example
pub fn most_frequent_intent(examples: &[IntentExample]) -> Option<Intent> {
    let mut counts: Vec<(Intent, usize)> = Vec::new();
    for example in examples {
        match counts.iter_mut().find(|(intent, _)| *intent == example.intent) {
            Some((_, count)) => *count += 1,
            None => counts.push((example.intent, 1)),
        }
    }

    // max_by_key returns the last maximum; iterate in reverse to keep the first
    counts
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(intent, _)| intent)
}
