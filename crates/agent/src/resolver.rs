//! Intent resolution orchestrator
//!
//! `resolve` runs, in order:
//! 1. teach-by-example command
//! 2. status command
//! 3. exact then fuzzy cache lookup
//! 4. rule scoring, falling back to similar historical examples
//! 5. canned response for the intent, or text generation
//!
//! Every entry point is total: failures are logged and turned into the
//! `error` intent with the configured apology text.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use fleet_assistant_config::{
    IntentRulesConfig, IntentUsage, ResponseTemplates, Settings, StatusTemplates,
};
use fleet_assistant_core::{GenerateRequest, Intent, InteractionId, LanguageModel, Resolution};

use crate::cache::{CacheStats, ResponseCache};
use crate::feedback::FeedbackCollector;
use crate::learning::{
    most_frequent_intent, ExampleStore, ExampleStoreConfig, InMemoryExampleStore, LearningStats,
};
use crate::postprocess::format_response;
use crate::rules::{RuleSet, RuleUpdate};
use crate::scorer::IntentScorer;
use crate::teach::{TeachCommand, TeachError};
use crate::text::normalize;
use crate::AgentError;

/// Literal status command
const STATUS_COMMAND: &str = "/status";

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Minimum rule confidence to accept the top intent
    pub acceptance_threshold: f32,
    /// System prompt sent with every generation request
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// No timeout when unset
    pub generation_timeout: Option<Duration>,
    /// Confidence reported for generated answers
    pub generated_confidence: f32,
    pub cache_ttl: Duration,
    pub examples: ExampleStoreConfig,
    pub responses: ResponseTemplates,
    pub status: StatusTemplates,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl ResolverConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            acceptance_threshold: settings.learning.acceptance_threshold,
            system_prompt: settings.prompts.system_prompt.build(),
            temperature: settings.generation.temperature,
            max_tokens: settings.generation.max_tokens,
            generation_timeout: settings.generation.timeout_secs.map(Duration::from_secs),
            generated_confidence: settings.generation.generated_confidence,
            cache_ttl: Duration::from_secs(settings.cache.ttl_secs),
            examples: ExampleStoreConfig::from(&settings.learning),
            responses: settings.prompts.responses.clone(),
            status: settings.prompts.status.clone(),
        }
    }
}

/// Aggregate statistics behind the status command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub learning: LearningStats,
    pub accuracy_rate: f64,
    pub cache: CacheStats,
    pub interactions: usize,
    pub top_intents: Vec<IntentUsage>,
}

impl StatusReport {
    /// Text shown in chat
    pub fn render(&self) -> String {
        let top = self
            .top_intents
            .iter()
            .map(|usage| format!("- {}: {} примеров", usage.intent, usage.count))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "📊 Статистика обучения:\n\nВсего примеров: {}\nУспешных ответов: {}\nТочность: {:.1}%\n\n💾 Статистика кэша:\nЗаписей: {}\nПопаданий: {}\nПромахов: {}\n\n🔝 Топ интентов:\n{}",
            self.learning.total,
            self.learning.confirmed,
            self.accuracy_rate * 100.0,
            self.cache.count,
            self.cache.hits,
            self.cache.misses,
            top
        )
    }
}

/// End-to-end resolver owning cache, example store and interaction log
pub struct IntentResolver {
    config: ResolverConfig,
    llm: Arc<dyn LanguageModel>,
    scorer: IntentScorer,
    examples: Arc<dyn ExampleStore>,
    cache: Arc<ResponseCache>,
    feedback: FeedbackCollector,
}

impl IntentResolver {
    /// Resolver with fresh in-memory state
    pub fn new(config: ResolverConfig, llm: Arc<dyn LanguageModel>, rules: Arc<RuleSet>) -> Self {
        let examples = Arc::new(InMemoryExampleStore::new(config.examples.clone()));
        let cache = Arc::new(ResponseCache::new(config.cache_ttl));

        Self {
            config,
            llm,
            scorer: IntentScorer::new(rules),
            examples,
            cache,
            feedback: FeedbackCollector::new(),
        }
    }

    /// Build from settings, loading the rule table from `rules_path` if set
    pub fn from_settings(
        settings: &Settings,
        llm: Arc<dyn LanguageModel>,
    ) -> Result<Self, AgentError> {
        let table = IntentRulesConfig::load_or_builtin(settings.rules_path.as_deref())
            .map_err(|e| AgentError::Rules(e.to_string()))?;
        let rules = Arc::new(RuleSet::new(&table)?);

        tracing::info!(
            rules = rules.len(),
            model = llm.model_name(),
            "Intent resolver initialized"
        );

        Ok(Self::new(ResolverConfig::from_settings(settings), llm, rules))
    }

    /// Replace the example store
    pub fn with_example_store(mut self, examples: Arc<dyn ExampleStore>) -> Self {
        self.examples = examples;
        self
    }

    /// Replace the response cache
    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn examples(&self) -> &Arc<dyn ExampleStore> {
        &self.examples
    }

    pub fn feedback_log(&self) -> &FeedbackCollector {
        &self.feedback
    }

    pub fn scorer(&self) -> &IntentScorer {
        &self.scorer
    }

    /// Resolve a raw chat message
    pub async fn resolve(&self, message: &str) -> Resolution {
        let start = Instant::now();

        let resolution = match self.try_resolve(message).await {
            Ok(resolution) => resolution,
            Err(e) => {
                tracing::error!(error = %e, "Failed to resolve message");
                self.error_resolution()
            }
        };

        metrics::counter!("fleet_assistant_resolutions_total", "intent" => resolution.intent.as_str())
            .increment(1);
        metrics::histogram!("fleet_assistant_resolution_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        resolution
    }

    async fn try_resolve(&self, message: &str) -> Result<Resolution, AgentError> {
        tracing::info!(message, "Processing message");

        if let Some(command) = TeachCommand::detect(message) {
            return Ok(self.teach(command));
        }

        if is_status_command(message) {
            return Ok(Resolution::new(Intent::Status, self.status_report().render()));
        }

        let normalized = normalize(message);

        if let Some(response) = self.cached_response(&normalized) {
            return Ok(Resolution::new(Intent::Cached, response));
        }

        let intent = self.detect_intent(message);
        tracing::debug!(intent = %intent, "Detected intent");

        if let Some(response) = self.config.responses.default_for(intent) {
            self.cache.set(&normalized, response);
            return Ok(Resolution::new(intent, response));
        }

        let response = format_response(&self.generate(message).await?);
        if response.is_empty() {
            return Err(AgentError::Generation("empty response".to_string()));
        }

        self.cache.set(&normalized, response.clone());
        self.remember(message, intent);
        let id = self.feedback.record_implicit(message, &response, intent);

        tracing::info!(intent = %intent, interaction = %id, "Generated response");

        Ok(Resolution::new(intent, response)
            .with_confidence(self.config.generated_confidence)
            .with_interaction(id))
    }

    /// Exact hit, then fuzzy hit written back under `normalized`
    fn cached_response(&self, normalized: &str) -> Option<String> {
        if let Some(response) = self.cache.get(normalized) {
            tracing::info!(message = normalized, "Cache hit (exact match)");
            metrics::counter!("fleet_assistant_cache_hits_total", "kind" => "exact").increment(1);
            return Some(response);
        }

        let similar = self.cache.find_similar(normalized)?;
        let response = self.cache.get(&similar)?;

        tracing::info!(original = normalized, similar = %similar, "Cache hit (similar question)");
        metrics::counter!("fleet_assistant_cache_hits_total", "kind" => "similar").increment(1);

        self.cache.set(normalized, response.clone());
        Some(response)
    }

    /// Rule scoring, then the most frequent intent among similar examples
    pub fn detect_intent(&self, message: &str) -> Intent {
        if let Some(top) = self.scorer.top(message) {
            if top.confidence >= self.config.acceptance_threshold {
                self.remember(message, top.intent);
                return top.intent;
            }
        }

        let similar = self.examples.similar(message);
        if let Some(intent) = most_frequent_intent(&similar) {
            tracing::debug!(intent = %intent, examples = similar.len(), "Intent from similar examples");
            self.remember(message, intent);
            return intent;
        }

        Intent::Error
    }

    /// Record a confirmed example; failures are logged, never fatal
    fn remember(&self, text: &str, intent: Intent) {
        if intent.is_meta() {
            return;
        }
        if let Err(e) = self.examples.learn(text, intent, true) {
            tracing::warn!(error = %e, intent = %intent, "Failed to record learning example");
        }
    }

    async fn generate(&self, message: &str) -> Result<String, AgentError> {
        let request = GenerateRequest::new(self.config.system_prompt.clone())
            .with_user_message(message)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        tracing::debug!(model = self.llm.model_name(), "Invoking generation");

        let result = match self.config.generation_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.llm.generate(request))
                .await
                .map_err(|_| AgentError::Timeout(timeout.as_millis() as u64))?,
            None => self.llm.generate(request).await,
        };

        let response = result.map_err(|e| {
            tracing::warn!(error = %e, "Generation failed");
            AgentError::from(e)
        })?;

        Ok(response.text)
    }

    fn teach(&self, command: Result<TeachCommand, TeachError>) -> Resolution {
        let text = match command.and_then(|cmd| {
            let added = self.apply_teach(&cmd)?;
            Ok(cmd.success_message(added))
        }) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = ?e, "Teach command rejected");
                e.to_string()
            }
        };
        Resolution::new(Intent::Learning, text)
    }

    /// Cache and learn the question and all its variations
    fn apply_teach(&self, command: &TeachCommand) -> Result<usize, TeachError> {
        let learn = |text: &str| {
            self.cache.set(text, command.answer.clone());
            self.examples
                .learn(text, command.intent, true)
                .map_err(|e| TeachError::Processing(e.to_string()))
        };

        learn(command.question.as_str())?;

        let variations = command.variations();
        for variation in &variations {
            learn(variation.as_str())?;
        }

        tracing::info!(
            question = %command.question,
            intent = %command.intent,
            variations = variations.len(),
            "Teach command processed"
        );
        Ok(variations.len())
    }

    /// Current statistics
    pub fn status_report(&self) -> StatusReport {
        let learning = self.examples.stats();
        StatusReport {
            learning,
            accuracy_rate: learning.accuracy_rate(),
            cache: self.cache.stats(),
            interactions: self.feedback.len(),
            top_intents: self.config.status.top_intents.clone(),
        }
    }

    /// Explicit feedback on a generated answer
    ///
    /// Negative feedback forgets the learned example and drops the cached
    /// answer so the next identical question is generated again. Returns
    /// false for an unknown interaction.
    pub fn feedback(&self, id: InteractionId, helpful: bool) -> bool {
        let Some(interaction) = self.feedback.record_explicit(id, helpful) else {
            return false;
        };

        metrics::counter!(
            "fleet_assistant_feedback_total",
            "helpful" => if helpful { "true" } else { "false" }
        )
        .increment(1);

        if !helpful {
            let forgotten = self.examples.forget(&interaction.message, interaction.intent);
            self.cache.delete(&interaction.message);
            tracing::info!(
                message = %interaction.message,
                intent = %interaction.intent,
                forgotten,
                "Processed negative feedback"
            );
        }
        true
    }

    /// Union new rule terms into an intent
    pub fn update_rules(&self, intent: Intent, update: &RuleUpdate) -> Result<(), AgentError> {
        self.scorer.update_rules(intent, update)
    }

    fn error_resolution(&self) -> Resolution {
        Resolution::new(Intent::Error, self.config.responses.error_response())
    }
}

fn is_status_command(message: &str) -> bool {
    message.trim().to_lowercase() == STATUS_COMMAND
}
