//! Integration tests for intent resolution (cache -> rules -> examples -> generation)
//!
//! These tests drive `IntentResolver` through its public API with scripted
//! language models.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use fleet_assistant_agent::{IntentResolver, ResolverConfig, RuleSet, RuleUpdate};
use fleet_assistant_config::{IntentRuleDefinition, IntentRulesConfig};
use fleet_assistant_core::{
    Error, GenerateRequest, GenerateResponse, Intent, LanguageModel, Result as CoreResult,
};

const CONTACT_PHONE: &str = "7 927 883-55-66";

/// Answers with a numbered reply and counts calls
#[derive(Default)]
struct CountingLlm {
    calls: AtomicUsize,
}

impl CountingLlm {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for CountingLlm {
    async fn generate(&self, request: GenerateRequest) -> CoreResult<GenerateResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GenerateResponse::text(format!(
            "ответ {} на: {}",
            n,
            request.user_message().unwrap_or_default()
        )))
    }

    fn model_name(&self) -> &str {
        "counting"
    }
}

struct FailingLlm;

#[async_trait]
impl LanguageModel for FailingLlm {
    async fn generate(&self, _request: GenerateRequest) -> CoreResult<GenerateResponse> {
        Err(Error::Llm("upstream returned 500".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Never completes
struct HangingLlm;

#[async_trait]
impl LanguageModel for HangingLlm {
    async fn generate(&self, _request: GenerateRequest) -> CoreResult<GenerateResponse> {
        std::future::pending().await
    }

    fn model_name(&self) -> &str {
        "hanging"
    }
}

fn builtin_resolver(llm: Arc<dyn LanguageModel>) -> IntentResolver {
    IntentResolver::new(
        ResolverConfig::default(),
        llm,
        Arc::new(RuleSet::builtin().unwrap()),
    )
}

fn custom_resolver(llm: Arc<dyn LanguageModel>, rules: Vec<IntentRuleDefinition>) -> IntentResolver {
    let config = IntentRulesConfig { rules };
    IntentResolver::new(
        ResolverConfig::default(),
        llm,
        Arc::new(RuleSet::new(&config).unwrap()),
    )
}

fn rule(intent: Intent, keywords: &[&str], patterns: &[&str], triggers: &[&str]) -> IntentRuleDefinition {
    let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
    IntentRuleDefinition {
        intent,
        keywords: owned(keywords),
        patterns: owned(patterns),
        context_triggers: owned(triggers),
    }
}

fn dtp_rule() -> IntentRuleDefinition {
    rule(Intent::Dtp, &["дтп"], &["попал в дтп"], &["гибдд"])
}

/// Rule confidence at or above the threshold selects the intent
#[tokio::test]
async fn test_confident_rule_selects_intent() {
    let llm = Arc::new(CountingLlm::default());
    let resolver = custom_resolver(llm.clone(), vec![dtp_rule()]);

    // keyword 0.4 + pattern 0.4 = 0.8
    let resolution = resolver.resolve("Попал в ДТП").await;
    assert_eq!(resolution.intent, Intent::Dtp);
    assert_eq!(resolution.confidence, Some(0.9));
    assert_eq!(llm.calls(), 1);
}

/// Below-threshold scores with no history fall through to generation
#[tokio::test]
async fn test_weak_rule_falls_through() {
    let llm = Arc::new(CountingLlm::default());
    let resolver = custom_resolver(llm.clone(), vec![dtp_rule()]);

    // trigger only: 0.2
    let resolution = resolver.resolve("гибдд").await;
    assert_eq!(resolution.intent, Intent::Error);
    assert!(resolution.response.starts_with("ответ 1"));
}

/// Canned answers skip the language model and are cached
#[tokio::test]
async fn test_canned_answer_for_fine_check() {
    let llm = Arc::new(CountingLlm::default());
    let resolver = builtin_resolver(llm.clone());

    let message = "Проверить штрафы, есть ли штрафы, где посмотреть штрафы, как проверить штраф: камера нарушение постановление";
    let resolution = resolver.resolve(message).await;

    assert_eq!(resolution.intent, Intent::FineCheck);
    assert!(resolution.response.contains("Элемент"));
    assert_eq!(llm.calls(), 0);

    let again = resolver.resolve(message).await;
    assert_eq!(again.intent, Intent::Cached);
    assert_eq!(again.response, resolution.response);
}

#[tokio::test]
async fn test_teach_then_ask() {
    let llm = Arc::new(CountingLlm::default());
    let resolver = builtin_resolver(llm.clone());

    let taught = resolver
        .resolve("/learn\nQ: Где офис?\nA: Строителей 100А\nT: available_cars")
        .await;
    assert_eq!(taught.intent, Intent::Learning);
    assert!(taught.response.contains("Пример успешно добавлен"));

    let answer = resolver.resolve("Где офис?").await;
    assert_eq!(answer.intent, Intent::Cached);
    assert_eq!(answer.response, "Строителей 100А");

    let variation = resolver.resolve("подскажите офис?").await;
    assert_eq!(variation.intent, Intent::Cached);
    assert_eq!(llm.calls(), 0);

    let stats = resolver.examples().stats();
    assert_eq!(stats.total, 34);
    assert_eq!(stats.confirmed, 34);
}

#[tokio::test]
async fn test_teach_with_invalid_tag_changes_nothing() {
    let resolver = builtin_resolver(Arc::new(CountingLlm::default()));

    let resolution = resolver
        .resolve("/learn\nQ: Где офис?\nA: Строителей 100А\nT: bogus")
        .await;

    assert_eq!(resolution.intent, Intent::Learning);
    assert!(resolution.response.contains("\"bogus\""));
    assert!(resolver.cache().keys().is_empty());
    assert_eq!(resolver.examples().stats().total, 0);
}

#[tokio::test]
async fn test_teach_with_missing_answer() {
    let resolver = builtin_resolver(Arc::new(CountingLlm::default()));

    let resolution = resolver.resolve("/learn\nQ: Где офис?\nT: dtp").await;
    assert_eq!(resolution.intent, Intent::Learning);
    assert!(resolution.response.contains("Answer: отсутствует"));
    assert!(resolver.cache().keys().is_empty());
}

#[tokio::test]
async fn test_example_store_stays_bounded() {
    let resolver = builtin_resolver(Arc::new(CountingLlm::default()));

    for i in 0..1100 {
        let confirmed = i % 2 == 0;
        resolver
            .examples()
            .learn(&format!("пример {}", i), Intent::Service, confirmed)
            .unwrap();
    }

    let stats = resolver.examples().stats();
    assert_eq!(stats.total, 1000);
    // Unconfirmed examples are the first to go
    assert_eq!(stats.confirmed, 550);
}

/// A fuzzy cache hit answers without generation and is written back
#[tokio::test]
async fn test_fuzzy_cache_hit() {
    let llm = Arc::new(CountingLlm::default());
    let resolver = builtin_resolver(llm.clone());
    resolver.cache().set("штрафы", "Штрафы в приложении");

    let resolution = resolver.resolve("Где посмотреть штраф?").await;
    assert_eq!(resolution.intent, Intent::Cached);
    assert_eq!(resolution.response, "Штрафы в приложении");
    assert_eq!(llm.calls(), 0);

    assert_eq!(
        resolver.cache().get("посмотреть штрафы").as_deref(),
        Some("Штрафы в приложении")
    );
}

#[tokio::test]
async fn test_generation_failure_returns_apology() {
    let resolver = builtin_resolver(Arc::new(FailingLlm));

    let resolution = resolver.resolve("какой-то непонятный текст без совпадений").await;
    assert_eq!(resolution.intent, Intent::Error);
    assert!(resolution.response.contains(CONTACT_PHONE));
    assert!(resolution.interaction_id.is_none());
    assert!(resolver.cache().keys().is_empty());
    assert!(resolver.feedback_log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_generation_timeout_returns_apology() {
    let config = ResolverConfig {
        generation_timeout: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    let resolver = IntentResolver::new(
        config,
        Arc::new(HangingLlm),
        Arc::new(RuleSet::builtin().unwrap()),
    );

    let resolution = resolver.resolve("какой-то непонятный текст без совпадений").await;
    assert_eq!(resolution.intent, Intent::Error);
    assert!(resolution.response.contains(CONTACT_PHONE));
}

#[tokio::test]
async fn test_generated_answer_served_from_cache() {
    let llm = Arc::new(CountingLlm::default());
    let resolver = builtin_resolver(llm.clone());

    let first = resolver.resolve("какой-то непонятный текст без совпадений").await;
    let second = resolver.resolve("Какой-то непонятный   текст без совпадений?").await;

    assert_eq!(llm.calls(), 1);
    assert_eq!(second.intent, Intent::Cached);
    assert_eq!(second.response, first.response);
    assert!(second.interaction_id.is_none());
}

#[tokio::test]
async fn test_status_reports_accuracy() {
    let resolver = builtin_resolver(Arc::new(CountingLlm::default()));

    let empty = resolver.resolve("/status").await;
    assert_eq!(empty.intent, Intent::Status);
    assert!(empty.response.contains("Точность: 0.0%"));

    resolver.examples().learn("a", Intent::Service, true).unwrap();
    resolver.examples().learn("b", Intent::Service, true).unwrap();
    resolver.examples().learn("c", Intent::Service, true).unwrap();
    resolver.examples().learn("d", Intent::Service, false).unwrap();

    let report = resolver.status_report();
    assert_eq!(report.learning.total, 4);
    assert!((report.accuracy_rate - 0.75).abs() < f64::EPSILON);
    assert!(resolver.resolve("/STATUS").await.response.contains("Точность: 75.0%"));
}

/// Negative feedback unlearns the answer so the next ask regenerates
#[tokio::test]
async fn test_negative_feedback_forgets_answer() {
    let llm = Arc::new(CountingLlm::default());
    let resolver = custom_resolver(llm.clone(), vec![dtp_rule()]);

    let first = resolver.resolve("попал в дтп гибдд").await;
    assert_eq!(first.intent, Intent::Dtp);
    assert!(resolver.examples().stats().total > 0);

    let id = first.interaction_id.unwrap();
    assert!(resolver.feedback(id, false));

    assert_eq!(resolver.examples().stats().total, 0);
    assert!(resolver.cache().get("попал в дтп гибдд").is_none());
    assert_eq!(
        resolver.feedback_log().get(id).unwrap().was_helpful,
        Some(false)
    );

    let second = resolver.resolve("попал в дтп гибдд").await;
    assert_eq!(second.intent, Intent::Dtp);
    assert_eq!(llm.calls(), 2);
    assert_ne!(second.response, first.response);
}

#[tokio::test]
async fn test_positive_feedback_keeps_answer() {
    let llm = Arc::new(CountingLlm::default());
    let resolver = custom_resolver(llm.clone(), vec![dtp_rule()]);

    let first = resolver.resolve("попал в дтп гибдд").await;
    assert!(resolver.feedback(first.interaction_id.unwrap(), true));

    let second = resolver.resolve("попал в дтп гибдд").await;
    assert_eq!(second.intent, Intent::Cached);
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_feedback_for_unknown_interaction() {
    let resolver = builtin_resolver(Arc::new(CountingLlm::default()));
    assert!(!resolver.feedback(fleet_assistant_core::InteractionId::new(), false));
}

/// Low rule confidence defers to the most frequent similar example
#[tokio::test]
async fn test_history_fallback() {
    let llm = Arc::new(CountingLlm::default());
    let resolver = builtin_resolver(llm.clone());
    resolver
        .examples()
        .learn("как вернуть машину в офис", Intent::CarReturn, true)
        .unwrap();

    let resolution = resolver.resolve("как вернуть машину в офис сегодня").await;
    assert_eq!(resolution.intent, Intent::CarReturn);
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_rule_update_through_resolver() {
    let llm = Arc::new(CountingLlm::default());
    let resolver = custom_resolver(
        llm.clone(),
        vec![rule(Intent::CarProblem, &["сломалась"], &[], &[])],
    );

    let before = resolver.resolve("нужен эвакуатор").await;
    assert_eq!(before.intent, Intent::Error);

    let bad = RuleUpdate {
        patterns: vec!["(".to_string()],
        ..Default::default()
    };
    assert!(resolver.update_rules(Intent::CarProblem, &bad).is_err());

    let update = RuleUpdate {
        keywords: vec!["эвакуатор".to_string()],
        patterns: vec!["нужен эвакуатор".to_string()],
        context_triggers: vec!["эвакуатор".to_string()],
    };
    resolver.update_rules(Intent::CarProblem, &update).unwrap();
    resolver.cache().clear();

    // keyword 1/2 * 0.4 + pattern 0.4 + trigger 0.2 = 0.8
    let after = resolver.resolve("нужен эвакуатор").await;
    assert_eq!(after.intent, Intent::CarProblem);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolution() {
    let llm = Arc::new(CountingLlm::default());
    let resolver = Arc::new(builtin_resolver(llm.clone()));

    let handles: Vec<_> = (0..50)
        .map(|i| {
            let resolver = Arc::clone(&resolver);
            tokio::spawn(async move { resolver.resolve(&format!("вопрос{}", i)).await })
        })
        .collect();

    for handle in handles {
        let resolution = handle.await.unwrap();
        assert!(resolution.interaction_id.is_some());
    }

    assert_eq!(llm.calls(), 50);
    assert_eq!(resolver.cache().keys().len(), 50);
    assert_eq!(resolver.feedback_log().len(), 50);
}
