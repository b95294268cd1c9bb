//! Rule-based intent scoring
//!
//! confidence = 0.4 * keywords + 0.4 * patterns + 0.2 * context triggers
//!
//! Keyword and trigger sub-scores count matching tokens against the size of
//! the rule list and are clamped to 1.0, so confidence stays within [0, 1].

use std::sync::Arc;

use fleet_assistant_core::{Intent, IntentScore};

use crate::rules::{CompiledRule, RuleSet, RuleUpdate};
use crate::text::{normalize, tokenize};
use crate::AgentError;

const KEYWORD_WEIGHT: f32 = 0.4;
const PATTERN_WEIGHT: f32 = 0.4;
const CONTEXT_WEIGHT: f32 = 0.2;

/// Scores text against every rule
pub struct IntentScorer {
    rules: Arc<RuleSet>,
}

impl IntentScorer {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    /// Score a raw message
    ///
    /// Tokens come from the normalized text; patterns run against the raw
    /// message so that filler words they rely on ("как пополнить") survive.
    /// Result is sorted by confidence descending; equal scores keep rule
    /// declaration order.
    pub fn score(&self, message: &str) -> Vec<IntentScore> {
        let normalized = normalize(message);
        let tokens = tokenize(&normalized);
        let raw = message.trim();

        let mut scores: Vec<IntentScore> = self.rules.with_rules(|rules| {
            rules
                .iter()
                .map(|rule| IntentScore {
                    intent: rule.intent,
                    confidence: score_rule(rule, &tokens, raw),
                })
                .collect()
        });

        // sort_by is stable
        scores.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        scores
    }

    /// Highest scoring intent, if any rule exists
    pub fn top(&self, message: &str) -> Option<IntentScore> {
        self.score(message).into_iter().next()
    }

    pub fn update_rules(&self, intent: Intent, update: &RuleUpdate) -> Result<(), AgentError> {
        self.rules.update(intent, update)
    }
}

fn score_rule(rule: &CompiledRule, tokens: &[&str], raw: &str) -> f32 {
    let keyword = token_match_ratio(tokens, &rule.keywords);
    let pattern = pattern_match_ratio(raw, rule);
    let context = token_match_ratio(tokens, &rule.context_triggers);

    (KEYWORD_WEIGHT * keyword + PATTERN_WEIGHT * pattern + CONTEXT_WEIGHT * context).min(1.0)
}

/// Tokens containing any term, over the number of terms
fn token_match_ratio(tokens: &[&str], terms: &[String]) -> f32 {
    let matches = tokens
        .iter()
        .filter(|token| {
            let token = token.to_lowercase();
            terms.iter().any(|term| token.contains(term.as_str()))
        })
        .count();

    (matches as f32 / terms.len().max(1) as f32).min(1.0)
}

fn pattern_match_ratio(raw: &str, rule: &CompiledRule) -> f32 {
    let matches = rule.patterns.iter().filter(|p| p.is_match(raw)).count();
    matches as f32 / rule.patterns.len().max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_assistant_config::{IntentRuleDefinition, IntentRulesConfig};

    fn scorer() -> IntentScorer {
        IntentScorer::new(Arc::new(RuleSet::builtin().unwrap()))
    }

    fn rule(intent: Intent, keywords: &[&str], patterns: &[&str], triggers: &[&str]) -> IntentRuleDefinition {
        IntentRuleDefinition {
            intent,
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            context_triggers: triggers.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_one_score_per_rule_sorted() {
        let scores = scorer().score("Попал в ДТП, что делать при дтп");
        assert_eq!(scores.len(), 19);
        assert!(scores.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(&s.confidence)));
    }

    #[test]
    fn test_weights() {
        let config = IntentRulesConfig {
            rules: vec![rule(Intent::Dtp, &["дтп"], &["попал в дтп"], &["гибдд"])],
        };
        let scorer = IntentScorer::new(Arc::new(RuleSet::new(&config).unwrap()));

        let top = scorer.top("попал в дтп").unwrap();
        assert!((top.confidence - 0.8).abs() < 1e-6);

        let top = scorer.top("попал в дтп гибдд").unwrap();
        assert!((top.confidence - 1.0).abs() < 1e-6);

        let top = scorer.top("гибдд").unwrap();
        assert!((top.confidence - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_keyword_ratio_is_clamped() {
        let config = IntentRulesConfig {
            rules: vec![rule(Intent::Dtp, &["дтп"], &[], &[])],
        };
        let scorer = IntentScorer::new(Arc::new(RuleSet::new(&config).unwrap()));

        let top = scorer.top("дтп дтп дтп дтп").unwrap();
        assert!((top.confidence - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_ties_keep_declaration_order() {
        let config = IntentRulesConfig {
            rules: vec![
                rule(Intent::Accident, &["дтп"], &[], &[]),
                rule(Intent::Dtp, &["дтп"], &[], &[]),
            ],
        };
        let scorer = IntentScorer::new(Arc::new(RuleSet::new(&config).unwrap()));

        let scores = scorer.score("дтп");
        assert_eq!(scores[0].intent, Intent::Accident);
        assert_eq!(scores[1].intent, Intent::Dtp);
        assert_eq!(scores[0].confidence, scores[1].confidence);
    }

    #[test]
    fn test_patterns_see_filler_words() {
        let config = IntentRulesConfig {
            rules: vec![rule(Intent::BalanceTopup, &[], &["как пополнить"], &[])],
        };
        let scorer = IntentScorer::new(Arc::new(RuleSet::new(&config).unwrap()));

        let top = scorer.top("Как пополнить?").unwrap();
        assert!((top.confidence - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_runtime_update_changes_scores() {
        let scorer = scorer();
        let before = scorer
            .score("эвакуатор")
            .into_iter()
            .find(|s| s.intent == Intent::CarProblem)
            .unwrap();
        assert_eq!(before.confidence, 0.0);

        scorer
            .update_rules(
                Intent::CarProblem,
                &RuleUpdate {
                    keywords: vec!["эвакуатор".to_string()],
                    ..Default::default()
                },
            )
            .unwrap();

        let after = scorer
            .score("эвакуатор")
            .into_iter()
            .find(|s| s.intent == Intent::CarProblem)
            .unwrap();
        assert!(after.confidence > 0.0);
    }

    #[test]
    fn test_empty_text() {
        let scores = scorer().score("");
        assert!(scores.iter().all(|s| s.confidence == 0.0));
        assert_eq!(scores[0].intent, Intent::PaymentMethods);
    }
}
