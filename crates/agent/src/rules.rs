//! Compiled intent rules
//!
//! Built from the `IntentRulesConfig` data table. Patterns are compiled once,
//! case-insensitive; keywords and triggers are stored lowercased.

use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use fleet_assistant_config::{IntentRuleDefinition, IntentRulesConfig};
use fleet_assistant_core::Intent;

use crate::AgentError;

/// Rule for one intent, ready for matching
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub intent: Intent,
    pub keywords: Vec<String>,
    pub patterns: Vec<Regex>,
    pub context_triggers: Vec<String>,
}

impl CompiledRule {
    fn compile(definition: &IntentRuleDefinition) -> Result<Self, AgentError> {
        let mut rule = Self {
            intent: definition.intent,
            keywords: Vec::new(),
            patterns: Vec::new(),
            context_triggers: Vec::new(),
        };
        rule.merge(&RuleUpdate {
            keywords: definition.keywords.clone(),
            patterns: definition.patterns.clone(),
            context_triggers: definition.context_triggers.clone(),
        })?;
        Ok(rule)
    }

    /// Union `update` into this rule; duplicates collapse
    ///
    /// All patterns are compiled before anything is modified, so a bad
    /// pattern leaves the rule untouched.
    fn merge(&mut self, update: &RuleUpdate) -> Result<(), AgentError> {
        let compiled = update
            .patterns
            .iter()
            .map(|p| compile_pattern(p))
            .collect::<Result<Vec<_>, _>>()?;

        union_lowercase(&mut self.keywords, &update.keywords);
        union_lowercase(&mut self.context_triggers, &update.context_triggers);
        for regex in compiled {
            if !self.patterns.iter().any(|r| r.as_str() == regex.as_str()) {
                self.patterns.push(regex);
            }
        }
        Ok(())
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, AgentError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| AgentError::Rules(format!("invalid pattern {:?}: {}", pattern, e)))
}

fn union_lowercase(target: &mut Vec<String>, additions: &[String]) {
    for item in additions {
        let item = item.trim().to_lowercase();
        if !item.is_empty() && !target.contains(&item) {
            target.push(item);
        }
    }
}

/// Additions for an existing rule
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleUpdate {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub context_triggers: Vec<String>,
}

/// Rule table in declaration order
pub struct RuleSet {
    rules: RwLock<Vec<CompiledRule>>,
}

impl RuleSet {
    /// Compile a rule table
    pub fn new(config: &IntentRulesConfig) -> Result<Self, AgentError> {
        config
            .validate()
            .map_err(|e| AgentError::Rules(e.to_string()))?;

        let rules = config
            .rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules: RwLock::new(rules),
        })
    }

    /// Built-in table
    pub fn builtin() -> Result<Self, AgentError> {
        Self::new(&IntentRulesConfig::builtin())
    }

    /// Union new keywords, patterns and triggers into an intent's rule
    ///
    /// An intent without a rule gets one appended at the end of the table.
    /// Meta intents are rejected.
    pub fn update(&self, intent: Intent, update: &RuleUpdate) -> Result<(), AgentError> {
        if intent.is_meta() {
            return Err(AgentError::Rules(format!(
                "intent {} cannot carry rules",
                intent
            )));
        }

        let mut rules = self.rules.write();
        match rules.iter_mut().find(|r| r.intent == intent) {
            Some(rule) => rule.merge(update)?,
            None => {
                let mut rule = CompiledRule {
                    intent,
                    keywords: Vec::new(),
                    patterns: Vec::new(),
                    context_triggers: Vec::new(),
                };
                rule.merge(update)?;
                rules.push(rule);
            }
        }

        tracing::info!(
            intent = %intent,
            keywords = update.keywords.len(),
            patterns = update.patterns.len(),
            context_triggers = update.context_triggers.len(),
            "Updated intent rules"
        );
        Ok(())
    }

    /// Run `f` over the rules under a read lock
    pub fn with_rules<T>(&self, f: impl FnOnce(&[CompiledRule]) -> T) -> T {
        f(&self.rules.read())
    }

    pub fn get(&self, intent: Intent) -> Option<CompiledRule> {
        self.rules.read().iter().find(|r| r.intent == intent).cloned()
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_compiles() {
        let rules = RuleSet::builtin().unwrap();
        assert_eq!(rules.len(), 19);

        let dtp = rules.get(Intent::Dtp).unwrap();
        assert!(dtp.patterns[0].is_match("ПОПАЛ В ДТП"));
    }

    #[test]
    fn test_update_is_union() {
        let rules = RuleSet::builtin().unwrap();
        let before = rules.get(Intent::FineCheck).unwrap();

        let update = RuleUpdate {
            keywords: vec!["Штраф".to_string(), "эвакуатор".to_string()],
            patterns: vec![r"где посмотреть штрафы".to_string(), r"штрафстоянка".to_string()],
            context_triggers: vec!["камера".to_string()],
        };
        rules.update(Intent::FineCheck, &update).unwrap();
        rules.update(Intent::FineCheck, &update).unwrap();

        let after = rules.get(Intent::FineCheck).unwrap();
        assert_eq!(after.keywords.len(), before.keywords.len() + 1);
        assert_eq!(after.patterns.len(), before.patterns.len() + 1);
        assert_eq!(after.context_triggers.len(), before.context_triggers.len());
    }

    #[test]
    fn test_invalid_pattern_leaves_rule_untouched() {
        let rules = RuleSet::builtin().unwrap();
        let before = rules.get(Intent::Service).unwrap();

        let update = RuleUpdate {
            keywords: vec!["новое".to_string()],
            patterns: vec!["(unclosed".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            rules.update(Intent::Service, &update),
            Err(AgentError::Rules(_))
        ));
        assert_eq!(rules.get(Intent::Service).unwrap().keywords, before.keywords);
    }

    #[test]
    fn test_meta_intent_rejected() {
        let rules = RuleSet::builtin().unwrap();
        assert!(rules.update(Intent::Cached, &RuleUpdate::default()).is_err());
    }

    #[test]
    fn test_missing_rule_is_appended() {
        let config = IntentRulesConfig { rules: vec![] };
        let rules = RuleSet::new(&config).unwrap();
        assert!(rules.is_empty());

        let update = RuleUpdate {
            keywords: vec!["дтп".to_string()],
            ..Default::default()
        };
        rules.update(Intent::Dtp, &update).unwrap();
        assert_eq!(rules.len(), 1);
    }
}
