//! Interaction log
//!
//! Every generated answer is recorded; transports later attach helpful or
//! unhelpful feedback through the returned id.

use dashmap::DashMap;

use fleet_assistant_core::{Intent, Interaction, InteractionId};

#[derive(Default)]
pub struct FeedbackCollector {
    interactions: DashMap<InteractionId, Interaction>,
}

impl FeedbackCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answered message
    pub fn record_implicit(&self, message: &str, response: &str, intent: Intent) -> InteractionId {
        let interaction = Interaction::new(message, response, intent);
        let id = interaction.id;
        self.interactions.insert(id, interaction);
        tracing::debug!(id = %id, intent = %intent, "Collected implicit feedback");
        id
    }

    /// Attach explicit feedback; returns the updated interaction, or `None`
    /// for an unknown id
    pub fn record_explicit(&self, id: InteractionId, was_helpful: bool) -> Option<Interaction> {
        let updated = self.interactions.get_mut(&id).map(|mut interaction| {
            interaction.was_helpful = Some(was_helpful);
            interaction.value().clone()
        });
        tracing::info!(id = %id, was_helpful, known = updated.is_some(), "Collected explicit feedback");
        updated
    }

    pub fn get(&self, id: InteractionId) -> Option<Interaction> {
        self.interactions.get(&id).map(|i| i.value().clone())
    }

    /// All interactions, oldest first
    pub fn get_all(&self) -> Vec<Interaction> {
        let mut all: Vec<Interaction> = self.interactions.iter().map(|i| i.value().clone()).collect();
        all.sort_by_key(|i| i.timestamp);
        all
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_get() {
        let collector = FeedbackCollector::new();
        let id = collector.record_implicit("где офис", "Строителей 100А", Intent::OfficeHours);

        let interaction = collector.get(id).unwrap();
        assert_eq!(interaction.message, "где офис");
        assert_eq!(interaction.intent, Intent::OfficeHours);
        assert!(interaction.was_helpful.is_none());
    }

    #[test]
    fn test_explicit_feedback_last_write_wins() {
        let collector = FeedbackCollector::new();
        let id = collector.record_implicit("q", "a", Intent::Service);

        assert_eq!(collector.record_explicit(id, true).unwrap().was_helpful, Some(true));
        collector.record_explicit(id, false);
        assert_eq!(collector.get(id).unwrap().was_helpful, Some(false));
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let collector = FeedbackCollector::new();
        collector.record_implicit("q", "a", Intent::Service);

        assert!(collector.record_explicit(InteractionId::new(), true).is_none());
        assert_eq!(collector.len(), 1);
        assert!(collector.get_all()[0].was_helpful.is_none());
    }

    #[test]
    fn test_ids_unique_under_burst() {
        let collector = FeedbackCollector::new();
        for _ in 0..500 {
            collector.record_implicit("q", "a", Intent::Service);
        }
        assert_eq!(collector.get_all().len(), 500);
    }
}
