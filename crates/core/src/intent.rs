//! Intent set and scoring types
//!
//! The intent set is closed: adding an intent is a code change, not a runtime
//! registration. Four of the intents are meta-intents produced by the resolver
//! itself (`learning`, `status`, `cached`, `error`) and never carry scoring rules.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Ways to pay for the rental
    PaymentMethods,
    /// Payment and write-off schedule
    PaymentSchedule,
    /// Returning a car
    CarReturn,
    /// Penalties and sanctions
    Penalties,
    /// Scheduled maintenance
    Maintenance,
    /// General rental rules
    RentalRules,
    /// Office opening hours
    OfficeHours,
    /// Where the car may be driven
    GeographicalRules,
    /// Reporting sick leave
    SickLeave,
    /// Repair rules
    RepairRules,
    /// Road accident
    Accident,
    /// Technical problem with the car
    CarProblem,
    /// Topping up the driver balance
    BalanceTopup,
    /// Cars available for rent
    AvailableCars,
    /// Teach-by-example command
    Learning,
    /// Status command
    Status,
    /// Answer served from the response cache
    Cached,
    /// Service booking
    Service,
    /// Questions about a specific car
    CarQuestion,
    /// Road accident (alternate tag kept for keyboard routing)
    Dtp,
    /// Checking traffic fines
    FineCheck,
    /// Long-distance trips
    LongDistance,
    /// Processing failure
    Error,
}

impl Intent {
    /// Every intent in declaration order
    pub const ALL: [Intent; 23] = [
        Intent::PaymentMethods,
        Intent::PaymentSchedule,
        Intent::CarReturn,
        Intent::Penalties,
        Intent::Maintenance,
        Intent::RentalRules,
        Intent::OfficeHours,
        Intent::GeographicalRules,
        Intent::SickLeave,
        Intent::RepairRules,
        Intent::Accident,
        Intent::CarProblem,
        Intent::BalanceTopup,
        Intent::AvailableCars,
        Intent::Learning,
        Intent::Status,
        Intent::Cached,
        Intent::Service,
        Intent::CarQuestion,
        Intent::Dtp,
        Intent::FineCheck,
        Intent::LongDistance,
        Intent::Error,
    ];

    /// Wire tag of the intent
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::PaymentMethods => "payment_methods",
            Intent::PaymentSchedule => "payment_schedule",
            Intent::CarReturn => "car_return",
            Intent::Penalties => "penalties",
            Intent::Maintenance => "maintenance",
            Intent::RentalRules => "rental_rules",
            Intent::OfficeHours => "office_hours",
            Intent::GeographicalRules => "geographical_rules",
            Intent::SickLeave => "sick_leave",
            Intent::RepairRules => "repair_rules",
            Intent::Accident => "accident",
            Intent::CarProblem => "car_problem",
            Intent::BalanceTopup => "balance_topup",
            Intent::AvailableCars => "available_cars",
            Intent::Learning => "learning",
            Intent::Status => "status",
            Intent::Cached => "cached",
            Intent::Service => "service",
            Intent::CarQuestion => "car_question",
            Intent::Dtp => "dtp",
            Intent::FineCheck => "fine_check",
            Intent::LongDistance => "long_distance",
            Intent::Error => "error",
        }
    }

    /// Meta-intents are produced by the resolver and have no scoring rule
    pub fn is_meta(&self) -> bool {
        matches!(
            self,
            Intent::Learning | Intent::Status | Intent::Cached | Intent::Error
        )
    }

    /// Intents that can be scored from text
    pub fn scorable() -> impl Iterator<Item = Intent> {
        Self::ALL.into_iter().filter(|i| !i.is_meta())
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown intent tag
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown intent tag: {0}")]
pub struct ParseIntentError(pub String);

impl FromStr for Intent {
    type Err = ParseIntentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|intent| intent.as_str() == s)
            .ok_or_else(|| ParseIntentError(s.to_string()))
    }
}

/// Confidence of one intent for one piece of text
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntentScore {
    pub intent: Intent,
    /// Weighted confidence in [0, 1]
    pub confidence: f32,
}

/// Confirmed (or tentative) text -> intent association kept by the learning store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentExample {
    pub text: String,
    pub intent: Intent,
    pub confidence: f32,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}

impl IntentExample {
    /// Confirmed examples carry full confidence, unconfirmed ones half
    pub fn new(text: impl Into<String>, intent: Intent, confirmed: bool) -> Self {
        Self {
            text: text.into(),
            intent,
            confidence: if confirmed { 1.0 } else { 0.5 },
            confirmed,
            created_at: Utc::now(),
        }
    }
}
