//! Resolution result handed back to the chat transport

use serde::{Deserialize, Serialize};

use crate::{Intent, InteractionId};

const ANDROID_DRIVER_APP: &str =
    "https://play.google.com/store/apps/details?id=com.naughtysoft.TtcDriver";
const IPHONE_DRIVER_APP: &str = "https://apps.apple.com/ru/app/element-%D0%BF%D1%80%D0%B8%D0%BB%D0%BE%D0%B6%D0%B5%D0%BD%D0%B8%D0%B5-%D0%B2%D0%BE%D0%B4%D0%B8%D1%82%D0%B5%D0%BB%D1%8F/id1449354142";
const MECHANIC_CHAT: &str = "https://t.me/VV_Korotkov";
const ACCIDENT_MANAGER_CHAT: &str = "https://t.me/ruzalru";

/// Resolved intent plus reply text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub intent: Intent,
    pub response: String,
    /// Present only for freshly generated answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Keyboard the transport should attach
    pub keyboard: KeyboardHint,
    /// Recorded interaction, for later explicit feedback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<InteractionId>,
}

impl Resolution {
    pub fn new(intent: Intent, response: impl Into<String>) -> Self {
        Self {
            intent,
            response: response.into(),
            confidence: None,
            keyboard: KeyboardHint::for_intent(intent),
            interaction_id: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_interaction(mut self, id: InteractionId) -> Self {
        self.interaction_id = Some(id);
        self
    }
}

/// Transport-neutral keyboard layout selected by intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyboardHint {
    /// Back-to-menu only
    Menu,
    /// Call the service desk
    Service,
    /// Talk to the mechanic or the service desk
    CarQuestion,
    /// Contact the accident manager
    Accident,
    /// Driver app store links
    DriverApp,
    /// Contact the mechanic about a long trip
    LongDistance,
}

/// Keyboard button: either a callback id or an external link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyboardButton {
    Callback { label: String, data: String },
    Url { label: String, url: String },
}

impl KeyboardButton {
    fn callback(label: &str, data: &str) -> Self {
        Self::Callback {
            label: label.to_string(),
            data: data.to_string(),
        }
    }

    fn url(label: &str, url: &str) -> Self {
        Self::Url {
            label: label.to_string(),
            url: url.to_string(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Callback { label, .. } | Self::Url { label, .. } => label,
        }
    }
}

impl KeyboardHint {
    pub fn for_intent(intent: Intent) -> Self {
        match intent {
            Intent::Service => Self::Service,
            Intent::CarQuestion => Self::CarQuestion,
            Intent::Dtp => Self::Accident,
            Intent::FineCheck => Self::DriverApp,
            Intent::LongDistance => Self::LongDistance,
            _ => Self::Menu,
        }
    }

    /// Button rows, menu row last
    pub fn rows(&self) -> Vec<Vec<KeyboardButton>> {
        let menu = vec![KeyboardButton::callback("Меню", "back_to_main")];
        let call_service = vec![KeyboardButton::callback("Позвонить в сервис", "call_service")];
        let mechanic = vec![KeyboardButton::url("Связаться с Владимиром", MECHANIC_CHAT)];

        match self {
            Self::Menu => vec![menu],
            Self::Service => vec![call_service, menu],
            Self::CarQuestion => vec![mechanic, call_service, menu],
            Self::Accident => vec![
                vec![KeyboardButton::url("Связаться с Рузалем", ACCIDENT_MANAGER_CHAT)],
                menu,
            ],
            Self::DriverApp => vec![
                vec![
                    KeyboardButton::url("Android", ANDROID_DRIVER_APP),
                    KeyboardButton::url("iPhone", IPHONE_DRIVER_APP),
                ],
                menu,
            ],
            Self::LongDistance => vec![mechanic, menu],
        }
    }
}
