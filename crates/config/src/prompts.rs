//! Prompt templates configuration
//!
//! System prompt for the generation capability, canned responses per intent,
//! and the fixed usage summary shown by the status command.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use fleet_assistant_core::Intent;

/// Prompt templates configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptTemplates {
    /// System prompt base
    #[serde(default)]
    pub system_prompt: SystemPrompt,
    /// Canned responses
    #[serde(default)]
    pub responses: ResponseTemplates,
    /// Status command summary
    #[serde(default)]
    pub status: StatusTemplates,
}

/// System prompt configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemPrompt {
    /// Assistant role description
    pub role: String,
    /// Hard rules
    pub rules: Vec<String>,
    /// Fleet size line shown before the price list
    pub fleet_summary: String,
    /// Price list, one car per line
    pub cars: Vec<String>,
    /// Contact lines
    pub contacts: Vec<String>,
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self {
            role: "Ты бот-помощник автопарка такси \"Центральный\". Твоя задача - помогать водителям и клиентам решать их вопросы.".to_string(),
            rules: vec![
                "Отвечай на все вопросы о доступных машинах и ценах".to_string(),
                "Не отправляй в офис при вопросах о наличии машин".to_string(),
                "Давай конкретную информацию о ценах".to_string(),
                "Используй только указанные контакты".to_string(),
                "Будь краток и конкретен".to_string(),
            ],
            fleet_summary: "У нас в парке более 200 машин. Доступные варианты:".to_string(),
            cars: vec![
                "Лада Веста 2021 г. (МКПП) - 1700₽/сутки".to_string(),
                "Лада Веста 2023 г. (МКПП) - 2000₽/сутки".to_string(),
                "Солярис 2020-21 г. (АКПП) - 2000₽/сутки".to_string(),
                "Джетта 2023 г. (АКПП) - 2300₽/сутки".to_string(),
                "Солярис 2024 г. (АКПП) - 2600₽/сутки".to_string(),
            ],
            contacts: vec![
                "Общие вопросы: тел. 7 927 883-55-66".to_string(),
                "График: Пн-Пт 9:00-19:00, Сб-Вс 10:00-17:00".to_string(),
                "Тех. поддержка: тел. 7 929 734-45-55 (24/7)".to_string(),
                "Проблемы с авто: тел. 7 937 936-00-19 (9:00-18:00)".to_string(),
            ],
        }
    }
}

impl SystemPrompt {
    /// Build full system prompt text
    pub fn build(&self) -> String {
        let mut prompt = format!("{}\n\nВАЖНЫЕ ПРАВИЛА:\n", self.role);

        for (i, rule) in self.rules.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, rule));
        }

        prompt.push_str("\nДОСТУПНЫЕ АВТОМОБИЛИ И ЦЕНЫ:\n");
        prompt.push_str("При вопросах о наличии и ценах ВСЕГДА отвечай следующей информацией:\n");
        prompt.push_str(&self.fleet_summary);
        prompt.push('\n');
        for (i, car) in self.cars.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, car));
        }

        prompt.push_str("\nКОНТАКТЫ И ОФИС:\n");
        for contact in &self.contacts {
            prompt.push_str(&format!("- {}\n", contact));
        }

        prompt.trim_end().to_string()
    }
}

/// Canned responses that bypass generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseTemplates {
    /// Office contact number used in the apology text
    pub contact_phone: String,
    /// Default answer per intent
    pub defaults: HashMap<Intent, String>,
}

impl Default for ResponseTemplates {
    fn default() -> Self {
        let contact_phone = "7 927 883-55-66".to_string();
        let mut defaults = HashMap::new();
        defaults.insert(
            Intent::FineCheck,
            "Посмотреть штрафы на автомобиле, Вы можете через приложение Элемент водитель или обратиться в офис (+79278835566)".to_string(),
        );
        defaults.insert(
            Intent::Error,
            format!(
                "Извините, произошла ошибка. Пожалуйста, попробуйте позже или позвоните нам: {}",
                contact_phone
            ),
        );

        Self {
            contact_phone,
            defaults,
        }
    }
}

impl ResponseTemplates {
    /// Canned answer for a resolved intent, if any
    ///
    /// The `error` intent is excluded: it is only ever produced through
    /// [`ResponseTemplates::error_response`].
    pub fn default_for(&self, intent: Intent) -> Option<&str> {
        if intent == Intent::Error {
            return None;
        }
        self.defaults.get(&intent).map(String::as_str)
    }

    /// Apology text for the `error` intent
    pub fn error_response(&self) -> String {
        self.defaults.get(&Intent::Error).cloned().unwrap_or_else(|| {
            format!(
                "Извините, произошла ошибка. Пожалуйста, попробуйте позже или позвоните нам: {}",
                self.contact_phone
            )
        })
    }
}

/// One line of the usage summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentUsage {
    pub intent: Intent,
    pub count: u32,
}

/// Status command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTemplates {
    /// Fixed top-intent usage summary
    pub top_intents: Vec<IntentUsage>,
}

impl Default for StatusTemplates {
    fn default() -> Self {
        Self {
            top_intents: vec![
                IntentUsage { intent: Intent::AvailableCars, count: 30 },
                IntentUsage { intent: Intent::PaymentMethods, count: 25 },
                IntentUsage { intent: Intent::Maintenance, count: 20 },
            ],
        }
    }
}
