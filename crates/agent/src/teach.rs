//! Teach-by-example command
//!
//! ```text
//! /learn
//! Q: Где офис?
//! A: Строителей 100А
//!    второй этаж
//! T: office_hours
//! ```
//!
//! The answer may span several lines until the next prefixed line.

use fleet_assistant_core::Intent;
use thiserror::Error;

use crate::text::normalize;

/// Marker that turns a message into a teach command
pub const TEACH_MARKER: &str = "/learn";

const QUESTION_PREFIX: &str = "Q:";
const ANSWER_PREFIX: &str = "A:";
const TAG_PREFIX: &str = "T:";

/// Generic question openers combined with the base form
const QUESTION_PREFIXES: &[&str] = &[
    "как",
    "где",
    "можно ли",
    "хочу",
    "нужно",
    "подскажите",
    "скажите",
    "расскажите",
    "объясните",
    "помогите",
    "надо",
    "мне нужно",
    "я хочу",
    "хотел бы",
    "могу ли я",
];

/// Question families: detection stems and extra phrasings, checked in order
const QUESTION_FAMILIES: &[(&[&str], &[&str])] = &[
    (
        &["штраф", "штрафы", "штрафов"],
        &[
            "штрафы",
            "штраф",
            "посмотреть штрафы",
            "проверить штрафы",
            "узнать штрафы",
            "где штрафы",
            "как посмотреть штрафы",
            "где посмотреть штрафы",
            "можно посмотреть штрафы",
            "хочу посмотреть штрафы",
            "нужно посмотреть штрафы",
            "проверка штрафов",
        ],
    ),
    (
        &["машин", "авто", "автомобил"],
        &[
            "машины в наличии",
            "доступные машины",
            "свободные автомобили",
            "какие машины есть",
            "автомобили в парке",
            "машины в парке",
            "есть ли машины",
        ],
    ),
    (
        &["оплат", "плат", "платеж"],
        &[
            "способы оплаты",
            "как оплатить",
            "варианты оплаты",
            "принимаете ли карты",
            "можно ли картой",
            "условия оплаты",
        ],
    ),
    // Recognized families without extra phrasings
    (&["график", "режим", "работ"], &[]),
    (&["проблем", "поломк", "сломал"], &[]),
];

/// Teach command failures, rendered as user-facing text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TeachError {
    #[error(
        "❌ Ошибка: неправильный формат. Используйте:\n/learn\nQ: ваш вопрос\nA: правильный ответ\nT: тип_интента\n\nПолученные значения:\nQuestion: {}\nAnswer: {}\nType: {}",
        or_missing(.question),
        or_missing(.answer),
        or_missing(.intent)
    )]
    MissingFields {
        question: String,
        answer: String,
        intent: String,
    },

    #[error("❌ Ошибка: неправильный тип интента \"{0}\".\nИспользуйте один из следующих типов:\n- fine_check (штрафы)\n- available_cars (доступные машины)\n- payment_methods (способы оплаты)\n- car_problem (проблемы с машиной)\n- dtp (ДТП)\nи другие...")]
    InvalidIntent(String),

    #[error("❌ Ошибка при обработке команды обучения: {0}\nПроверьте формат и попробуйте снова.")]
    Processing(String),
}

fn or_missing(value: &str) -> &str {
    if value.is_empty() {
        "отсутствует"
    } else {
        value
    }
}

/// Parsed teach command
#[derive(Debug, Clone, PartialEq)]
pub struct TeachCommand {
    pub question: String,
    pub answer: String,
    pub intent: Intent,
}

impl TeachCommand {
    /// `None` when the message carries no teach marker
    pub fn detect(message: &str) -> Option<Result<Self, TeachError>> {
        message
            .find(TEACH_MARKER)
            .map(|start| Self::parse(&message[start..]))
    }

    /// Parse the command body starting at the marker
    pub fn parse(body: &str) -> Result<Self, TeachError> {
        let mut question = String::new();
        let mut answer = String::new();
        let mut tag = String::new();
        let mut collecting_answer = false;

        for line in body.lines() {
            let line = line.trim_start();
            if let Some(rest) = line.strip_prefix(QUESTION_PREFIX) {
                question = rest.trim().to_string();
                collecting_answer = false;
            } else if let Some(rest) = line.strip_prefix(ANSWER_PREFIX) {
                answer = rest.trim().to_string();
                collecting_answer = true;
            } else if let Some(rest) = line.strip_prefix(TAG_PREFIX) {
                tag = rest.trim().to_string();
                collecting_answer = false;
            } else if collecting_answer && !line.trim().is_empty() {
                if !answer.is_empty() {
                    answer.push('\n');
                }
                answer.push_str(line.trim());
            }
        }

        if question.is_empty() || answer.is_empty() || tag.is_empty() {
            return Err(TeachError::MissingFields {
                question,
                answer,
                intent: tag,
            });
        }

        let intent = tag.parse::<Intent>().map_err(|_| TeachError::InvalidIntent(tag))?;

        Ok(Self {
            question,
            answer,
            intent,
        })
    }

    /// Phrasings of the question to cache alongside the original
    pub fn variations(&self) -> Vec<String> {
        question_variations(&self.question)
    }

    /// Reply for an accepted teach command
    pub fn success_message(&self, variations: usize) -> String {
        format!(
            "✅ Пример успешно добавлен!\n\n📝 Детали:\nВопрос: {}\nОтвет: {}\nТип: {}\n\n🔄 Добавлено {} вариаций вопроса для лучшего распознавания.\nТеперь я буду использовать эту информацию при ответах на похожие вопросы.",
            self.question, self.answer, self.intent, variations
        )
    }
}

/// Deduplicated variations in generation order
pub fn question_variations(question: &str) -> Vec<String> {
    let base = normalize(question);
    let mut variations: Vec<String> = Vec::new();
    let mut add = |v: String| {
        if !variations.contains(&v) {
            variations.push(v);
        }
    };

    add(question.to_string());
    add(base.clone());
    add(format!("{}?", base));

    if let Some((_, extra)) = QUESTION_FAMILIES
        .iter()
        .find(|(stems, _)| stems.iter().any(|stem| base.contains(stem)))
    {
        for phrase in extra.iter() {
            add(phrase.to_string());
        }
    }

    for prefix in QUESTION_PREFIXES {
        add(format!("{} {}", prefix, base));
        add(format!("{} {}?", prefix, base));
    }

    variations
}
