//! Intent rule table
//!
//! Each scorable intent owns three lists: keywords and context triggers are
//! matched as case-insensitive substrings of tokens, patterns are regular
//! expressions matched case-insensitively against the whole message.
//! Order of the table is significant: it breaks ties between equal scores.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use fleet_assistant_core::Intent;

use crate::ConfigError;

/// Rule definition for a single intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRuleDefinition {
    pub intent: Intent,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub context_triggers: Vec<String>,
}

impl IntentRuleDefinition {
    fn new(intent: Intent, keywords: &[&str], patterns: &[&str], triggers: &[&str]) -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            intent,
            keywords: owned(keywords),
            patterns: owned(patterns),
            context_triggers: owned(triggers),
        }
    }
}

/// Full rule table in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRulesConfig {
    pub rules: Vec<IntentRuleDefinition>,
}

impl Default for IntentRulesConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl IntentRulesConfig {
    /// Load a rule table from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a YAML rule table
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        tracing::debug!(rules = config.rules.len(), "Loaded intent rule table");
        Ok(config)
    }

    /// Load from `path` when given, otherwise the built-in table
    pub fn load_or_builtin(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::builtin()),
        }
    }

    /// Meta intents carry no rules and each intent appears at most once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.intent.is_meta() {
                return Err(ConfigError::InvalidValue {
                    field: format!("rules.{}", rule.intent),
                    message: "meta intents cannot have rules".to_string(),
                });
            }
            if !seen.insert(rule.intent) {
                return Err(ConfigError::InvalidValue {
                    field: format!("rules.{}", rule.intent),
                    message: "duplicate rule definition".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, intent: Intent) -> Option<&IntentRuleDefinition> {
        self.rules.iter().find(|r| r.intent == intent)
    }

    /// Built-in table for the taxi fleet domain
    pub fn builtin() -> Self {
        use Intent::*;
        type R = IntentRuleDefinition;

        let rules = vec![
            R::new(
                PaymentMethods,
                &["оплата", "платеж", "карта", "наличные", "перевод", "способ", "деньги", "счет", "банк"],
                &[
                    r"как (оплатить|заплатить)",
                    r"способы? оплаты",
                    r"чем (платить|оплатить)",
                    r"принимае(те|м) (оплату|карты)",
                ],
                &["платеж", "транзакция", "перевод"],
            ),
            R::new(
                PaymentSchedule,
                &["график", "расписание", "списание", "время", "дата", "платеж", "периодичность", "регулярность"],
                &[
                    r"когда (списывают|платить)",
                    r"график (оплаты|платежей)",
                    r"частота списаний",
                    r"периодичность платежей",
                ],
                &["число", "месяц", "период", "дата"],
            ),
            R::new(
                CarReturn,
                &["вернуть", "возврат", "сдать", "сдача", "завершить", "закончить", "аренда", "прекратить"],
                &[
                    r"как (вернуть|сдать) (машину|автомобиль)",
                    r"правила (возврата|сдачи)",
                    r"где (вернуть|сдать)",
                    r"когда (вернуть|сдать)",
                ],
                &["место", "время", "адрес", "пункт"],
            ),
            R::new(
                Penalties,
                &["штраф", "нарушение", "пени", "санкции", "наказание", "взыскание", "задолженность"],
                &[
                    r"получил штраф",
                    r"есть ли штрафы",
                    r"проверить (штрафы|нарушения)",
                    r"что будет (за|если)",
                ],
                &["нарушение", "правила", "оплата"],
            ),
            R::new(
                Maintenance,
                &["то", "обслуживание", "проверка", "диагностика", "осмотр", "техосмотр", "сервис"],
                &[
                    r"техническое обслуживание",
                    r"когда (то|обслуживание)",
                    r"нужно ли (то|обслуживание)",
                    r"правила обслуживания",
                ],
                &["масло", "фильтр", "колеса", "тормоза"],
            ),
            R::new(
                RentalRules,
                &["правила", "условия", "требования", "ограничения", "запрет", "разрешение", "можно", "нельзя"],
                &[
                    r"какие правила",
                    r"что (можно|нельзя)",
                    r"правила (использования|аренды)",
                    r"условия (аренды|использования)",
                ],
                &["документ", "договор", "соглашение"],
            ),
            R::new(
                OfficeHours,
                &["график", "время", "часы", "работа", "открыто", "закрыто", "перерыв", "обед"],
                &[
                    r"когда (работает|открыто)",
                    r"часы работы",
                    r"время работы",
                    r"график работы",
                ],
                &["офис", "филиал", "отделение"],
            ),
            R::new(
                GeographicalRules,
                &["зона", "территория", "город", "область", "регион", "граница", "выезд", "передвижение"],
                &[
                    r"где можно ездить",
                    r"зона (использования|поездок)",
                    r"можно ли выехать",
                    r"территория (использования|обслуживания)",
                ],
                &["карта", "маршрут", "расстояние"],
            ),
            R::new(
                SickLeave,
                &["больничный", "болезнь", "заболел", "врач", "недомогание", "плохо", "здоровье"],
                &[
                    r"как оформить больничный",
                    r"заболел, что делать",
                    r"если заболею",
                    r"плохо себя чувствую",
                ],
                &["справка", "документ", "медицинский"],
            ),
            R::new(
                RepairRules,
                &["ремонт", "поломка", "починка", "сервис", "мастерская", "запчасти", "детали"],
                &[
                    r"как (починить|отремонтировать)",
                    r"правила ремонта",
                    r"где (чинить|ремонтировать)",
                    r"поломалась машина",
                ],
                &["сервис", "мастер", "механик"],
            ),
            R::new(
                Accident,
                &["дтп", "авария", "столкновение", "происшествие", "удар", "повреждение", "царапина"],
                &[
                    r"что делать при дтп",
                    r"попал в аварию",
                    r"случилось дтп",
                    r"пдд нарушение",
                ],
                &["страховка", "полиция", "гибдд"],
            ),
            R::new(
                CarProblem,
                &["проблема", "неисправность", "поломка", "сломалась", "не работает", "не заводится"],
                &[
                    r"машина сломалась",
                    r"проблема с автомобилем",
                    r"не работает",
                    r"что делать если",
                ],
                &["стук", "шум", "вибрация", "течь"],
            ),
            R::new(
                BalanceTopup,
                &["пополнить", "баланс", "деньги", "счет", "оплата", "перевод", "внести"],
                &[
                    r"как пополнить",
                    r"пополнение баланса",
                    r"внести деньги",
                    r"способы пополнения",
                ],
                &["карта", "банк", "терминал"],
            ),
            R::new(
                AvailableCars,
                &["машины", "автомобили", "доступно", "свободно", "варианты", "выбор", "модели"],
                &[
                    r"какие машины есть",
                    r"доступные автомобили",
                    r"что есть в наличии",
                    r"свободные машины",
                ],
                &["цена", "стоимость", "тариф"],
            ),
            R::new(
                Service,
                &["сервис", "обслуживание", "ремонт", "то", "диагностика", "проверка", "осмотр"],
                &[
                    r"записаться на сервис",
                    r"нужно обслуживание",
                    r"проверить машину",
                    r"записать на то",
                ],
                &["механик", "мастер", "станция"],
            ),
            R::new(
                CarQuestion,
                &["вопрос", "машина", "автомобиль", "характеристики", "особенности", "комплектация", "информация"],
                &[
                    r"расскажите про (машину|автомобиль)",
                    r"какая машина",
                    r"что за автомобиль",
                    r"характеристики авто",
                ],
                &["модель", "марка", "год", "двигатель"],
            ),
            R::new(
                Dtp,
                &["дтп", "авария", "столкновение", "удар", "гибдд", "страховка", "происшествие", "повреждение"],
                &[
                    r"попал в (дтп|аварию)",
                    r"меня (стукнули|подбили)",
                    r"(случилось|произошло) дтп",
                    r"что делать при (дтп|аварии)",
                ],
                &["царапина", "вмятина", "разбил", "помял"],
            ),
            R::new(
                FineCheck,
                &["штраф", "нарушение", "проверка", "гибдд", "камера", "пдд", "оплата", "квитанция"],
                &[
                    r"проверить штрафы?",
                    r"есть ли штрафы?",
                    r"как (оплатить|проверить) штраф",
                    r"где посмотреть штрафы",
                ],
                &["постановление", "нарушение", "камера"],
            ),
            R::new(
                LongDistance,
                &["поездка", "дальняя", "межгород", "расстояние", "километраж", "маршрут", "путь"],
                &[
                    r"дальняя поездка",
                    r"выезд (в|за) город",
                    r"межгород(няя|нее)",
                    r"поездка в другой город",
                ],
                &["километр", "регион", "область", "граница"],
            ),
        ];

        Self { rules }
    }
}
