use std::str::FromStr;

use crate::nutrition::{ActivityLevel, Gender};
use crate::records::repo_types::{CalcKind, MealType, Nutrient, ReminderKind};

/// Slash commands accepted at any point of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Meals,
    Goals,
    Water,
    Summary,
    Calculations,
    Reminders,
    Tips,
    Signup,
    Login,
    Cancel,
}

impl Command {
    /// Decode "/meals" style text, tolerating a trailing "@botname".
    pub fn parse(text: &str) -> Option<Command> {
        let first = text.trim().split_whitespace().next()?;
        let cmd = first.split('@').next().unwrap_or(first);
        match cmd {
            "/start" => Some(Command::Start),
            "/meals" => Some(Command::Meals),
            "/goals" => Some(Command::Goals),
            "/water" => Some(Command::Water),
            "/summary" => Some(Command::Summary),
            "/calculations" => Some(Command::Calculations),
            "/reminders" => Some(Command::Reminders),
            "/tips" => Some(Command::Tips),
            "/signup" => Some(Command::Signup),
            "/login" => Some(Command::Login),
            "/cancel" => Some(Command::Cancel),
            _ => None,
        }
    }
}

/// Button payloads. The delivery adapter decodes callback data into these
/// once at its boundary; the engine never sees raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackToken {
    MealType(MealType),
    Food(i64),
    SearchFood,
    Nutrient(Nutrient),
    Calculator(CalcKind),
    Gender(Gender),
    Activity(ActivityLevel),
    Reminder(ReminderKind),
    Signup,
    Login,
    Anonymous,
}

impl CallbackToken {
    pub fn encode(&self) -> String {
        match self {
            CallbackToken::MealType(mt) => format!("meal_{}", mt.as_str()),
            CallbackToken::Food(id) => format!("food_{id}"),
            CallbackToken::SearchFood => "search_food".into(),
            CallbackToken::Nutrient(n) => format!("nutrient_{}", n.as_str()),
            CallbackToken::Calculator(c) => format!("calc_{}", c.as_str()),
            CallbackToken::Gender(g) => format!("gender_{}", g.as_str()),
            CallbackToken::Activity(a) => format!("activity_{}", a.as_str()),
            CallbackToken::Reminder(r) => format!("reminder_{}", r.as_str()),
            CallbackToken::Signup => "signup".into(),
            CallbackToken::Login => "login".into(),
            CallbackToken::Anonymous => "anonymous".into(),
        }
    }

    pub fn decode(data: &str) -> Option<CallbackToken> {
        if let Some(rest) = data.strip_prefix("meal_") {
            return MealType::from_str(rest).ok().map(CallbackToken::MealType);
        }
        if let Some(rest) = data.strip_prefix("food_") {
            return rest.parse::<i64>().ok().map(CallbackToken::Food);
        }
        if let Some(rest) = data.strip_prefix("nutrient_") {
            return Nutrient::from_str(rest).ok().map(CallbackToken::Nutrient);
        }
        if let Some(rest) = data.strip_prefix("calc_") {
            return CalcKind::from_str(rest).ok().map(CallbackToken::Calculator);
        }
        if let Some(rest) = data.strip_prefix("gender_") {
            return Gender::from_str(rest).ok().map(CallbackToken::Gender);
        }
        if let Some(rest) = data.strip_prefix("activity_") {
            return ActivityLevel::from_str(rest)
                .ok()
                .map(CallbackToken::Activity);
        }
        if let Some(rest) = data.strip_prefix("reminder_") {
            return ReminderKind::from_str(rest)
                .ok()
                .map(CallbackToken::Reminder);
        }
        match data {
            "search_food" => Some(CallbackToken::SearchFood),
            "signup" => Some(CallbackToken::Signup),
            "login" => Some(CallbackToken::Login),
            "anonymous" => Some(CallbackToken::Anonymous),
            _ => None,
        }
    }
}

/// One inbound event for one chat.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Command(Command),
    Callback(CallbackToken),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub token: CallbackToken,
}

impl Button {
    pub fn new(label: impl Into<String>, token: CallbackToken) -> Self {
        Self {
            label: label.into(),
            token,
        }
    }
}

/// Outbound prompt: text plus an optional inline keyboard, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Vec<Vec<Button>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Vec::new(),
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Vec<Vec<Button>>) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_parse_variants() {
        assert_eq!(Command::parse("/meals"), Some(Command::Meals));
        assert_eq!(Command::parse("  /tips  "), Some(Command::Tips));
        assert_eq!(Command::parse("/summary@nutribot"), Some(Command::Summary));
        assert_eq!(Command::parse("/unknown"), None);
        assert_eq!(Command::parse("oi"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn callback_tokens_roundtrip() {
        let tokens = [
            CallbackToken::MealType(MealType::Lunch),
            CallbackToken::Food(12),
            CallbackToken::SearchFood,
            CallbackToken::Nutrient(Nutrient::EnergyKcal),
            CallbackToken::Calculator(CalcKind::Tdee),
            CallbackToken::Gender(Gender::Female),
            CallbackToken::Activity(ActivityLevel::VeryActive),
            CallbackToken::Reminder(ReminderKind::Water),
            CallbackToken::Signup,
            CallbackToken::Login,
            CallbackToken::Anonymous,
        ];
        for token in tokens {
            assert_eq!(CallbackToken::decode(&token.encode()), Some(token));
        }
    }

    #[test]
    fn callback_decode_rejects_unknown() {
        assert_eq!(CallbackToken::decode("meal_brunch"), None);
        assert_eq!(CallbackToken::decode("food_abc"), None);
        assert_eq!(CallbackToken::decode("totally-else"), None);
    }
}
