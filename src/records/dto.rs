use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::nutrition::{ActivityLevel, Gender, Nutrients};
use crate::records::repo_types::{CalcKind, MealType, Nutrient, ReminderKind};

/// Body for `POST /meals`.
#[derive(Debug, Deserialize)]
pub struct CreateMealRequest {
    pub meal_type: MealType,
    pub food_id: i64,
    pub quantity: f64,
}

/// Body for `POST /goals`.
#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    pub nutrient: Nutrient,
    pub value: f64,
}

/// Body for `POST /water`.
#[derive(Debug, Deserialize)]
pub struct CreateWaterRequest {
    pub amount: f64,
}

/// Body for `POST /calculations`. Which optional fields are required depends
/// on `calc_type`; the service rejects incomplete requests.
#[derive(Debug, Deserialize)]
pub struct CalculationRequest {
    pub calc_type: CalcKind,
    pub weight: f64,
    pub height: Option<f64>,
    pub age: Option<f64>,
    pub gender: Option<Gender>,
    pub activity_level: Option<ActivityLevel>,
}

/// Body for `POST /reminders`.
#[derive(Debug, Deserialize)]
pub struct CreateReminderRequest {
    #[serde(rename = "type")]
    pub kind: ReminderKind,
    pub time: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TipResponse {
    pub tip: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryMeal {
    pub meal_type: MealType,
    pub description: String,
    pub quantity_g: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub eaten_at: OffsetDateTime,
    pub nutrients: Nutrients,
}

#[derive(Debug, Serialize)]
pub struct GoalProgress {
    pub nutrient: Nutrient,
    pub current: f64,
    pub target: f64,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct SummaryCalculation {
    pub calc_type: CalcKind,
    pub result: f64,
    pub details: String,
}

/// Response for `GET /summary/{user_id}`: the formatted text block plus the
/// structured pieces it was built from.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub text: String,
    pub meals: Vec<SummaryMeal>,
    pub goals: Vec<GoalProgress>,
    pub water: f64,
    pub calculations: Vec<SummaryCalculation>,
}
