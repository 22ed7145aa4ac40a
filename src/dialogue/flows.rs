use crate::nutrition::Gender;
use crate::records::repo_types::{CalcKind, MealType, Nutrient, ReminderKind};

/// The active flow for one chat. Each variant carries the fields accumulated
/// so far, so a session is exactly one of these values.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    Meal(MealFlow),
    Goal(GoalFlow),
    /// Single-step flow: waiting for the amount in ml.
    Water,
    Calc(CalcFlow),
    Reminder(ReminderFlow),
    Signup(CredentialStep),
    Login(CredentialStep),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MealFlow {
    SelectMealType,
    SelectFood {
        meal_type: MealType,
    },
    SearchFood {
        meal_type: MealType,
    },
    EnterQuantity {
        meal_type: MealType,
        food_id: i64,
        food_name: String,
    },
    Confirm {
        meal_type: MealType,
        food_id: i64,
        food_name: String,
        quantity_g: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum GoalFlow {
    SelectNutrient,
    EnterValue { nutrient: Nutrient },
}

/// Calculator steps. IMC stops after height, Fat skips height (the formula
/// falls back to 170 cm), TMB stops at gender, TDEE adds the activity level.
#[derive(Debug, Clone, PartialEq)]
pub enum CalcFlow {
    SelectCalculator,
    EnterWeight {
        kind: CalcKind,
    },
    EnterHeight {
        kind: CalcKind,
        weight: f64,
    },
    EnterAge {
        kind: CalcKind,
        weight: f64,
        height: Option<f64>,
    },
    SelectGender {
        kind: CalcKind,
        weight: f64,
        height: Option<f64>,
        age: f64,
    },
    SelectActivity {
        weight: f64,
        height: Option<f64>,
        age: f64,
        gender: Gender,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReminderFlow {
    SelectKind,
    EnterTime { kind: ReminderKind },
}

/// Shared by signup and login: ask for a username, then a password.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialStep {
    EnterUsername,
    EnterPassword { username: String },
}
