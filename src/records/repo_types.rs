use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::nutrition::Nutrients;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Snack,
    Dinner,
    Supper,
}

impl MealType {
    pub const ALL: [MealType; 5] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Snack,
        MealType::Dinner,
        MealType::Supper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Snack => "snack",
            MealType::Dinner => "dinner",
            MealType::Supper => "supper",
        }
    }

    pub fn label_pt(&self) -> &'static str {
        match self {
            MealType::Breakfast => "Café da manhã",
            MealType::Lunch => "Almoço",
            MealType::Snack => "Lanche",
            MealType::Dinner => "Jantar",
            MealType::Supper => "Ceia",
        }
    }
}

impl std::str::FromStr for MealType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "snack" => Ok(MealType::Snack),
            "dinner" => Ok(MealType::Dinner),
            "supper" => Ok(MealType::Supper),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Nutrient {
    EnergyKcal,
    ProteinG,
    LipidG,
    CarbohydrateG,
    FiberG,
}

impl Nutrient {
    pub const ALL: [Nutrient; 5] = [
        Nutrient::EnergyKcal,
        Nutrient::ProteinG,
        Nutrient::LipidG,
        Nutrient::CarbohydrateG,
        Nutrient::FiberG,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Nutrient::EnergyKcal => "energy_kcal",
            Nutrient::ProteinG => "protein_g",
            Nutrient::LipidG => "lipid_g",
            Nutrient::CarbohydrateG => "carbohydrate_g",
            Nutrient::FiberG => "fiber_g",
        }
    }

    pub fn label_pt(&self) -> &'static str {
        match self {
            Nutrient::EnergyKcal => "Calorias (kcal)",
            Nutrient::ProteinG => "Proteínas (g)",
            Nutrient::LipidG => "Lipídios (g)",
            Nutrient::CarbohydrateG => "Carboidratos (g)",
            Nutrient::FiberG => "Fibras (g)",
        }
    }

    /// Picks this nutrient's amount out of a scaled [`Nutrients`] block.
    pub fn amount_of(&self, n: &Nutrients) -> f64 {
        match self {
            Nutrient::EnergyKcal => n.energy_kcal,
            Nutrient::ProteinG => n.protein_g,
            Nutrient::LipidG => n.lipid_g,
            Nutrient::CarbohydrateG => n.carbohydrate_g,
            Nutrient::FiberG => n.fiber_g,
        }
    }
}

impl std::str::FromStr for Nutrient {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "energy_kcal" => Ok(Nutrient::EnergyKcal),
            "protein_g" => Ok(Nutrient::ProteinG),
            "lipid_g" => Ok(Nutrient::LipidG),
            "carbohydrate_g" => Ok(Nutrient::CarbohydrateG),
            "fiber_g" => Ok(Nutrient::FiberG),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CalcKind {
    Imc,
    Tmb,
    Tdee,
    Fat,
}

impl CalcKind {
    pub const ALL: [CalcKind; 4] = [CalcKind::Imc, CalcKind::Tmb, CalcKind::Tdee, CalcKind::Fat];

    pub fn as_str(&self) -> &'static str {
        match self {
            CalcKind::Imc => "imc",
            CalcKind::Tmb => "tmb",
            CalcKind::Tdee => "tdee",
            CalcKind::Fat => "fat",
        }
    }

    /// Display name, also what the record's `calc_type` reads as in summaries.
    pub fn label(&self) -> &'static str {
        match self {
            CalcKind::Imc => "IMC",
            CalcKind::Tmb => "TMB",
            CalcKind::Tdee => "TDEE",
            CalcKind::Fat => "Fat Percentage",
        }
    }

    pub fn label_pt(&self) -> &'static str {
        match self {
            CalcKind::Imc => "IMC",
            CalcKind::Tmb => "TMB",
            CalcKind::Tdee => "TDEE",
            CalcKind::Fat => "Percentual de Gordura",
        }
    }
}

impl std::str::FromStr for CalcKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "imc" => Ok(CalcKind::Imc),
            "tmb" => Ok(CalcKind::Tmb),
            "tdee" => Ok(CalcKind::Tdee),
            "fat" => Ok(CalcKind::Fat),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
pub enum ReminderKind {
    #[serde(rename = "meal_reminder", alias = "meal")]
    Meal,
    #[serde(rename = "water_reminder", alias = "water")]
    Water,
}

impl ReminderKind {
    pub const ALL: [ReminderKind; 2] = [ReminderKind::Meal, ReminderKind::Water];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::Meal => "meal",
            ReminderKind::Water => "water",
        }
    }

    pub fn label_pt(&self) -> &'static str {
        match self {
            ReminderKind::Meal => "Refeição",
            ReminderKind::Water => "Água",
        }
    }
}

impl std::str::FromStr for ReminderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meal" | "meal_reminder" => Ok(ReminderKind::Meal),
            "water" | "water_reminder" => Ok(ReminderKind::Water),
            _ => Err(()),
        }
    }
}

/// One logged meal.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MealRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_type: MealType,
    pub food_id: i64,
    pub quantity_g: f64,
    pub eaten_at: OffsetDateTime,
}

/// Nutrient target; one row per (user, nutrient).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GoalRow {
    pub user_id: Uuid,
    pub nutrient: Nutrient,
    pub target: f64,
}

/// One water intake entry; append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WaterRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_ml: f64,
    pub day: Date,
}

/// One stored calculator result; append-only, read back as "last N".
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CalculationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub calc_type: CalcKind,
    pub result: f64,
    pub details: String,
    pub created_at: OffsetDateTime,
}

/// Daily reminder slot; one row per (user, kind), time as "HH:MM".
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReminderRow {
    pub user_id: Uuid,
    pub kind: ReminderKind,
    pub at_time: String,
}
