use serde::{Deserialize, Serialize};

use crate::foods::FoodRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn label_pt(&self) -> &'static str {
        match self {
            Gender::Male => "Masculino",
            Gender::Female => "Feminino",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 5] = [
        ActivityLevel::Sedentary,
        ActivityLevel::Light,
        ActivityLevel::Moderate,
        ActivityLevel::Active,
        ActivityLevel::VeryActive,
    ];

    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very_active",
        }
    }

    pub fn label_pt(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "Sedentário (pouco ou nenhum exercício)",
            ActivityLevel::Light => "Leve (exercício leve 1-3 dias/semana)",
            ActivityLevel::Moderate => "Moderado (exercício moderado 3-5 dias/semana)",
            ActivityLevel::Active => "Ativo (exercício intenso 6-7 dias/semana)",
            ActivityLevel::VeryActive => "Muito Ativo (exercício muito intenso ou trabalho físico)",
        }
    }
}

impl std::str::FromStr for ActivityLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "light" => Ok(ActivityLevel::Light),
            "moderate" => Ok(ActivityLevel::Moderate),
            "active" => Ok(ActivityLevel::Active),
            "very_active" => Ok(ActivityLevel::VeryActive),
            _ => Err(()),
        }
    }
}

/// Nutrient amounts for a concrete quantity of food.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Nutrients {
    pub energy_kcal: f64,
    pub protein_g: f64,
    pub lipid_g: f64,
    pub carbohydrate_g: f64,
    pub fiber_g: f64,
}

impl std::ops::AddAssign<&Nutrients> for Nutrients {
    fn add_assign(&mut self, rhs: &Nutrients) {
        self.energy_kcal += rhs.energy_kcal;
        self.protein_g += rhs.protein_g;
        self.lipid_g += rhs.lipid_g;
        self.carbohydrate_g += rhs.carbohydrate_g;
        self.fiber_g += rhs.fiber_g;
    }
}

/// Scales the per-100g table values linearly; "NA" source values scale to 0.
pub fn scale_nutrients(food: &FoodRecord, quantity_g: f64) -> Nutrients {
    let factor = quantity_g / 100.0;
    let scale = |v: Option<f64>| v.unwrap_or(0.0) * factor;
    Nutrients {
        energy_kcal: scale(food.energy_kcal),
        protein_g: scale(food.protein_g),
        lipid_g: scale(food.lipid_g),
        carbohydrate_g: scale(food.carbohydrate_g),
        fiber_g: scale(food.fiber_g),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImcCategory {
    Underweight,
    Normal,
    Overweight,
    ObesityI,
    ObesityII,
    ObesityIII,
}

impl ImcCategory {
    pub fn name_pt(&self) -> &'static str {
        match self {
            ImcCategory::Underweight => "Abaixo do peso",
            ImcCategory::Normal => "Peso normal",
            ImcCategory::Overweight => "Sobrepeso",
            ImcCategory::ObesityI => "Obesidade grau I",
            ImcCategory::ObesityII => "Obesidade grau II",
            ImcCategory::ObesityIII => "Obesidade grau III",
        }
    }

    pub fn interpretation_pt(&self) -> &'static str {
        match self {
            ImcCategory::Underweight => {
                "Você está abaixo do peso ideal. Considere consultar um nutricionista."
            }
            ImcCategory::Normal => "Seu peso está na faixa considerada saudável.",
            ImcCategory::Overweight => {
                "Você está com sobrepeso. Uma dieta equilibrada pode ajudar."
            }
            ImcCategory::ObesityI => "Você está no grau I de obesidade. Consulte um profissional.",
            ImcCategory::ObesityII => {
                "Você está no grau II de obesidade. Atenção à saúde é importante."
            }
            ImcCategory::ObesityIII => {
                "Você está no grau III de obesidade. Busque orientação médica."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImcReading {
    pub value: f64,
    pub category: ImcCategory,
}

/// Body mass index from weight in kg and height in cm. The category bands
/// partition [0, ∞) at 18.5 / 25 / 30 / 35 / 40.
pub fn imc(weight_kg: f64, height_cm: f64) -> ImcReading {
    let height_m = height_cm / 100.0;
    let value = weight_kg / (height_m * height_m);
    let category = if value < 18.5 {
        ImcCategory::Underweight
    } else if value < 25.0 {
        ImcCategory::Normal
    } else if value < 30.0 {
        ImcCategory::Overweight
    } else if value < 35.0 {
        ImcCategory::ObesityI
    } else if value < 40.0 {
        ImcCategory::ObesityII
    } else {
        ImcCategory::ObesityIII
    };
    ImcReading { value, category }
}

/// Basal metabolic rate (kcal/day), Mifflin-St Jeor.
pub fn basal_metabolic_rate(weight_kg: f64, height_cm: f64, age_years: f64, gender: Gender) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * age_years;
    match gender {
        Gender::Male => base + 5.0,
        Gender::Female => base - 161.0,
    }
}

/// Total daily energy expenditure: BMR scaled by the activity factor.
pub fn total_energy_expenditure(bmr: f64, level: ActivityLevel) -> f64 {
    bmr * level.multiplier()
}

/// Estimated body fat percentage, Deurenberg formula, clamped at 0.
pub fn body_fat_percentage(imc_value: f64, age_years: f64, gender: Gender) -> f64 {
    let fat = match gender {
        Gender::Male => 1.2 * imc_value + 0.23 * age_years - 16.2,
        Gender::Female => 1.2 * imc_value + 0.23 * age_years - 5.4,
    };
    fat.max(0.0)
}
