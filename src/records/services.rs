use sqlx::PgPool;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::foods::FoodTable;
use crate::notifier::{parse_hhmm, ReminderScheduler};
use crate::nutrition::{
    self, basal_metabolic_rate, body_fat_percentage, imc, scale_nutrients, total_energy_expenditure,
};
use crate::records::dto::{
    CalculationRequest, GoalProgress, SummaryCalculation, SummaryMeal, SummaryResponse,
};
use crate::records::repo_types::{
    CalcKind, CalculationRow, GoalRow, MealRow, MealType, Nutrient, ReminderKind, ReminderRow,
    WaterRow,
};
use crate::texts;

/// How many recent calculations the daily summary shows.
const SUMMARY_CALCULATIONS: i64 = 2;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Caller sent something the operation cannot accept; maps to 400.
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn invalid(msg: impl Into<String>) -> ServiceError {
    ServiceError::Invalid(msg.into())
}

/// Persist one meal entry. The food must resolve in the static table and the
/// quantity must be positive.
pub async fn record_meal(
    db: &PgPool,
    foods: &FoodTable,
    user_id: Uuid,
    meal_type: MealType,
    food_id: i64,
    quantity_g: f64,
) -> Result<String, ServiceError> {
    if !(quantity_g > 0.0) {
        return Err(invalid("A quantidade deve ser um número positivo."));
    }
    let food = foods
        .get(food_id)
        .ok_or_else(|| invalid(format!("Alimento {food_id} não encontrado.")))?;

    let row = MealRow::insert(db, user_id, meal_type, food_id, quantity_g).await?;
    info!(
        user_id = %user_id,
        meal_id = %row.id,
        meal_type = meal_type.as_str(),
        food = %food.description,
        quantity_g,
        "meal recorded"
    );
    Ok(texts::MEAL_REGISTERED.to_string())
}

/// Upsert one nutrient goal.
pub async fn set_goal(
    db: &PgPool,
    user_id: Uuid,
    nutrient: Nutrient,
    value: f64,
) -> Result<String, ServiceError> {
    if !(value > 0.0) {
        return Err(invalid("A meta deve ser um número positivo."));
    }
    GoalRow::upsert(db, user_id, nutrient, value).await?;
    info!(user_id = %user_id, nutrient = nutrient.as_str(), value, "goal set");
    Ok(texts::goal_set(nutrient, value))
}

/// Append one water entry for today and return (reply, running total).
pub async fn register_water(
    db: &PgPool,
    user_id: Uuid,
    amount_ml: f64,
) -> Result<(String, f64), ServiceError> {
    if !(amount_ml > 0.0) {
        return Err(invalid("A quantidade deve ser um número positivo."));
    }
    let day = OffsetDateTime::now_utc().date();
    WaterRow::insert(db, user_id, amount_ml, day).await?;
    let total = WaterRow::total_for_day(db, user_id, day).await?;
    info!(user_id = %user_id, amount_ml, total, "water registered");
    Ok((texts::water_added(amount_ml, total), total))
}

/// Result of one calculator run, before persistence.
#[derive(Debug)]
pub struct CalcOutcome {
    pub kind: CalcKind,
    pub result: f64,
    pub details: String,
    pub message: String,
}

/// Validate per-kind required fields and run the pure formulas. IMC needs
/// height; TMB/TDEE need height+age+gender; TDEE also needs activity level;
/// Fat needs age+gender (height defaults to 170 cm).
pub fn compute_calculation(req: &CalculationRequest) -> Result<CalcOutcome, ServiceError> {
    match req.calc_type {
        CalcKind::Imc => {
            let height = req
                .height
                .ok_or_else(|| invalid("Altura é obrigatória para IMC"))?;
            let reading = imc(req.weight, height);
            Ok(CalcOutcome {
                kind: CalcKind::Imc,
                result: reading.value,
                details: format!(
                    "Peso: {}kg, Altura: {}cm, Categoria: {}",
                    req.weight,
                    height,
                    reading.category.name_pt()
                ),
                message: texts::imc_result(&reading),
            })
        }
        CalcKind::Tmb | CalcKind::Tdee => {
            let (height, age, gender) = match (req.height, req.age, req.gender) {
                (Some(h), Some(a), Some(g)) => (h, a, g),
                _ => {
                    return Err(invalid(
                        "Altura, idade e sexo são obrigatórios para TMB/TDEE",
                    ))
                }
            };
            let tmb = basal_metabolic_rate(req.weight, height, age, gender);
            if req.calc_type == CalcKind::Tmb {
                Ok(CalcOutcome {
                    kind: CalcKind::Tmb,
                    result: tmb,
                    details: format!(
                        "Peso: {}kg, Altura: {}cm, Idade: {} anos, Sexo: {}",
                        req.weight,
                        height,
                        age,
                        gender.label_pt()
                    ),
                    message: texts::tmb_result(tmb),
                })
            } else {
                let level = req
                    .activity_level
                    .ok_or_else(|| invalid("Nível de atividade é obrigatório para TDEE"))?;
                let tdee = total_energy_expenditure(tmb, level);
                Ok(CalcOutcome {
                    kind: CalcKind::Tdee,
                    result: tdee,
                    details: format!(
                        "Peso: {}kg, Altura: {}cm, Idade: {} anos, Sexo: {}, Nível de Atividade: {}",
                        req.weight,
                        height,
                        age,
                        gender.label_pt(),
                        level.label_pt()
                    ),
                    message: texts::tdee_result(tdee, level),
                })
            }
        }
        CalcKind::Fat => {
            let (age, gender) = match (req.age, req.gender) {
                (Some(a), Some(g)) => (a, g),
                _ => {
                    return Err(invalid(
                        "Idade e sexo são obrigatórios para percentual de gordura",
                    ))
                }
            };
            // Deurenberg works off IMC; fall back to 170 cm when the flow
            // did not collect height.
            let height = req.height.unwrap_or(170.0);
            let reading = imc(req.weight, height);
            let fat = body_fat_percentage(reading.value, age, gender);
            Ok(CalcOutcome {
                kind: CalcKind::Fat,
                result: fat,
                details: format!(
                    "Peso: {}kg, Idade: {} anos, Sexo: {}",
                    req.weight,
                    age,
                    gender.label_pt()
                ),
                message: texts::fat_percentage_result(fat),
            })
        }
    }
}

/// Run one calculator and persist its result.
pub async fn perform_calculation(
    db: &PgPool,
    user_id: Uuid,
    req: &CalculationRequest,
) -> Result<String, ServiceError> {
    let outcome = compute_calculation(req)?;
    CalculationRow::insert(db, user_id, outcome.kind, outcome.result, &outcome.details).await?;
    info!(
        user_id = %user_id,
        calc_type = outcome.kind.as_str(),
        result = outcome.result,
        "calculation stored"
    );
    Ok(outcome.message)
}

/// Validate HH:MM, upsert the reminder row and (re)arm its timer.
pub async fn set_reminder(
    db: &PgPool,
    scheduler: &ReminderScheduler,
    user_id: Uuid,
    kind: ReminderKind,
    time_str: &str,
) -> Result<String, ServiceError> {
    let at = parse_hhmm(time_str).ok_or_else(|| invalid(texts::INVALID_TIME))?;
    let normalized = format!("{:02}:{:02}", at.hour(), at.minute());
    ReminderRow::upsert(db, user_id, kind, &normalized).await?;
    scheduler.schedule(user_id, kind, at);
    info!(user_id = %user_id, kind = kind.as_str(), at = %normalized, "reminder set");
    Ok(texts::reminder_set(kind, &normalized))
}

/// Tip of the day, rotating by day-of-month.
pub fn daily_tip(day_of_month: u8) -> &'static str {
    texts::TIPS[day_of_month as usize % texts::TIPS.len()]
}

/// Assemble the daily summary: meals with scaled nutrients and totals, goal
/// progress, water total, and the last two calculations.
pub async fn build_daily_summary(
    db: &PgPool,
    foods: &FoodTable,
    user_id: Uuid,
    date: Date,
) -> Result<SummaryResponse, ServiceError> {
    let date_fmt = format_description!("[day]/[month]/[year]");
    let hhmm = format_description!("[hour]:[minute]");
    let mut text = texts::daily_summary_header(
        &date.format(&date_fmt).unwrap_or_else(|_| date.to_string()),
    );

    let mut total = nutrition::Nutrients::default();
    let mut meals = Vec::new();
    let rows = MealRow::for_day(db, user_id, date).await?;
    if rows.is_empty() {
        text.push_str(texts::NO_MEALS);
        text.push('\n');
    } else {
        text.push_str(texts::MEALS_SUMMARY);
        for row in rows {
            // Meals whose food vanished from the table are skipped, not fatal.
            let Some(food) = foods.get(row.food_id) else {
                continue;
            };
            let nutrients = scale_nutrients(food, row.quantity_g);
            total += &nutrients;
            let at = row
                .eaten_at
                .format(&hhmm)
                .unwrap_or_else(|_| String::from("--:--"));
            text.push_str(&format!(
                "• *{}* às {}: {} ({}g)\n  Calorias: {:.1} kcal, Proteínas: {:.1}g, Carboidratos: {:.1}g, Lipídios: {:.1}g, Fibras: {:.1}g\n",
                row.meal_type.label_pt(),
                at,
                food.description,
                row.quantity_g,
                nutrients.energy_kcal,
                nutrients.protein_g,
                nutrients.carbohydrate_g,
                nutrients.lipid_g,
                nutrients.fiber_g,
            ));
            meals.push(SummaryMeal {
                meal_type: row.meal_type,
                description: food.description.clone(),
                quantity_g: row.quantity_g,
                eaten_at: row.eaten_at,
                nutrients,
            });
        }
        text.push_str(texts::DAY_TOTALS);
        for nutrient in Nutrient::ALL {
            text.push_str(&format!(
                "• {}: *{:.1}*\n",
                nutrient.label_pt(),
                nutrient.amount_of(&total)
            ));
        }
    }

    let goal_rows = GoalRow::list(db, user_id).await?;
    let mut goals = Vec::new();
    if !goal_rows.is_empty() {
        text.push_str(texts::GOALS_PROGRESS);
        for goal in goal_rows {
            let current = goal.nutrient.amount_of(&total);
            let percentage = if goal.target > 0.0 {
                current / goal.target * 100.0
            } else {
                0.0
            };
            text.push_str(&format!(
                "• {}: *{:.1}/{:.1}* ({:.1}%)\n",
                goal.nutrient.label_pt(),
                current,
                goal.target,
                percentage
            ));
            goals.push(GoalProgress {
                nutrient: goal.nutrient,
                current,
                target: goal.target,
                percentage,
            });
        }
    }

    let water = WaterRow::total_for_day(db, user_id, date).await?;
    text.push_str(texts::WATER_SUMMARY);
    text.push_str(&format!("• Total: *{water:.0}ml*\n"));

    let calc_rows = CalculationRow::last_n(db, user_id, SUMMARY_CALCULATIONS).await?;
    let mut calculations = Vec::new();
    if !calc_rows.is_empty() {
        text.push_str(texts::CALCULATIONS_SUMMARY);
        for calc in calc_rows {
            text.push_str(&format!(
                "• {}: *{:.1}* ({})\n",
                calc.calc_type.label(),
                calc.result,
                calc.details
            ));
            calculations.push(SummaryCalculation {
                calc_type: calc.calc_type,
                result: calc.result,
                details: calc.details,
            });
        }
    }

    Ok(SummaryResponse {
        text,
        meals,
        goals,
        water,
        calculations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::{ActivityLevel, Gender};

    fn req(kind: CalcKind) -> CalculationRequest {
        CalculationRequest {
            calc_type: kind,
            weight: 70.0,
            height: None,
            age: None,
            gender: None,
            activity_level: None,
        }
    }

    #[test]
    fn imc_requires_height() {
        let err = compute_calculation(&req(CalcKind::Imc)).unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));

        let mut r = req(CalcKind::Imc);
        r.height = Some(175.0);
        let outcome = compute_calculation(&r).unwrap();
        assert_eq!(outcome.kind, CalcKind::Imc);
        assert!((outcome.result - 22.857).abs() < 0.01);
        assert!(outcome.details.contains("Peso normal"));
        assert!(outcome.message.contains("Peso normal"));
    }

    #[test]
    fn tmb_requires_height_age_gender() {
        let mut r = req(CalcKind::Tmb);
        r.height = Some(180.0);
        assert!(compute_calculation(&r).is_err());

        r.age = Some(30.0);
        r.gender = Some(Gender::Male);
        let outcome = compute_calculation(&r).unwrap();
        assert!((outcome.result - (700.0 + 1125.0 - 150.0 + 5.0)).abs() < 1e-9);
    }

    #[test]
    fn tdee_additionally_requires_activity_level() {
        let mut r = req(CalcKind::Tdee);
        r.weight = 60.0;
        r.height = Some(165.0);
        r.age = Some(30.0);
        r.gender = Some(Gender::Female);
        assert!(compute_calculation(&r).is_err());

        r.activity_level = Some(ActivityLevel::Moderate);
        let outcome = compute_calculation(&r).unwrap();
        assert!((outcome.result - 1320.25 * 1.55).abs() < 1e-9);
        assert_eq!(outcome.kind, CalcKind::Tdee);
    }

    #[test]
    fn fat_defaults_height_and_clamps() {
        let mut r = req(CalcKind::Fat);
        assert!(compute_calculation(&r).is_err());

        r.age = Some(30.0);
        r.gender = Some(Gender::Male);
        let outcome = compute_calculation(&r).unwrap();
        let expected_imc = 70.0 / (1.70 * 1.70);
        let expected = 1.2 * expected_imc + 0.23 * 30.0 - 16.2;
        assert!((outcome.result - expected).abs() < 1e-9);
        assert!(outcome.result >= 0.0);
    }

    #[test]
    fn tip_rotates_by_day_of_month() {
        assert_eq!(daily_tip(1), daily_tip(5));
        assert_ne!(daily_tip(1), daily_tip(2));
        assert_eq!(daily_tip(4), texts::TIPS[0]);
    }
}
