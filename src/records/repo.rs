use sqlx::PgPool;
use time::{Date, Duration};
use uuid::Uuid;

use crate::records::repo_types::{
    CalcKind, CalculationRow, GoalRow, MealRow, MealType, Nutrient, ReminderKind, ReminderRow,
    WaterRow,
};

impl MealRow {
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        meal_type: MealType,
        food_id: i64,
        quantity_g: f64,
    ) -> anyhow::Result<MealRow> {
        let row = sqlx::query_as::<_, MealRow>(
            r#"
            INSERT INTO meals (user_id, meal_type, food_id, quantity_g)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, meal_type, food_id, quantity_g, eaten_at
            "#,
        )
        .bind(user_id)
        .bind(meal_type)
        .bind(food_id)
        .bind(quantity_g)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// Meals eaten on the given UTC day, oldest first.
    pub async fn for_day(db: &PgPool, user_id: Uuid, day: Date) -> anyhow::Result<Vec<MealRow>> {
        let start = day.midnight().assume_utc();
        let end = start + Duration::days(1);
        let rows = sqlx::query_as::<_, MealRow>(
            r#"
            SELECT id, user_id, meal_type, food_id, quantity_g, eaten_at
            FROM meals
            WHERE user_id = $1 AND eaten_at >= $2 AND eaten_at < $3
            ORDER BY eaten_at ASC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

impl GoalRow {
    /// Insert-or-replace keyed by (user, nutrient).
    pub async fn upsert(
        db: &PgPool,
        user_id: Uuid,
        nutrient: Nutrient,
        target: f64,
    ) -> anyhow::Result<GoalRow> {
        let row = sqlx::query_as::<_, GoalRow>(
            r#"
            INSERT INTO goals (user_id, nutrient, target)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, nutrient) DO UPDATE SET target = $3
            RETURNING user_id, nutrient, target
            "#,
        )
        .bind(user_id)
        .bind(nutrient)
        .bind(target)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn list(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<GoalRow>> {
        let rows = sqlx::query_as::<_, GoalRow>(
            r#"
            SELECT user_id, nutrient, target
            FROM goals
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

impl WaterRow {
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        amount_ml: f64,
        day: Date,
    ) -> anyhow::Result<WaterRow> {
        let row = sqlx::query_as::<_, WaterRow>(
            r#"
            INSERT INTO water (user_id, amount_ml, day)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, amount_ml, day
            "#,
        )
        .bind(user_id)
        .bind(amount_ml)
        .bind(day)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn total_for_day(db: &PgPool, user_id: Uuid, day: Date) -> anyhow::Result<f64> {
        let total = sqlx::query_scalar::<_, Option<f64>>(
            r#"
            SELECT SUM(amount_ml)
            FROM water
            WHERE user_id = $1 AND day = $2
            "#,
        )
        .bind(user_id)
        .bind(day)
        .fetch_one(db)
        .await?;
        Ok(total.unwrap_or(0.0))
    }
}

impl CalculationRow {
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        calc_type: CalcKind,
        result: f64,
        details: &str,
    ) -> anyhow::Result<CalculationRow> {
        let row = sqlx::query_as::<_, CalculationRow>(
            r#"
            INSERT INTO calculations (user_id, calc_type, result, details)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, calc_type, result, details, created_at
            "#,
        )
        .bind(user_id)
        .bind(calc_type)
        .bind(result)
        .bind(details)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// Most recent calculations, newest first.
    pub async fn last_n(db: &PgPool, user_id: Uuid, n: i64) -> anyhow::Result<Vec<CalculationRow>> {
        let rows = sqlx::query_as::<_, CalculationRow>(
            r#"
            SELECT id, user_id, calc_type, result, details, created_at
            FROM calculations
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(n)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

impl ReminderRow {
    /// Insert-or-replace keyed by (user, kind).
    pub async fn upsert(
        db: &PgPool,
        user_id: Uuid,
        kind: ReminderKind,
        at_time: &str,
    ) -> anyhow::Result<ReminderRow> {
        let row = sqlx::query_as::<_, ReminderRow>(
            r#"
            INSERT INTO reminders (user_id, kind, at_time)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, kind) DO UPDATE SET at_time = $3
            RETURNING user_id, kind, at_time
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(at_time)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// Every persisted reminder; used to re-arm the notifier at boot.
    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<ReminderRow>> {
        let rows = sqlx::query_as::<_, ReminderRow>(
            r#"
            SELECT user_id, kind, at_time
            FROM reminders
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
