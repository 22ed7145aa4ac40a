use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Deserializer};
use tracing::info;

/// Most matches a food search will return in one reply.
pub const MAX_SEARCH_RESULTS: usize = 10;

/// One row of the static food composition table. Nutrient amounts are
/// per 100 g; `None` means the source marked the value "NA".
#[derive(Debug, Clone, Deserialize)]
pub struct FoodRecord {
    pub id: i64,
    pub description: String,
    #[serde(deserialize_with = "na_as_none")]
    pub energy_kcal: Option<f64>,
    #[serde(deserialize_with = "na_as_none")]
    pub protein_g: Option<f64>,
    #[serde(deserialize_with = "na_as_none")]
    pub lipid_g: Option<f64>,
    #[serde(deserialize_with = "na_as_none")]
    pub carbohydrate_g: Option<f64>,
    #[serde(deserialize_with = "na_as_none")]
    pub fiber_g: Option<f64>,
}

/// Accepts a number, a numeric string, or the "NA" marker.
fn na_as_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => Ok(n.as_f64()),
        serde_json::Value::String(s) => {
            if s.trim().eq_ignore_ascii_case("na") {
                Ok(None)
            } else {
                s.trim()
                    .parse::<f64>()
                    .map(Some)
                    .map_err(serde::de::Error::custom)
            }
        }
        other => Err(serde::de::Error::custom(format!(
            "unexpected nutrient value: {other}"
        ))),
    }
}

/// Static reference table, loaded once at startup and shared read-only.
pub struct FoodTable {
    foods: Vec<FoodRecord>,
    by_id: HashMap<i64, usize>,
}

impl FoodTable {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read food table {}", path.display()))?;
        let foods: Vec<FoodRecord> =
            serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
        info!(count = foods.len(), path = %path.display(), "food table loaded");
        Ok(Self::from_records(foods))
    }

    pub fn from_records(foods: Vec<FoodRecord>) -> Self {
        let by_id = foods.iter().enumerate().map(|(i, f)| (f.id, i)).collect();
        Self { foods, by_id }
    }

    pub fn get(&self, id: i64) -> Option<&FoodRecord> {
        self.by_id.get(&id).map(|&i| &self.foods[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FoodRecord> {
        self.foods.iter()
    }

    /// Case-insensitive substring match on the description, capped at
    /// [`MAX_SEARCH_RESULTS`] hits.
    pub fn search(&self, query: &str) -> Vec<&FoodRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.foods
            .iter()
            .filter(|f| f.description.to_lowercase().contains(&needle))
            .take(MAX_SEARCH_RESULTS)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }

    /// Small fixture table, enough for tests and `AppState::fake`.
    pub fn sample() -> Self {
        let raw = r#"[
            { "id": 2, "description": "Arroz, tipo 1, cozido",
              "energy_kcal": 128, "protein_g": 2.5, "lipid_g": 0.2,
              "carbohydrate_g": 28.1, "fiber_g": 1.6 },
            { "id": 7, "description": "Feijão, carioca, cozido",
              "energy_kcal": 76, "protein_g": 4.8, "lipid_g": 0.5,
              "carbohydrate_g": 13.6, "fiber_g": 8.5 },
            { "id": 9, "description": "Leite, de vaca, integral",
              "energy_kcal": 61, "protein_g": 3.2, "lipid_g": 3.3,
              "carbohydrate_g": 4.6, "fiber_g": "NA" },
            { "id": 12, "description": "Arroz, branco, cozido",
              "energy_kcal": 130, "protein_g": 2.7, "lipid_g": 0.3,
              "carbohydrate_g": 28.2, "fiber_g": 0.4 }
        ]"#;
        let foods: Vec<FoodRecord> = serde_json::from_str(raw).expect("fixture parses");
        Self::from_records(foods)
    }
}
