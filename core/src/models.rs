use std::fmt;

use anyhow::{Result, bail};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Longest dish name the storage layer accepts.
pub const MAX_NAME_LEN: usize = 255;

/// Dish category as stored in the `category` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Breakfast,
    Lunch,
    Dinner,
    Soups,
    Salads,
    Sandwiches,
    Seafood,
    PorkDishes,
    BeefDishes,
    ChickenDishes,
    Vegetables,
    RiceAndNoodles,
    MainCourse,
}

impl Category {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Category::Breakfast => "breakfast",
            Category::Lunch => "lunch",
            Category::Dinner => "dinner",
            Category::Soups => "Soups",
            Category::Salads => "Salads",
            Category::Sandwiches => "Sandwiches",
            Category::Seafood => "Seafood",
            Category::PorkDishes => "Pork Dishes",
            Category::BeefDishes => "Beef Dishes",
            Category::ChickenDishes => "Chicken Dishes",
            Category::Vegetables => "Vegetables",
            Category::RiceAndNoodles => "Rice & Noodles",
            Category::MainCourse => "Main Course",
        }
    }

    /// True for the breakfast/lunch/dinner slots used by meal plans.
    #[must_use]
    pub fn is_meal_slot(self) -> bool {
        matches!(self, Category::Breakfast | Category::Lunch | Category::Dinner)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Per-serving macros. Estimated values are a heuristic, not a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl Nutrition {
    #[must_use]
    pub const fn new(calories: f64, protein: f64, carbs: f64, fats: f64) -> Self {
        Self {
            calories,
            protein,
            carbs,
            fats,
        }
    }
}

/// A normalized dish, ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DishRecord {
    pub name: String,
    pub category: Category,
    pub ingredients: Vec<String>,
    /// Numbered step text.
    pub recipe: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    pub fiber: f64,
}

impl DishRecord {
    #[must_use]
    pub fn nutrition(&self) -> Nutrition {
        Nutrition::new(self.calories, self.protein, self.carbs, self.fats)
    }

    /// Ingredients as the JSON array text stored in the `ingredients` column.
    #[must_use]
    pub fn ingredients_json(&self) -> String {
        serde_json::to_string(&self.ingredients).unwrap_or_else(|_| "[]".to_string())
    }
}

pub fn validate_dish_record(dish: &DishRecord) -> Result<()> {
    if dish.name.trim().is_empty() {
        bail!("Dish name must not be empty");
    }
    if dish.name.chars().count() > MAX_NAME_LEN {
        bail!("Dish name must be at most {MAX_NAME_LEN} characters");
    }
    for (field, value) in [
        ("calories", dish.calories),
        ("protein", dish.protein),
        ("carbs", dish.carbs),
        ("fats", dish.fats),
        ("fiber", dish.fiber),
    ] {
        if !value.is_finite() || value < 0.0 {
            bail!("{field} must be a non-negative number (got {value})");
        }
    }
    Ok(())
}

/// One record as extracted from a source file, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    /// 1-based line (TSV) or element index (JSON) in the source.
    pub line: usize,
    pub category: Option<String>,
    pub name: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub calories: Option<String>,
    pub protein: Option<String>,
    pub carbs: Option<String>,
    pub fats: Option<String>,
    pub fiber: Option<String>,
}

/// Why a source record was left out of the import.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("fewer than 6 tab-separated fields")]
    TooFewFields,
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("missing name")]
    MissingName,
    #[error("missing category")]
    MissingCategory,
    #[error("unknown category '{0}' (expected breakfast, lunch or dinner)")]
    UnknownCategory(String),
    #[error("invalid {field} value '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("no usable ingredients")]
    NoIngredients,
    #[error("no usable instructions")]
    NoInstructions,
}

impl Serialize for SkipReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub reason: SkipReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dish() -> DishRecord {
        DishRecord {
            name: "Chicken Adobo".to_string(),
            category: Category::ChickenDishes,
            ingredients: vec!["chicken".to_string(), "soy sauce".to_string()],
            recipe: "1. Prepare ingredients (wash/chop as needed).".to_string(),
            calories: 380.0,
            protein: 35.0,
            carbs: 8.0,
            fats: 22.0,
            fiber: 2.0,
        }
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(Category::RiceAndNoodles.to_string(), "Rice & Noodles");
        assert_eq!(Category::Lunch.label(), "lunch");
        assert!(Category::Dinner.is_meal_slot());
        assert!(!Category::MainCourse.is_meal_slot());
        assert_eq!(
            serde_json::to_string(&Category::PorkDishes).unwrap(),
            r#""Pork Dishes""#
        );
    }

    #[test]
    fn test_validate_dish_record() {
        assert!(validate_dish_record(&dish()).is_ok());

        let mut bad = dish();
        bad.name = "   ".to_string();
        assert!(validate_dish_record(&bad).is_err());

        let mut bad = dish();
        bad.fats = -1.0;
        assert!(validate_dish_record(&bad).is_err());

        let mut bad = dish();
        bad.name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(validate_dish_record(&bad).is_err());
    }

    #[test]
    fn test_ingredients_json() {
        assert_eq!(dish().ingredients_json(), r#"["chicken","soy sauce"]"#);
    }

    #[test]
    fn test_skip_reason_serializes_as_message() {
        let skipped = SkippedRow {
            line: 4,
            name: None,
            reason: SkipReason::InvalidNumber {
                field: "calories",
                value: "lots".to_string(),
            },
        };
        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["reason"], "invalid calories value 'lots'");
        assert!(json.get("name").is_none());
    }
}
