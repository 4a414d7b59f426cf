//! Column planning and upsert statement construction.
//!
//! The write set is the intersection of what a dish record can fill and
//! what the live table has; nothing outside it is ever named in SQL.

use anyhow::{Result, bail};
use serde::Serialize;

use crate::db::{Flavor, validate_identifier};
use crate::models::DishRecord;
use crate::schema::ColumnSet;
use crate::value::Value;

/// The dish field a column is filled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DishField {
    Name,
    Category,
    Calories,
    Protein,
    Carbs,
    Fats,
    Fiber,
    Ingredients,
    Recipe,
}

impl DishField {
    fn value(self, dish: &DishRecord) -> Value {
        match self {
            DishField::Name => Value::from(dish.name.as_str()),
            DishField::Category => Value::from(dish.category.label()),
            DishField::Calories => Value::Float(dish.calories),
            DishField::Protein => Value::Float(dish.protein),
            DishField::Carbs => Value::Float(dish.carbs),
            DishField::Fats => Value::Float(dish.fats),
            DishField::Fiber => Value::Float(dish.fiber),
            DishField::Ingredients => Value::Text(dish.ingredients_json()),
            DishField::Recipe => Value::from(dish.recipe.as_str()),
        }
    }
}

/// Candidate columns per field, in write order. Every present alias of a
/// numeric field is written; text fields take the first alias present.
const NUMERIC_COLUMNS: &[(DishField, &[&str])] = &[
    (DishField::Calories, &["calories", "cal"]),
    (DishField::Protein, &["protein", "pro"]),
    (DishField::Carbs, &["carbs", "carb"]),
    (DishField::Fats, &["fats", "fat"]),
    (DishField::Fiber, &["fiber"]),
];

/// Columns one import run writes, with the field each one takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteSet {
    columns: Vec<(String, DishField)>,
}

impl WriteSet {
    /// Plan the write set against the discovered columns.
    ///
    /// Fails when the table has no `name` column, since the upsert key
    /// would be missing.
    pub fn plan(available: &ColumnSet) -> Result<Self> {
        if !available.contains("name") {
            bail!("Target table has no 'name' column; cannot import");
        }

        let mut columns = vec![("name".to_string(), DishField::Name)];
        if available.contains("category") {
            columns.push(("category".to_string(), DishField::Category));
        }
        for (field, aliases) in NUMERIC_COLUMNS {
            for alias in aliases.iter().filter(|a| available.contains(a)) {
                columns.push(((*alias).to_string(), *field));
            }
        }
        if available.contains("ingredients") {
            columns.push(("ingredients".to_string(), DishField::Ingredients));
        }
        if let Some(recipe) = ["recipe", "instructions"]
            .into_iter()
            .find(|c| available.contains(c))
        {
            columns.push((recipe.to_string(), DishField::Recipe));
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(c, _)| c.as_str())
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.columns().any(|c| c == column)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Bind values for `dish`, in column order.
    #[must_use]
    pub fn values(&self, dish: &DishRecord) -> Vec<Value> {
        self.columns.iter().map(|(_, f)| f.value(dish)).collect()
    }

    /// `INSERT ... ON CONFLICT (name) DO UPDATE` for the planned columns.
    ///
    /// The statement uses `?` placeholders; both supported engines accept
    /// the `ON CONFLICT ... EXCLUDED` form.
    pub fn upsert_sql(&self, flavor: Flavor, schema: &str, table: &str) -> Result<String> {
        let target = flavor.qualify(schema, table)?;
        for column in self.columns() {
            validate_identifier(column)?;
        }

        let columns: Vec<&str> = self.columns().collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| **c != "name")
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect();

        let action = if updates.is_empty() {
            "DO NOTHING".to_string()
        } else {
            format!("DO UPDATE SET {}", updates.join(", "))
        };

        Ok(format!(
            "INSERT INTO {target} ({}) VALUES ({placeholders}) ON CONFLICT (name) {action}",
            columns.join(", ")
        ))
    }
}
