//! One import run: normalize, discover, plan, upsert, count.

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;

use crate::db::Pool;
use crate::models::{
    Category, DishRecord, SkipReason, SkippedRow, SourceRow, validate_dish_record,
};
use crate::normalize::{
    DEFAULT_FIBER, categorize, clean_ingredient_list, clean_instruction_text,
    ensure_common_basics, estimate_nutrition, expand_instructions, extract_dish_name,
    normalize_meal_slot, normalize_name, parse_amount,
};
use crate::schema::{self, ColumnSet};
use crate::source::{ParsedSource, SourceFormat};
use crate::statement::WriteSet;
use crate::value::Row;

pub const DEFAULT_TABLE: &str = "filipino_dishes";

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub schema: String,
    pub table: String,
    /// Create the canonical table when it is missing.
    pub create_table: bool,
    /// Add the `recipe` and `fiber` columns when they are missing.
    pub provision_columns: bool,
    /// Plan everything, write nothing.
    pub dry_run: bool,
}

impl ImportOptions {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: DEFAULT_TABLE.to_string(),
            create_table: false,
            provision_columns: true,
            dry_run: false,
        }
    }
}

/// Normalized records ready to write, plus everything left out.
#[derive(Debug, Clone)]
pub struct PreparedImport {
    pub format: SourceFormat,
    pub considered: usize,
    pub records: Vec<DishRecord>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedRow {
    pub name: String,
    pub category: String,
    pub error: String,
}

/// Outcome of a run. `imported + failed + skipped == considered` always holds.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub started_at: String,
    pub table: String,
    pub format: SourceFormat,
    pub considered: usize,
    pub imported: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Rows in the table after the run; `None` when the count could not be read.
    pub total_rows: Option<i64>,
    pub columns: Vec<String>,
    pub dry_run: bool,
    pub skipped_rows: Vec<SkippedRow>,
    pub failures: Vec<FailedRow>,
}

fn numbers(row: &SourceRow) -> Result<[Option<f64>; 5], SkipReason> {
    Ok([
        parse_amount("calories", row.calories.as_deref())?,
        parse_amount("protein", row.protein.as_deref())?,
        parse_amount("carbs", row.carbs.as_deref())?,
        parse_amount("fats", row.fats.as_deref())?,
        parse_amount("fiber", row.fiber.as_deref())?,
    ])
}

fn build_record(
    name: String,
    category: Category,
    ingredients: Vec<String>,
    recipe: String,
    amounts: [Option<f64>; 5],
) -> DishRecord {
    let estimate = estimate_nutrition(&name, &ingredients.join(", "));
    let [calories, protein, carbs, fats, fiber] = amounts;
    DishRecord {
        name,
        category,
        ingredients,
        recipe,
        calories: calories.unwrap_or(estimate.calories),
        protein: protein.unwrap_or(estimate.protein),
        carbs: carbs.unwrap_or(estimate.carbs),
        fats: fats.unwrap_or(estimate.fats),
        fiber: fiber.unwrap_or(DEFAULT_FIBER),
    }
}

/// Meal-sheet row: the category must be a meal slot, numbers are optional.
fn normalize_tsv_row(row: &SourceRow) -> Result<DishRecord, SkipReason> {
    let category = match row.category.as_deref().map(str::trim) {
        None | Some("") => return Err(SkipReason::MissingCategory),
        Some(raw) => {
            normalize_meal_slot(raw).ok_or_else(|| SkipReason::UnknownCategory(raw.to_string()))?
        }
    };
    let name = normalize_name(&row.name);
    if name.is_empty() {
        return Err(SkipReason::MissingName);
    }

    let amounts = numbers(row)?;
    let instructions = row.instructions.join(" ");
    let ingredients = ensure_common_basics(row.ingredients.clone(), &instructions);
    let recipe = expand_instructions(&instructions, &ingredients);
    Ok(build_record(name, category, ingredients, recipe, amounts))
}

/// Scraped recipe: needs real ingredients and steps after cleaning.
fn normalize_json_row(row: &SourceRow) -> Result<DishRecord, SkipReason> {
    let name = normalize_name(&extract_dish_name(&row.name));
    if name.is_empty() {
        return Err(SkipReason::MissingName);
    }

    let ingredients = clean_ingredient_list(&row.ingredients);
    if ingredients.is_empty() {
        return Err(SkipReason::NoIngredients);
    }
    let instructions = clean_instruction_text(&row.instructions);
    if instructions.is_empty() {
        return Err(SkipReason::NoInstructions);
    }

    let amounts = numbers(row)?;
    let category = categorize(&name, &ingredients.join(", "));
    let recipe = expand_instructions(&instructions, &ingredients);
    Ok(build_record(name, category, ingredients, recipe, amounts))
}

/// Normalize every parsed row. Pure; touches no database.
#[must_use]
pub fn prepare(source: ParsedSource) -> PreparedImport {
    let considered = source.considered();
    let mut skipped = source.rejected;
    let mut records = Vec::with_capacity(source.rows.len());

    for row in &source.rows {
        let normalized = match source.format {
            SourceFormat::Tsv => normalize_tsv_row(row),
            SourceFormat::Json => normalize_json_row(row),
        }
        .and_then(|dish| {
            validate_dish_record(&dish)
                .map(|()| dish)
                .map_err(|e| SkipReason::Malformed(e.to_string()))
        });

        match normalized {
            Ok(dish) => records.push(dish),
            Err(reason) => {
                tracing::debug!(line = row.line, name = %row.name, %reason, "skipping row");
                skipped.push(SkippedRow {
                    line: row.line,
                    name: Some(row.name.trim().to_string()).filter(|n| !n.is_empty()),
                    reason,
                });
            }
        }
    }
    skipped.sort_by_key(|s| s.line);

    PreparedImport {
        format: source.format,
        considered,
        records,
        skipped,
    }
}

/// Discover columns, falling back to `{name}` when the catalog query itself
/// fails for a reason other than connectivity.
async fn discover_or_minimal(pool: &Pool, opts: &ImportOptions) -> Result<ColumnSet> {
    match schema::discover_columns(pool, &opts.schema, &opts.table).await {
        Ok(columns) => Ok(columns),
        Err(e) if e.is_connectivity() => {
            Err(e).with_context(|| format!("Cannot reach database at {}", pool.target()))
        }
        Err(e) => {
            tracing::warn!(error = %e, table = %opts.table, "column discovery failed, using minimal column set");
            Ok(["name"].into_iter().collect())
        }
    }
}

async fn provision(pool: &Pool, opts: &ImportOptions, mut columns: ColumnSet) -> Result<ColumnSet> {
    schema::ensure_unique_index(pool, &opts.schema, &opts.table, "name").await?;

    if opts.provision_columns {
        let wanted = [("recipe", "TEXT"), ("fiber", pool.flavor().decimal_type())];
        for (column, sql_type) in wanted {
            if columns.contains(column) {
                continue;
            }
            if schema::ensure_column(pool, &opts.schema, &opts.table, column, sql_type).await? {
                columns.insert(column);
            }
        }
    }
    Ok(columns)
}

async fn count_rows(pool: &Pool, opts: &ImportOptions) -> Option<i64> {
    let target = pool.flavor().qualify(&opts.schema, &opts.table).ok()?;
    match pool
        .query_one::<Row>(&format!("SELECT COUNT(*) AS total FROM {target}"), &[])
        .await
    {
        Ok(row) => row.and_then(|r| r.get("total").and_then(|v| v.as_i64())),
        Err(e) => {
            tracing::warn!(error = %e, "could not read back row count");
            None
        }
    }
}

/// Write prepared records, one upsert per record, in source order.
///
/// Only connectivity failures abort the run. Any other write error marks
/// that record as failed and the run continues.
pub async fn run_import(
    pool: &Pool,
    prepared: &PreparedImport,
    opts: &ImportOptions,
) -> Result<ImportSummary> {
    let started_at = Local::now().to_rfc3339();

    let mut columns = discover_or_minimal(pool, opts).await?;
    if opts.create_table && !columns.contains("name") {
        if opts.dry_run {
            // plan against the table that would be created
            columns = schema::canonical_columns();
        } else {
            schema::ensure_table(pool, &opts.schema, &opts.table)
                .await
                .with_context(|| format!("Failed to create table {}", opts.table))?;
            columns = discover_or_minimal(pool, opts).await?;
        }
    }
    if !opts.dry_run {
        columns = provision(pool, opts, columns).await?;
    }

    let write_set = WriteSet::plan(&columns)
        .with_context(|| format!("Cannot import into {}.{}", opts.schema, opts.table))?;
    let sql = write_set.upsert_sql(pool.flavor(), &opts.schema, &opts.table)?;
    tracing::info!(
        table = %opts.table,
        columns = write_set.len(),
        records = prepared.records.len(),
        dry_run = opts.dry_run,
        "starting import"
    );

    let mut imported = 0;
    let mut failures = Vec::new();

    if opts.dry_run {
        imported = prepared.records.len();
    } else {
        for dish in &prepared.records {
            match pool.execute(&sql, &write_set.values(dish)).await {
                Ok(_) => imported += 1,
                Err(e) if e.is_connectivity() => {
                    return Err(e).with_context(|| {
                        format!(
                            "Lost connection to database at {} while importing '{}'",
                            pool.target(),
                            dish.name
                        )
                    });
                }
                Err(e) => {
                    tracing::error!(name = %dish.name, category = %dish.category, error = %e, "failed to upsert dish");
                    failures.push(FailedRow {
                        name: dish.name.clone(),
                        category: dish.category.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    let total_rows = count_rows(pool, opts).await;
    let summary = ImportSummary {
        started_at,
        table: opts.table.clone(),
        format: prepared.format,
        considered: prepared.considered,
        imported,
        failed: failures.len(),
        skipped: prepared.skipped.len(),
        total_rows,
        columns: write_set.columns().map(str::to_string).collect(),
        dry_run: opts.dry_run,
        skipped_rows: prepared.skipped.clone(),
        failures,
    };
    tracing::info!(
        imported = summary.imported,
        failed = summary.failed,
        skipped = summary.skipped,
        "import finished"
    );
    Ok(summary)
}
