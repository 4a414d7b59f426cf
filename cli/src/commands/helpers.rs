use anyhow::Result;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use activecore_core::import::{FailedRow, ImportSummary};
use activecore_core::models::SkippedRow;
use activecore_core::schema::ColumnSet;

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn print_summary(summary: &ImportSummary) {
    if summary.dry_run {
        println!("Dry run - no changes made.\n");
    } else {
        println!("Import complete.\n");
    }
    let verb = if summary.dry_run { "To import:" } else { "Imported:" };
    println!("  Source format: {}", summary.format);
    println!("  Table:         {}", summary.table);
    println!("  Columns:       {}", summary.columns.join(", "));
    println!("  Considered:    {}", summary.considered);
    println!("  {verb:<15}{}", summary.imported);
    println!("  Failed:        {}", summary.failed);
    println!("  Skipped:       {}", summary.skipped);
    match summary.total_rows {
        Some(total) => println!("  Total rows:    {total}"),
        None => println!("  Total rows:    -"),
    }

    if !summary.skipped_rows.is_empty() {
        println!("\nSkipped rows:");
        print_skipped_table(&summary.skipped_rows);
    }
    if !summary.failures.is_empty() {
        println!("\nFailed rows:");
        print_failure_table(&summary.failures);
    }
}

fn print_skipped_table(rows: &[SkippedRow]) {
    #[derive(Tabled)]
    struct SkipRow {
        #[tabled(rename = "Line")]
        line: usize,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Reason")]
        reason: String,
    }

    let rows: Vec<SkipRow> = rows
        .iter()
        .map(|r| SkipRow {
            line: r.line,
            name: r.name.as_deref().map(|n| truncate(n, 35)).unwrap_or_default(),
            reason: r.reason.to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(0)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

fn print_failure_table(rows: &[FailedRow]) {
    #[derive(Tabled)]
    struct FailRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Error")]
        error: String,
    }

    let rows: Vec<FailRow> = rows
        .iter()
        .map(|r| FailRow {
            name: truncate(&r.name, 35),
            category: r.category.clone(),
            error: truncate(&r.error, 60),
        })
        .collect();

    println!("{}", Table::new(&rows).with(Style::rounded()));
}

pub(crate) fn print_columns(table: &str, columns: &ColumnSet) {
    #[derive(Tabled)]
    struct ColumnRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Column")]
        name: String,
    }

    if columns.is_empty() {
        println!("Table {table} has no columns (does it exist?)");
        return;
    }

    let rows: Vec<ColumnRow> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| ColumnRow {
            idx: i + 1,
            name: name.to_string(),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
}

/// Cap a table cell at `max` characters, marking the cut with `...`.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_none() {
        return head;
    }
    let kept: String = head.chars().take(max.saturating_sub(3)).collect();
    kept + "..."
}
