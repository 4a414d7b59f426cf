use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::models::{SkipReason, SkippedRow, SourceRow};
use crate::normalize::split_ingredients;

/// Layout of an import file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Tab-delimited meal sheet: category, name, ingredients, instructions,
    /// then calories/protein/carbs/fats/fiber.
    Tsv,
    /// JSON array of scraped recipes with `title`, `ingredients`, `instructions`.
    Json,
}

impl SourceFormat {
    /// `.json` files are JSON, everything else is tab-delimited.
    #[must_use]
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SourceFormat::Json,
            _ => SourceFormat::Tsv,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceFormat::Tsv => "tsv",
            SourceFormat::Json => "json",
        })
    }
}

impl FromStr for SourceFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tsv" | "tab" => Ok(SourceFormat::Tsv),
            "json" => Ok(SourceFormat::Json),
            other => bail!("Unknown source format '{other}'. Must be one of: tsv, json"),
        }
    }
}

/// Records read from one file, plus the ones rejected while reading.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub format: SourceFormat,
    pub rows: Vec<SourceRow>,
    pub rejected: Vec<SkippedRow>,
}

impl ParsedSource {
    /// Every record that counts towards the import totals.
    #[must_use]
    pub fn considered(&self) -> usize {
        self.rows.len() + self.rejected.len()
    }
}

/// Read `path`, using `format` or detecting it from the extension.
pub fn read_source(path: &Path, format: Option<SourceFormat>) -> Result<ParsedSource> {
    let format = format.unwrap_or_else(|| SourceFormat::detect(path));
    let file = File::open(path)
        .with_context(|| format!("Failed to open source file: {}", path.display()))?;
    let reader = BufReader::new(file);
    let parsed = match format {
        SourceFormat::Tsv => parse_tsv(reader),
        SourceFormat::Json => parse_json(reader),
    }
    .with_context(|| format!("Failed to read {format} source: {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        %format,
        rows = parsed.rows.len(),
        rejected = parsed.rejected.len(),
        "source parsed"
    );
    Ok(parsed)
}

fn is_header(first_field: &str) -> bool {
    let lower = first_field.trim().to_lowercase();
    lower.starts_with("meal type") || lower == "category"
}

/// Physical 1-based line numbers for byte offsets, scanned forward once.
struct LineIndex<'a> {
    input: &'a [u8],
    offset: usize,
    line: usize,
}

impl<'a> LineIndex<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            offset: 0,
            line: 1,
        }
    }

    /// Line of the first content byte at or after `offset`. The reader
    /// reports a record as starting where the previous one ended, so blank
    /// lines in between are stepped over here.
    fn line_at(&mut self, offset: usize) -> usize {
        let rest = self.input.get(offset..).unwrap_or_default();
        let start = offset + rest.iter().take_while(|&&b| b == b'\r' || b == b'\n').count();
        let start = start.min(self.input.len()).max(self.offset);
        self.line += self.input[self.offset..start]
            .iter()
            .filter(|&&b| b == b'\n')
            .count();
        self.offset = start;
        self.line
    }
}

/// Parse a tab-delimited meal sheet.
///
/// Blank lines and a `Meal Type ...` / `Category ...` header are ignored.
/// Lines with fewer than six fields are rejected rather than dropped, so
/// they show up in the totals. Bytes that are not UTF-8 are replaced, not
/// fatal.
pub fn parse_tsv<R: Read>(mut reader: R) -> Result<ParsedSource> {
    let mut input = Vec::new();
    reader
        .read_to_end(&mut input)
        .context("Failed to read tab-delimited source")?;

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(input.as_slice());

    let mut lines = LineIndex::new(&input);
    let mut rows = Vec::new();
    let mut rejected = Vec::new();

    for (idx, result) in rdr.byte_records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse record {}", idx + 1))?;
        let offset = record
            .position()
            .and_then(|p| usize::try_from(p.byte()).ok())
            .unwrap_or(0);
        let line = lines.line_at(offset);

        let fields: Vec<String> = record
            .iter()
            .map(|f| String::from_utf8_lossy(f).trim().to_string())
            .collect();

        if fields.iter().all(String::is_empty) {
            continue;
        }
        if is_header(&fields[0]) {
            continue;
        }

        let field = |i: usize| fields.get(i).map_or("", String::as_str);
        let optional = |i: usize| fields.get(i).filter(|v| !v.is_empty()).cloned();

        if fields.len() < 6 {
            rejected.push(SkippedRow {
                line,
                name: optional(1),
                reason: SkipReason::TooFewFields,
            });
            continue;
        }

        rows.push(SourceRow {
            line,
            category: optional(0),
            name: field(1).to_string(),
            ingredients: split_ingredients(field(2)),
            instructions: vec![field(3).to_string()],
            calories: optional(4),
            protein: optional(5),
            carbs: optional(6),
            fats: optional(7),
            fiber: optional(8),
        });
    }

    Ok(ParsedSource {
        format: SourceFormat::Tsv,
        rows,
        rejected,
    })
}

#[derive(Debug, Deserialize)]
struct RawRecipe {
    title: String,
    #[serde(default)]
    ingredients: Vec<serde_json::Value>,
    #[serde(default)]
    instructions: Vec<serde_json::Value>,
    #[serde(default)]
    nutrition: Option<RawNutrition>,
}

#[derive(Debug, Default, Deserialize)]
struct RawNutrition {
    calories: Option<serde_json::Value>,
    protein: Option<serde_json::Value>,
    carbs: Option<serde_json::Value>,
    #[serde(alias = "fat")]
    fats: Option<serde_json::Value>,
    fiber: Option<serde_json::Value>,
}

fn strings(values: Vec<serde_json::Value>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

fn number_text(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Parse a JSON array of scraped recipes.
///
/// A top-level value that is not an array is an error. Individual elements
/// that do not look like a recipe are rejected and counted.
pub fn parse_json<R: Read>(reader: R) -> Result<ParsedSource> {
    let items: Vec<serde_json::Value> =
        serde_json::from_reader(reader).context("Expected a JSON array of recipes")?;

    let mut rows = Vec::new();
    let mut rejected = Vec::new();

    for (idx, item) in items.into_iter().enumerate() {
        let line = idx + 1;
        let title_hint = item
            .get("title")
            .and_then(|t| t.as_str())
            .map(str::to_string);

        let recipe: RawRecipe = match serde_json::from_value(item) {
            Ok(recipe) => recipe,
            Err(e) => {
                rejected.push(SkippedRow {
                    line,
                    name: title_hint,
                    reason: SkipReason::Malformed(e.to_string()),
                });
                continue;
            }
        };

        let nutrition = recipe.nutrition.unwrap_or_default();
        rows.push(SourceRow {
            line,
            category: None,
            name: recipe.title,
            ingredients: strings(recipe.ingredients),
            instructions: strings(recipe.instructions),
            calories: number_text(nutrition.calories),
            protein: number_text(nutrition.protein),
            carbs: number_text(nutrition.carbs),
            fats: number_text(nutrition.fats),
            fiber: number_text(nutrition.fiber),
        });
    }

    Ok(ParsedSource {
        format: SourceFormat::Json,
        rows,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SHEET: &str = "Meal Type\tDish\tIngredients\tInstructions\tCalories\tProtein\tCarbs\tFats\tFiber
breakfast\tTapsilog\tbeef tapa, garlic rice, egg\tFry the egg. Serve with rice.\t520\t32\t48\t20\t2

lunch\tChicken Tinola\tchicken, ginger, sayote\tSimmer chicken with ginger\t\t\t\t\t
dinner\tshort row\tonly three
";

    #[test]
    fn test_parse_tsv() {
        let parsed = parse_tsv(SHEET.as_bytes()).unwrap();
        assert_eq!(parsed.format, SourceFormat::Tsv);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.considered(), 3);

        let tapsilog = &parsed.rows[0];
        assert_eq!(tapsilog.line, 2);
        assert_eq!(tapsilog.category.as_deref(), Some("breakfast"));
        assert_eq!(tapsilog.ingredients, vec!["beef tapa", "garlic rice", "egg"]);
        assert_eq!(tapsilog.calories.as_deref(), Some("520"));
        assert_eq!(tapsilog.fiber.as_deref(), Some("2"));

        let tinola = &parsed.rows[1];
        assert_eq!(tinola.line, 4);
        assert!(tinola.calories.is_none());
        assert!(tinola.fiber.is_none());

        let short = &parsed.rejected[0];
        assert_eq!(short.line, 5);
        assert_eq!(short.reason, SkipReason::TooFewFields);
        assert_eq!(short.name.as_deref(), Some("short row"));
    }

    #[test]
    fn test_parse_tsv_replaces_invalid_utf8() {
        let mut sheet = b"breakfast\tTapsilog\tbeef tapa, egg\tFry the egg\t520\t32\n".to_vec();
        sheet.extend_from_slice(b"lunch\tBad \xff Name\tchicken\tSimmer it\t300\t20\n");
        sheet.extend_from_slice(b"dinner\tBangus Sisig\tmilkfish\tGrill the fish\t410\t30\n");

        let parsed = parse_tsv(sheet.as_slice()).unwrap();
        assert_eq!(parsed.rows.len(), 3);
        assert!(parsed.rejected.is_empty());
        assert_eq!(parsed.rows[1].name, "Bad \u{FFFD} Name");
        assert_eq!(parsed.rows[1].line, 2);
        assert_eq!(parsed.rows[2].name, "Bangus Sisig");
    }

    #[test]
    fn test_parse_tsv_lines_survive_blank_runs() {
        let sheet = "Meal Type\tDish\n\
            lunch\tTinola\tchicken\tSimmer\t160\t22\n\
            \n\r\n\n\
            dinner\tshort\n\
            dinner\tSisig\tpork\tGrill\t410\t30";
        let parsed = parse_tsv(sheet.as_bytes()).unwrap();
        let lines: Vec<usize> = parsed.rows.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 7]);
        assert_eq!(parsed.rejected[0].line, 6);
    }

    #[test]
    fn test_parse_tsv_keeps_quotes_literal() {
        let sheet = "lunch\t\"Pinoy\" Spaghetti\tpasta, hotdog\tBoil pasta\t400\t15\n";
        let parsed = parse_tsv(sheet.as_bytes()).unwrap();
        assert_eq!(parsed.rows[0].name, "\"Pinoy\" Spaghetti");
    }

    #[test]
    fn test_parse_json() {
        let json = r#"[
            {"title": "How to Cook Pork Sinigang", "ingredients": ["pork", 3, "tamarind"],
             "instructions": ["Boil the pork until tender, about an hour."]},
            {"ingredients": ["no title here"]},
            {"title": "Lumpia", "ingredients": [], "instructions": [],
             "nutrition": {"calories": 150, "fat": "6"}}
        ]"#;
        let parsed = parse_json(json.as_bytes()).unwrap();
        assert_eq!(parsed.format, SourceFormat::Json);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.rejected[0].line, 2);
        assert!(matches!(parsed.rejected[0].reason, SkipReason::Malformed(_)));

        assert_eq!(parsed.rows[0].ingredients, vec!["pork", "tamarind"]);
        assert_eq!(parsed.rows[1].calories.as_deref(), Some("150"));
        assert_eq!(parsed.rows[1].fats.as_deref(), Some("6"));
        assert!(parsed.rows[1].protein.is_none());
    }

    #[test]
    fn test_parse_json_requires_array() {
        assert!(parse_json(r#"{"title": "Adobo"}"#.as_bytes()).is_err());
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(SourceFormat::detect(Path::new("data/recipes.JSON")), SourceFormat::Json);
        assert_eq!(SourceFormat::detect(Path::new("data/meals.tsv")), SourceFormat::Tsv);
        assert_eq!(SourceFormat::detect(Path::new("meals.md")), SourceFormat::Tsv);
        assert_eq!("json".parse::<SourceFormat>().unwrap(), SourceFormat::Json);
        assert!("xml".parse::<SourceFormat>().is_err());
    }

    #[test]
    fn test_read_source_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"title": "Tinola", "ingredients": ["chicken"], "instructions": []}}]"#)
            .unwrap();

        let parsed = read_source(file.path(), None).unwrap();
        assert_eq!(parsed.format, SourceFormat::Json);
        assert_eq!(parsed.rows[0].name, "Tinola");

        assert!(read_source(Path::new("/nonexistent/meals.tsv"), None).is_err());
    }
}
