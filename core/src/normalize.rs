//! Text and record normalization for scraped or hand-entered recipes.
//!
//! Everything here is a pure function of its input: no I/O, no clock, no
//! randomness. The cleaning rules are heuristics driven by fixed denylists
//! (`NOISE_PHRASES`, `NAV_WORDS`) tuned for the recipe sites and meal sheets
//! this tool imports. They need to be kept in step with whatever source
//! format is being fed in; they make no promise about accuracy on arbitrary
//! scraped pages.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Category, MAX_NAME_LEN, Nutrition, SkipReason};

/// Ingredients kept per dish after cleaning.
pub const MAX_INGREDIENTS: usize = 10;
/// Instruction fragments kept per dish after cleaning.
pub const MAX_INSTRUCTIONS: usize = 5;
/// Numbered steps produced by [`expand_instructions`] before the serving step.
pub const MAX_EXPANDED_STEPS: usize = 6;

/// Global fallback when neither the dish name nor the ingredients say anything.
pub const DEFAULT_NUTRITION: Nutrition = Nutrition::new(350.0, 20.0, 30.0, 12.0);
/// Fiber (g) used when a source gives none.
pub const DEFAULT_FIBER: f64 = 2.0;

/// Lowercase substrings that mark navigation, comment or markup boilerplate.
pub const NOISE_PHRASES: &[&str] = &[
    "skip to",
    "primary navigation",
    "main content",
    "sidebar",
    "new? start here",
    "start here",
    "all recipes",
    "panlasang pinoy",
    "your top source",
    "this post may contain",
    "affiliate links",
    "disclosure policy",
    "submit your question",
    "have a question",
    "document.getelementbyid",
    "vanjo merano",
    "creator of",
    "goal is to introduce",
    "this blog was",
    "posted on",
    "thank you",
    "feedback",
    "sounds like",
    "glad you liked",
    "read more",
    "huge fan of",
    "ultimate showdown",
    "alignnone",
    "size-full",
    "wp-image",
    "srcset",
    "decoding=",
    "100vw",
    "<img",
];

/// Words that make up site menus. An entry built only from these is a menu
/// fragment ("Breakfast Lunch Dinner"), never an ingredient or a step.
pub const NAV_WORDS: &[&str] = &[
    "course",
    "courses",
    "breakfast",
    "lunch",
    "dinner",
    "appetizer",
    "appetizers",
    "dessert",
    "desserts",
    "ingredient",
    "ingredients",
    "comments",
    "recipes",
    "home",
    "menu",
    "about",
    "contact",
];

static COMMENT_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}:\d{2}\s*(am|pm)\b").expect("valid regex"));

static COMMENT_AUTHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(says|replied)\b").expect("valid regex"));

static IMAGE_MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d+(px|vw)\b|\.(jpe?g|png|gif|webp)\b").expect("valid regex")
});

static CLAUSE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.;]+|\s*,\s*").expect("valid regex"));

static PAN_FRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)pan-?fry").expect("valid regex"));
static SAUTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)saute").expect("valid regex"));
static STIR_FRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)stir-?fry").expect("valid regex"));

static FRY_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bfry\b").expect("valid regex"));

static TITLE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(how to cook|how to make)\s+").expect("valid regex"));
static TITLE_ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^the\s+").expect("valid regex"));
static TITLE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(recipe|experiment|guide|tutorial)$").expect("valid regex")
});

/// Dish-name keyed estimates, per serving. Matched by substring of the
/// lowercase name; the longest matching key wins.
const NUTRITION_TABLE: &[(&str, Nutrition)] = &[
    ("chicken adobo", Nutrition::new(250.0, 30.0, 5.0, 12.0)),
    ("sinigang", Nutrition::new(180.0, 25.0, 12.0, 6.0)),
    ("pancit", Nutrition::new(280.0, 12.0, 35.0, 10.0)),
    ("fried rice", Nutrition::new(300.0, 10.0, 40.0, 12.0)),
    ("lumpia", Nutrition::new(150.0, 8.0, 18.0, 6.0)),
    ("nilagang baboy", Nutrition::new(220.0, 28.0, 8.0, 9.0)),
    ("tinola", Nutrition::new(160.0, 22.0, 6.0, 6.0)),
    ("kare-kare", Nutrition::new(320.0, 28.0, 20.0, 15.0)),
    ("bistek tagalog", Nutrition::new(280.0, 32.0, 10.0, 12.0)),
    ("bulalo", Nutrition::new(240.0, 26.0, 15.0, 10.0)),
    ("pinakbet", Nutrition::new(140.0, 12.0, 15.0, 5.0)),
    ("lumpiang shanghai", Nutrition::new(160.0, 9.0, 16.0, 7.0)),
    ("tapa", Nutrition::new(200.0, 28.0, 2.0, 10.0)),
    ("longanisa", Nutrition::new(280.0, 16.0, 3.0, 22.0)),
    ("dinuguan", Nutrition::new(220.0, 24.0, 8.0, 11.0)),
    ("lapu-lapu", Nutrition::new(160.0, 28.0, 0.0, 5.0)),
    ("tilapia", Nutrition::new(140.0, 26.0, 0.0, 3.0)),
    ("inihaw na isda", Nutrition::new(180.0, 28.0, 2.0, 7.0)),
    ("adobong pusit", Nutrition::new(200.0, 25.0, 6.0, 9.0)),
    ("tortang talong", Nutrition::new(180.0, 12.0, 15.0, 8.0)),
    ("vegetable soup", Nutrition::new(120.0, 8.0, 18.0, 2.0)),
    ("chicken wings", Nutrition::new(220.0, 24.0, 0.0, 13.0)),
    ("pork chops", Nutrition::new(260.0, 32.0, 0.0, 14.0)),
    ("beef steak", Nutrition::new(280.0, 35.0, 0.0, 15.0)),
    ("fried chicken", Nutrition::new(320.0, 28.0, 15.0, 16.0)),
    ("grilled chicken", Nutrition::new(200.0, 32.0, 0.0, 8.0)),
    ("rice bowl", Nutrition::new(240.0, 5.0, 50.0, 1.0)),
    ("noodle soup", Nutrition::new(200.0, 10.0, 30.0, 5.0)),
    ("vegetable salad", Nutrition::new(100.0, 5.0, 15.0, 2.0)),
    ("egg roll", Nutrition::new(140.0, 8.0, 16.0, 5.0)),
    ("spring roll", Nutrition::new(130.0, 7.0, 15.0, 5.0)),
];

const SEAFOOD_WORDS: &[&str] = &[
    "fish", "shrimp", "seafood", "prawn", "squid", "crab", "mussel", "clam",
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn is_url(lower: &str) -> bool {
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www.")
}

fn is_markup(lower: &str) -> bool {
    lower.starts_with('<')
        || lower.contains("document.")
        || lower.contains("window.")
        || lower.contains("function(")
}

fn is_nav_only(lower: &str) -> bool {
    let mut words = lower
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .peekable();
    words.peek().is_some() && words.all(|w| NAV_WORDS.contains(&w))
}

/// True when `text` looks like site chrome rather than recipe content.
#[must_use]
pub fn is_noise(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    contains_any(&lower, NOISE_PHRASES)
        || is_nav_only(&lower)
        || COMMENT_TIMESTAMP.is_match(&lower)
        || COMMENT_AUTHOR.is_match(&lower)
        || IMAGE_MARKUP.is_match(&lower)
}

/// Keep plausible ingredient lines.
///
/// An entry survives when it is longer than 2 and shorter than 150
/// characters, is not noise and is not a URL. Survivors are trimmed,
/// de-duplicated case-insensitively in first-seen order and capped at
/// [`MAX_INGREDIENTS`].
#[must_use]
pub fn clean_ingredient_list<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|item| item.as_ref().trim())
        .filter(|item| {
            let len = item.chars().count();
            let lower = item.to_lowercase();
            len > 2 && len < 150 && !is_noise(item) && !is_url(&lower)
        })
        .filter(|item| seen.insert(item.to_lowercase()))
        .take(MAX_INGREDIENTS)
        .map(str::to_string)
        .collect()
}

/// Keep substantial instruction fragments and join them with a space.
///
/// Same noise policy as [`clean_ingredient_list`], but fragments must be
/// longer than 20 characters and markup/script fragments are dropped too.
/// At most [`MAX_INSTRUCTIONS`] fragments are kept.
#[must_use]
pub fn clean_instruction_text<S: AsRef<str>>(raw: &[S]) -> String {
    raw.iter()
        .map(|item| item.as_ref().trim())
        .filter(|item| {
            let lower = item.to_lowercase();
            item.chars().count() > 20 && !is_noise(item) && !is_url(&lower) && !is_markup(&lower)
        })
        .take(MAX_INSTRUCTIONS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First matching rule wins:
///
/// 1. name mentions soup, salad, or sandwich/quesadilla
/// 2. ingredients mention seafood, then pork, beef, chicken
/// 3. name mentions vegetable/vegan/vegetarian
/// 4. ingredients mention rice or noodles
///
/// Anything else is [`Category::MainCourse`].
#[must_use]
pub fn categorize(name: &str, ingredients_text: &str) -> Category {
    let name = name.to_lowercase();
    let ingredients = ingredients_text.to_lowercase();

    if name.contains("soup") {
        Category::Soups
    } else if name.contains("salad") {
        Category::Salads
    } else if contains_any(&name, &["sandwich", "quesadilla"]) {
        Category::Sandwiches
    } else if contains_any(&ingredients, SEAFOOD_WORDS) {
        Category::Seafood
    } else if ingredients.contains("pork") {
        Category::PorkDishes
    } else if ingredients.contains("beef") {
        Category::BeefDishes
    } else if ingredients.contains("chicken") {
        Category::ChickenDishes
    } else if contains_any(&name, &["vegetable", "vegan", "vegetarian"]) {
        Category::Vegetables
    } else if contains_any(&ingredients, &["rice", "noodle"]) {
        Category::RiceAndNoodles
    } else {
        Category::MainCourse
    }
}

/// Rough per-serving macros for a dish.
///
/// This is a deterministic heuristic, not a nutrition database: a known
/// dish name takes its table entry, otherwise the global default is nudged
/// by what the ingredients mention. With no signal at all the result is
/// exactly [`DEFAULT_NUTRITION`].
#[must_use]
pub fn estimate_nutrition(name: &str, ingredients_text: &str) -> Nutrition {
    let name = normalize_whitespace(&name.to_lowercase());
    if let Some((_, known)) = NUTRITION_TABLE
        .iter()
        .filter(|(key, _)| name.contains(key))
        .max_by_key(|(key, _)| key.len())
    {
        return *known;
    }

    let ingredients = ingredients_text.to_lowercase();
    let mut n = DEFAULT_NUTRITION;

    if contains_any(&ingredients, &["chicken", "pork", "beef"]) {
        n.protein = 28.0;
        n.calories = 400.0;
        if !contains_any(&ingredients, &["rice", "noodle"]) {
            n.carbs = 15.0;
            n.fats = 18.0;
        }
    }
    if contains_any(&ingredients, &["fish", "shrimp", "seafood"]) {
        n = Nutrition::new(280.0, 25.0, 10.0, 8.0);
    }
    if contains_any(&ingredients, &["vegetable", "salad"]) {
        n = Nutrition::new(180.0, 12.0, 25.0, 5.0);
    }
    if ingredients.contains("rice") {
        n.carbs = 50.0;
        n.fats = 5.0;
    }
    if name.contains("soup") {
        n = Nutrition::new(220.0, 15.0, 25.0, 5.0);
    }
    n
}

fn expand_clause(clause: &str) -> String {
    let c = PAN_FRY.replace_all(clause, "pan-fry");
    let c = SAUTE.replace_all(&c, "sauté");
    let c = STIR_FRY.replace_all(&c, "stir-fry").into_owned();
    let lc = c.to_lowercase();

    if lc.starts_with("marinate") {
        format!("{c}. If time allows, marinate longer (30 minutes to overnight) for better flavor.")
    } else if lc.starts_with("boil") {
        format!("{c}, keeping a gentle boil to avoid breaking ingredients.")
    } else if lc.starts_with("simmer") {
        format!("{c} until the meat/vegetables are tender and flavors develop.")
    } else if lc.starts_with("sauté") {
        format!("{c} over medium heat until fragrant.")
    } else if lc.contains("grill") {
        format!("{c}, basting occasionally for color and moisture.")
    } else if lc.contains("steam") {
        format!("{c} until set and cooked through.")
    } else if lc.contains("bake") {
        format!("{c} until cooked through and lightly browned.")
    } else if lc.contains("fry") {
        format!("{c} until golden and fully cooked.")
    } else {
        c
    }
}

/// Turn terse instructions into numbered steps.
///
/// Empty input gives a generic four-step placeholder. Otherwise a
/// preparation step comes first, then one step per clause (split on `.`,
/// `;` and `,`) with cooking verbs elaborated, up to
/// [`MAX_EXPANDED_STEPS`] steps, then a serving step unless the text
/// already mentions serving.
#[must_use]
pub fn expand_instructions<S: AsRef<str>>(raw: &str, ingredients: &[S]) -> String {
    let text = raw.trim();
    if text.is_empty() {
        return [
            "1. Prepare and measure all ingredients.",
            "2. Cook using your preferred Filipino method for this dish.",
            "3. Season to taste.",
            "4. Serve hot and enjoy.",
        ]
        .join("\n");
    }

    let has_aromatics = ingredients.iter().any(|i| {
        let lower = i.as_ref().to_lowercase();
        contains_any(&lower, &["garlic", "onion", "ginger"])
    });
    let mut steps = vec![format!(
        "Prepare ingredients (wash/chop as needed{}).",
        if has_aromatics { ", mince aromatics" } else { "" }
    )];

    for clause in CLAUSE_SPLIT.split(text).map(str::trim).filter(|c| !c.is_empty()) {
        if steps.len() >= MAX_EXPANDED_STEPS {
            break;
        }
        steps.push(expand_clause(clause));
    }

    if !text.to_lowercase().contains("serve") {
        steps.push("Serve warm; pair with rice or your preferred side.".to_string());
    }

    steps
        .iter()
        .map(|s| normalize_whitespace(s))
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(i, s)| format!("{}. {s}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Comma-split, trim, drop empties, de-duplicate case-insensitively.
#[must_use]
pub fn split_ingredients(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Add the pantry basics the instructions clearly rely on.
#[must_use]
pub fn ensure_common_basics(mut ingredients: Vec<String>, instructions: &str) -> Vec<String> {
    let mut have: HashSet<String> = ingredients.iter().map(|i| i.to_lowercase()).collect();
    let lower = instructions.to_lowercase();

    let mut add = |value: &str, aliases: &[&str], ingredients: &mut Vec<String>| {
        let key = value.to_lowercase();
        if have.contains(&key) || aliases.iter().any(|a| have.contains(*a)) {
            return;
        }
        ingredients.push(value.to_string());
        have.insert(key);
    };

    if FRY_WORD.is_match(&lower) {
        add(
            "Cooking oil",
            &["oil", "cooking oil", "vegetable oil"],
            &mut ingredients,
        );
    }
    if lower.contains("season") || lower.contains("salt") {
        add("Salt", &["salt"], &mut ingredients);
    }
    if lower.contains("pepper") {
        add("Black pepper", &["pepper", "black pepper"], &mut ingredients);
    }
    ingredients
}

/// Strip how-to phrasing from a scraped page title.
#[must_use]
pub fn extract_dish_name(title: &str) -> String {
    let name = TITLE_PREFIX.replace(title.trim(), "");
    let name = TITLE_ARTICLE.replace(&name, "");
    TITLE_SUFFIX.replace(&name, "").trim().to_string()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace and cap at [`MAX_NAME_LEN`] characters.
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    let collapsed = normalize_whitespace(raw);
    match collapsed.char_indices().nth(MAX_NAME_LEN) {
        Some((cut, _)) => collapsed[..cut].trim_end().to_string(),
        None => collapsed,
    }
}

/// Case-insensitive breakfast/lunch/dinner.
#[must_use]
pub fn normalize_meal_slot(raw: &str) -> Option<Category> {
    match raw.trim().to_lowercase().as_str() {
        "breakfast" => Some(Category::Breakfast),
        "lunch" => Some(Category::Lunch),
        "dinner" => Some(Category::Dinner),
        _ => None,
    }
}

/// Parse an optional numeric cell. Blank is `None`; anything that is not a
/// finite, non-negative number is a skip reason.
pub fn parse_amount(field: &'static str, raw: Option<&str>) -> Result<Option<f64>, SkipReason> {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => Ok(Some(n)),
        _ => Err(SkipReason::InvalidNumber {
            field,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_ingredients_drops_noise_and_urls() {
        let raw = [
            "Skip to content",
            "2 cups rice",
            "garlic",
            "https://example.com/img.jpg",
        ];
        assert_eq!(clean_ingredient_list(&raw), vec!["2 cups rice", "garlic"]);
    }

    #[test]
    fn test_clean_ingredients_keeps_words_containing_short_noise() {
        // "salt" contains "alt", "water" contains "at"
        let raw = ["1 tsp salt", "2 cups water", "1 tbsp soy sauce"];
        assert_eq!(clean_ingredient_list(&raw).len(), 3);
    }

    #[test]
    fn test_clean_ingredients_length_bounds() {
        let long = "x".repeat(150);
        let raw = ["ab", "egg", long.as_str(), "   "];
        assert_eq!(clean_ingredient_list(&raw), vec!["egg"]);
    }

    #[test]
    fn test_clean_ingredients_dedupes_and_caps() {
        let raw: Vec<String> = (0..15)
            .map(|i| format!("ingredient number {i}"))
            .chain(["Garlic".to_string()])
            .collect();
        let mut with_dupes = vec!["Garlic".to_string(), "garlic".to_string(), "GARLIC ".to_string()];
        with_dupes.extend(raw);

        let cleaned = clean_ingredient_list(&with_dupes);
        assert_eq!(cleaned.len(), MAX_INGREDIENTS);
        assert_eq!(cleaned[0], "Garlic");
        assert_eq!(cleaned.iter().filter(|i| i.eq_ignore_ascii_case("garlic")).count(), 1);
    }

    #[test]
    fn test_nav_only_entries_are_noise() {
        assert!(is_noise("Breakfast Lunch Dinner"));
        assert!(is_noise("Ingredients"));
        assert!(is_noise("Course: Dessert"));
        assert!(!is_noise("breakfast sausage"));
        assert!(!is_noise("1 cup rice"));
    }

    #[test]
    fn test_comment_lines_are_noise() {
        assert!(is_noise("Maria says: loved this!"));
        assert!(is_noise("March 3, 2021 at 5:12 pm"));
        assert!(is_noise("width=\"640px\""));
    }

    #[test]
    fn test_clean_instruction_text() {
        let raw = [
            "Short step.",
            "Heat oil in a pan and saute the garlic until golden.",
            "<script>document.write('ad')</script>",
            "document.getElementById('recipe').focus();",
            "Add the chicken and simmer for 30 minutes, covered.",
        ];
        assert_eq!(
            clean_instruction_text(&raw),
            "Heat oil in a pan and saute the garlic until golden. \
             Add the chicken and simmer for 30 minutes, covered."
        );
    }

    #[test]
    fn test_clean_instruction_text_caps_fragments() {
        let raw: Vec<String> = (1..=8)
            .map(|i| format!("Step {i}: stir the pot slowly and carefully."))
            .collect();
        let text = clean_instruction_text(&raw);
        assert!(text.contains("Step 5:"));
        assert!(!text.contains("Step 6:"));
    }

    #[test]
    fn test_categorize_priority() {
        assert_eq!(categorize("Chicken Soup", "chicken broth"), Category::Soups);
        assert_eq!(categorize("Halabos na Hipon", "shrimp, butter"), Category::Seafood);
        assert_eq!(categorize("Lechon Kawali", "pork belly, salt"), Category::PorkDishes);
        assert_eq!(categorize("Mixed Grill", "pork, beef, chicken"), Category::PorkDishes);
        assert_eq!(categorize("Bistek", "beef sirloin, soy sauce"), Category::BeefDishes);
        assert_eq!(categorize("Chicken Quesadilla", "chicken, cheese"), Category::Sandwiches);
        assert_eq!(categorize("Vegetable Lumpia", "cabbage, carrot"), Category::Vegetables);
        assert_eq!(categorize("Sinangag", "rice, garlic"), Category::RiceAndNoodles);
        assert_eq!(categorize("Turon", "banana, sugar"), Category::MainCourse);
    }

    #[test]
    fn test_estimate_nutrition_default() {
        let n = estimate_nutrition("Unknown Dish XYZ", "random ingredient");
        assert_eq!(n, DEFAULT_NUTRITION);
        assert_eq!(n, Nutrition::new(350.0, 20.0, 30.0, 12.0));
    }

    #[test]
    fn test_estimate_nutrition_table_prefers_longest_key() {
        // "lumpiang shanghai" also contains "lumpia"
        assert_eq!(
            estimate_nutrition("Lumpiang  Shanghai", ""),
            Nutrition::new(160.0, 9.0, 16.0, 7.0)
        );
        assert_eq!(
            estimate_nutrition("Chicken Tinola", ""),
            Nutrition::new(160.0, 22.0, 6.0, 6.0)
        );
    }

    #[test]
    fn test_estimate_nutrition_from_ingredients() {
        let meat = estimate_nutrition("House Special", "pork belly, garlic");
        assert_eq!(meat, Nutrition::new(400.0, 28.0, 15.0, 18.0));

        let meat_rice = estimate_nutrition("House Special", "beef, rice");
        assert_eq!(meat_rice, Nutrition::new(400.0, 28.0, 50.0, 5.0));

        let soup = estimate_nutrition("Corn Soup", "corn, egg");
        assert_eq!(soup, Nutrition::new(220.0, 15.0, 25.0, 5.0));
    }

    #[test]
    fn test_estimate_nutrition_is_deterministic() {
        let a = estimate_nutrition("Ginataang Gulay", "squash, coconut milk, vegetable");
        let b = estimate_nutrition("Ginataang Gulay", "squash, coconut milk, vegetable");
        assert_eq!(a, b);
    }

    #[test]
    fn test_expand_instructions_empty() {
        let out = expand_instructions("  ", &[] as &[&str]);
        assert_eq!(out.lines().count(), 4);
        assert!(out.starts_with("1. Prepare and measure all ingredients."));
        assert!(out.ends_with("4. Serve hot and enjoy."));
    }

    #[test]
    fn test_expand_instructions_clauses() {
        let out = expand_instructions(
            "Marinate pork in soy sauce; saute garlic, simmer 20 minutes",
            &["pork", "garlic"],
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "1. Prepare ingredients (wash/chop as needed, mince aromatics).",
                "2. Marinate pork in soy sauce. If time allows, marinate longer (30 minutes to overnight) for better flavor.",
                "3. sauté garlic over medium heat until fragrant.",
                "4. simmer 20 minutes until the meat/vegetables are tender and flavors develop.",
                "5. Serve warm; pair with rice or your preferred side.",
            ]
        );
    }

    #[test]
    fn test_expand_instructions_caps_steps_and_respects_serve() {
        let out = expand_instructions(
            "Boil water. Add noodles. Stir. Drain. Toss with sauce. Top with egg. Garnish. Serve.",
            &["noodles"],
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), MAX_EXPANDED_STEPS);
        assert_eq!(
            lines[1],
            "2. Boil water, keeping a gentle boil to avoid breaking ingredients."
        );
        assert!(lines[0].ends_with("(wash/chop as needed)."));
        assert!(!out.contains("pair with rice"));
    }

    #[test]
    fn test_expand_instructions_fry_and_grill() {
        let out = expand_instructions("Pan fry the fish. Grill the eggplant", &["fish"]);
        assert!(out.contains("2. Pan fry the fish until golden and fully cooked."));
        assert!(out.contains("3. Grill the eggplant, basting occasionally for color and moisture."));
    }

    #[test]
    fn test_split_ingredients() {
        assert_eq!(
            split_ingredients(" rice, Garlic ,, garlic, egg "),
            vec!["rice", "Garlic", "egg"]
        );
    }

    #[test]
    fn test_ensure_common_basics() {
        let out = ensure_common_basics(
            vec!["eggs".to_string()],
            "Fry the eggs and season with salt and pepper.",
        );
        assert_eq!(out, vec!["eggs", "Cooking oil", "Salt", "Black pepper"]);

        let out = ensure_common_basics(
            vec!["oil".to_string(), "pepper".to_string(), "Salt".to_string()],
            "Stir-fry, season with salt and pepper.",
        );
        assert_eq!(out, vec!["oil", "pepper", "Salt"]);

        let out = ensure_common_basics(vec!["tofu".to_string()], "Deep-fried tofu");
        assert_eq!(out, vec!["tofu"]);
    }

    #[test]
    fn test_extract_dish_name() {
        assert_eq!(extract_dish_name("How to Cook Chicken Adobo"), "Chicken Adobo");
        assert_eq!(extract_dish_name("The Best Sinigang Recipe"), "Best Sinigang");
        assert_eq!(extract_dish_name("how to make Lumpia guide"), "Lumpia");
        assert_eq!(extract_dish_name("Pancit Canton"), "Pancit Canton");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Tortang   Talong \t"), "Tortang Talong");
        let long = "é".repeat(300);
        assert_eq!(normalize_name(&long).chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_normalize_meal_slot() {
        assert_eq!(normalize_meal_slot(" Lunch "), Some(Category::Lunch));
        assert_eq!(normalize_meal_slot("BREAKFAST"), Some(Category::Breakfast));
        assert_eq!(normalize_meal_slot("snack"), None);
        assert_eq!(normalize_meal_slot(""), None);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("calories", None), Ok(None));
        assert_eq!(parse_amount("calories", Some("  ")), Ok(None));
        assert_eq!(parse_amount("calories", Some("320")), Ok(Some(320.0)));
        assert_eq!(parse_amount("fiber", Some("2.5 ")), Ok(Some(2.5)));
        assert!(parse_amount("protein", Some("-3")).is_err());
        assert!(parse_amount("protein", Some("lots")).is_err());
        assert!(parse_amount("protein", Some("NaN")).is_err());
    }
}
