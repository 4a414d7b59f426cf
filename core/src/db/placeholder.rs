//! `?` to `$n` placeholder rewriting.
//!
//! The rewrite is positional and does not parse SQL: a `?` inside a string
//! literal or a comment is renumbered like any other. Statements sent
//! through the query layer must not contain a literal `?`.

/// Replace each `?` in `sql`, left to right, with `$1..$N`.
///
/// Returns the rewritten text and `N`.
#[must_use]
pub fn rewrite_placeholders(sql: &str) -> (String, usize) {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0;
    for ch in sql.chars() {
        if ch == '?' {
            index += 1;
            out.push('$');
            out.push_str(&index.to_string());
        } else {
            out.push(ch);
        }
    }
    (out, index)
}
