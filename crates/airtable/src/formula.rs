//! Helpers for building `filterByFormula` expressions.

/// Escape a value for use inside a single-quoted formula string.
#[must_use]
pub fn escape_formula_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Build an equality filter: `{field} = 'value'`.
#[must_use]
pub fn filter_formula_eq(field: &str, value: &str) -> String {
    format!("{{{field}}} = '{}'", escape_formula_string(value))
}
