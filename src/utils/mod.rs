//! Project-specific utilities live here.

use time::OffsetDateTime;

/// `LIKE` pattern matching `term` anywhere, with wildcards in `term` escaped.
/// Use together with `ESCAPE '\'`.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

pub fn current_year() -> i32 {
    OffsetDateTime::now_utc().year()
}
