use regex::Regex;
use std::sync::LazyLock;

static SPECIAL_CHARACTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("Hardcode regex pattern"));
static UNDERSCORE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").expect("Hardcode regex pattern"));

/// Fallback for labels with nothing usable left after cleaning.
pub const UNNAMED_COLUMN: &str = "unnamed_column";

/// Turns an arbitrary sheet or column label into a lowercase SQL identifier.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`, runs of `_` collapse,
/// edge underscores are trimmed and a leading digit gets a `col_` prefix.
/// The result is never empty and `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(raw: &str) -> String {
    let cleaned = SPECIAL_CHARACTERS.replace_all(raw, "_");
    let cleaned = UNDERSCORE_RUNS.replace_all(&cleaned, "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        UNNAMED_COLUMN.to_owned()
    } else if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("col_{}", cleaned.to_ascii_lowercase())
    } else {
        cleaned.to_ascii_lowercase()
    }
}
