#[cfg(test)]
mod tests;

use fancy_regex::Regex;
use std::sync::LazyLock;

static UNWANTED_CHARACTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[@#€]").expect("regex is valid"));

static REPEATED_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("regex is valid"));

/// Strip `@`, `#` and `€` from generated text, then collapse every run of
/// newlines into a single one. Applying it twice changes nothing.
#[inline]
pub fn sanitize(text: &str) -> String {
    let stripped = UNWANTED_CHARACTERS.replace_all(text, "");
    REPEATED_NEWLINES.replace_all(&stripped, "\n").to_string()
}
