use once_cell::sync::Lazy;
use regex::Regex;

static DECORATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[\[\]()（）{}"“”‘’《》*#]"#).expect("decoration pattern is valid")
});

static WHITESPACE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Strip markup-like decoration that the synthesizers read aloud or choke on
/// (brackets, quotes, markdown emphasis) and collapse whitespace runs.
pub fn clean_text(text: &str) -> String {
    let stripped = DECORATION_PATTERN.replace_all(text, "");
    let normalized = WHITESPACE_PATTERN.replace_all(&stripped, " ");
    normalized.trim().to_string()
}
