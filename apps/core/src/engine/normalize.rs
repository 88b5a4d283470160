//! Text normalization applied to every message before it reaches the
//! scoring pipeline.

use regex::Regex;
use std::sync::LazyLock;

// Everything outside basic latin alphanumerics, whitespace, and the four
// punctuation marks is dropped. Emoji are removed outright, no
// replacement character left behind.
static NON_BASIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\s.,!?]").expect("Invalid regex: non-basic filter"));

/// Cleans a single message:
/// - removes emoji and any character outside `[a-zA-Z0-9 .,!?]`
/// - lowercases
/// - collapses whitespace runs to single spaces and trims
///
/// Total function: empty input yields empty output.
pub fn normalize(raw: &str) -> String {
    let stripped = NON_BASIC.replace_all(raw, "");
    let lowered = stripped.to_lowercase();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_emoji_entirely() {
        assert_eq!(normalize("Hello 👋 world 🌍!"), "hello world !");
    }

    #[test]
    fn test_strips_special_characters() {
        assert_eq!(normalize("3BHK @ ₹50L #deal"), "3bhk 50l deal");
    }

    #[test]
    fn test_keeps_basic_punctuation() {
        assert_eq!(
            normalize("Can we meet, say, at 5?!"),
            "can we meet, say, at 5?!"
        );
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize("  too \t many\n\n spaces  "), "too many spaces");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }
}
