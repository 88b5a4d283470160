//! Human-readable rationale generation.
//!
//! Ties each prediction back to the configured intent keywords: finds the
//! keywords present in the conversation, quotes the user turn with the
//! most keyword hits, and falls back to a generic statement when no
//! evidence exists. Low-confidence predictions get a note instead of
//! evidence, and the whole generator can be switched off in settings.

use crate::config::Settings;
use crate::engine::window::TURN_SEPARATOR;
use regex::Regex;
use std::sync::LazyLock;

/// Quoted user lines longer than this are cut to 77 chars plus an ellipsis.
const MAX_QUOTE_LENGTH: usize = 80;

static USER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)user:").expect("Invalid regex: user token"));

/// Builds the rationale for a prediction.
///
/// `conversation_text` is the windowed history and last message joined
/// with the turn separator. Keyword containment is a plain case-sensitive
/// substring test against the (already normalized, lowercased) text.
pub fn generate(
    conversation_text: &str,
    predicted_intent: &str,
    confidence: f32,
    settings: &Settings,
) -> String {
    if !settings.rationale_enabled {
        return generic_rationale(predicted_intent);
    }
    if confidence < settings.confidence_threshold {
        return format!(
            "Classification confidence was below threshold for {}",
            predicted_intent
        );
    }

    let matched_keywords: Vec<&str> = settings
        .keywords_for(predicted_intent)
        .iter()
        .filter(|kw| conversation_text.contains(kw.as_str()))
        .map(|kw| kw.as_str())
        .collect();

    let best_line = best_user_line(conversation_text, &matched_keywords);

    match (matched_keywords.first(), best_line) {
        (Some(first_keyword), Some(line)) => {
            format!("The user mentioned '{}' in: \"{}\"", first_keyword, line)
        }
        (Some(_), None) => format!(
            "Keywords detected: '{}' indicating {}",
            matched_keywords
                .iter()
                .take(2)
                .copied()
                .collect::<Vec<_>>()
                .join(", "),
            predicted_intent
        ),
        (None, _) => generic_rationale(predicted_intent),
    }
}

fn generic_rationale(intent: &str) -> String {
    format!("Conversation pattern and context indicate {}", intent)
}

/// Picks the user turn containing the most matched keywords (strict max,
/// first-seen wins), with the "user:" prefix stripped and the line
/// truncated to the quote budget. `None` when no user turn matches any
/// keyword.
fn best_user_line(conversation_text: &str, matched_keywords: &[&str]) -> Option<String> {
    let mut best: Option<String> = None;
    let mut max_matches = 0usize;

    for line in conversation_text.split(TURN_SEPARATOR) {
        let line = line.trim();
        if !USER_TOKEN.is_match(line) {
            continue;
        }

        let lowered = line.to_lowercase();
        let matches = matched_keywords
            .iter()
            .filter(|kw| lowered.contains(&kw.to_lowercase()))
            .count();

        if matches > max_matches {
            max_matches = matches;
            let stripped = USER_TOKEN.replace_all(line, "").trim().to_string();
            best = Some(truncate_quote(stripped));
        }
    }

    best
}

fn truncate_quote(line: String) -> String {
    if line.chars().count() > MAX_QUOTE_LENGTH {
        let head: String = line.chars().take(MAX_QUOTE_LENGTH - 3).collect();
        format!("{}...", head)
    } else {
        line
    }
}
