//! Conversation windowing: truncate to the trailing turns and split into
//! history and last message.

use crate::engine::normalize::normalize;
use crate::error::AppError;
use crate::models::Message;

/// Separator between formatted history turns. Newline is load-bearing:
/// the rationale generator splits the conversation text on it to recover
/// individual turns when hunting for the best user quote.
pub const TURN_SEPARATOR: &str = "\n";

/// Keeps the last `max_turns` messages, normalizes each as
/// `"<lowercased sender>: <normalized text>"`, and returns
/// `(history, last_message)`.
///
/// A single windowed message yields an empty history. An empty message
/// list is an `EmptyConversation` error the batch orchestrator skips.
pub fn window(
    conversation_id: &str,
    messages: &[Message],
    max_turns: usize,
) -> Result<(String, String), AppError> {
    if messages.is_empty() {
        return Err(AppError::EmptyConversation(conversation_id.to_string()));
    }

    let start = messages.len().saturating_sub(max_turns);
    let lines: Vec<String> = messages[start..]
        .iter()
        .map(|msg| format!("{}: {}", msg.sender.to_lowercase(), normalize(&msg.text)))
        .collect();

    if lines.len() == 1 {
        return Ok((String::new(), lines[0].clone()));
    }

    let history = lines[..lines.len() - 1].join(TURN_SEPARATOR);
    let last_message = lines[lines.len() - 1].clone();
    Ok((history, last_message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender: &str, text: &str) -> Message {
        Message {
            sender: sender.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_single_message_has_empty_history() {
        let messages = vec![msg("user", "I want to schedule a viewing for this weekend")];
        let (history, last) = window("c1", &messages, 5).unwrap();
        assert_eq!(history, "");
        assert_eq!(last, "user: i want to schedule a viewing for this weekend");
    }

    #[test]
    fn test_two_messages_split() {
        let messages = vec![msg("user", "Hi there"), msg("agent", "Hello!")];
        let (history, last) = window("c1", &messages, 5).unwrap();
        assert_eq!(history, "user: hi there");
        assert_eq!(last, "agent: hello!");
    }

    #[test]
    fn test_truncates_to_last_max_turns() {
        let messages: Vec<Message> = (1..=7).map(|i| msg("user", &format!("m{}", i))).collect();
        let (history, last) = window("c1", &messages, 5).unwrap();
        // Messages 3..=6 (0-indexed 2..=5) form the history, message 7 is last.
        assert_eq!(history, "user: m3\nuser: m4\nuser: m5\nuser: m6");
        assert_eq!(last, "user: m7");
        assert!(!history.contains("m1"));
        assert!(!history.contains("m2"));
    }

    #[test]
    fn test_history_never_contains_last_message() {
        let messages: Vec<Message> = (1..=4).map(|i| msg("user", &format!("m{}", i))).collect();
        let (history, last) = window("c1", &messages, 5).unwrap();
        assert!(!history.contains(&last));
    }

    #[test]
    fn test_sender_is_lowercased() {
        let messages = vec![msg("User", "Hello"), msg("Agent", "Hi")];
        let (history, last) = window("c1", &messages, 5).unwrap();
        assert_eq!(history, "user: hello");
        assert_eq!(last, "agent: hi");
    }

    #[test]
    fn test_empty_conversation_is_an_error() {
        let err = window("c9", &[], 5).unwrap_err();
        match err {
            AppError::EmptyConversation(id) => assert_eq!(id, "c9"),
            other => panic!("expected EmptyConversation, got {:?}", other),
        }
    }
}
