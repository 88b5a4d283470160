//! Zero-shot prompt construction.

/// Builds the natural-language query pairing the conversation context with
/// one candidate intent. Pure; the output always contains `history`,
/// `last_message`, and `intent` verbatim so downstream evidence matching
/// stays meaningful.
pub fn build_zero_shot_prompt(history: &str, last_message: &str, intent: &str) -> String {
    format!(
        "Analyze the following multi-turn conversation between a user and a business:\n\n\
         {}\n\n\
         The last message was:\n\"{}\"\n\n\
         Question: Does the overall conversation indicate the user's intent is '{}'?",
        history, last_message, intent
    )
}
