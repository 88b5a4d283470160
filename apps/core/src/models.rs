use serde::{Deserialize, Serialize};
use validator::Validate;

/// A single message within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Message {
    /// Free-form sender tag (commonly "user" or "agent").
    pub sender: String,
    /// Raw message text; may contain emoji and special characters.
    pub text: String,
}

/// A multi-turn conversation as received in a batch.
///
/// Conversations are immutable once received. `conversation_id` is not
/// guaranteed unique across a batch; duplicates are processed
/// independently, never merged.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Conversation {
    /// Identifier carried through to the classification result.
    #[validate(length(min = 1))]
    pub conversation_id: String,
    /// Ordered message sequence, oldest first.
    pub messages: Vec<Message>,
}

/// Derived artifact produced by the windower: the cleaned trailing context
/// split into history and the final message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowedConversation {
    pub conversation_id: String,
    /// All windowed turns but the last, one formatted line per turn,
    /// joined with newlines. Empty for single-message conversations.
    pub history: String,
    /// The final windowed turn alone.
    pub last_message: String,
}

/// One candidate intent's aggregated confidence, transient within the
/// selector sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredIntent {
    pub intent: String,
    /// Mean of the successful per-model votes, in [0, 1].
    pub confidence: f32,
}

/// Terminal entity persisted per successfully classified conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Identifier of the classified conversation.
    pub conversation_id: String,
    /// Winning intent; always a member of the configured allowed set.
    pub predicted_intent: String,
    /// Aggregate confidence of the winning intent, in [0, 1].
    pub confidence: f32,
    /// Human-readable justification for the prediction.
    pub rationale: String,
}

/// Recorded reason a conversation produced no result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub conversation_id: String,
    pub reason: String,
}

/// Outcome of a whole batch. Every input conversation appears in exactly
/// one of the two lists; silent drops are a defect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub results: Vec<ClassificationResult>,
    pub failures: Vec<FailureRecord>,
}
