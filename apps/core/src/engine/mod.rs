//! # Classification Engine
//!
//! Everything between a raw conversation and its classified intent.
//!
//! ## Components
//! - `normalize`: message text cleanup (emoji/special-char stripping)
//! - `window`: last-N-turn truncation and history/last-message split
//! - `prompt`: zero-shot query construction
//! - `scorer`: loaded model set and per-(intent, model) confidence scoring
//! - `selector`: intent × model sweep and winner selection
//! - `rationale`: keyword-evidence justification strings

pub mod normalize;
pub mod prompt;
pub mod rationale;
pub mod scorer;
pub mod selector;
pub mod window;

pub use scorer::{IntentScorer, ZeroShotScorer};

use crate::config::Settings;
use crate::error::AppError;
use crate::models::{ClassificationResult, Conversation};
use crate::engine::window::TURN_SEPARATOR;
use std::sync::Arc;
use validator::Validate;

/// Runs the full windowing, selection, and rationale pipeline for one
/// conversation. Owns the scorer; shared read-only across workers.
pub struct ClassificationEngine {
    scorer: Box<dyn IntentScorer>,
    settings: Arc<Settings>,
}

impl ClassificationEngine {
    pub fn new(scorer: Box<dyn IntentScorer>, settings: Arc<Settings>) -> Self {
        Self { scorer, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn model_ids(&self) -> Vec<String> {
        self.scorer.model_ids()
    }

    /// Classifies a single conversation end to end.
    pub fn classify(&self, conversation: &Conversation) -> Result<ClassificationResult, AppError> {
        conversation.validate()?;

        let (history, last_message) = window::window(
            &conversation.conversation_id,
            &conversation.messages,
            self.settings.max_history_turns,
        )?;

        let best = selector::select(
            self.scorer.as_ref(),
            &self.settings.allowed_intents,
            &history,
            &last_message,
        )?;

        let conversation_text = if history.is_empty() {
            last_message
        } else {
            format!("{}{}{}", history, TURN_SEPARATOR, last_message)
        };

        let rationale = rationale::generate(
            &conversation_text,
            &best.intent,
            best.confidence,
            &self.settings,
        );

        Ok(ClassificationResult {
            conversation_id: conversation.conversation_id.clone(),
            predicted_intent: best.intent,
            confidence: best.confidence,
            rationale,
        })
    }
}
