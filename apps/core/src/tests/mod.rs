//! Test Module
//!
//! Cross-module test suites for the IntentCast backend.
//!
//! ## Test Categories
//! - `config_tests`: settings resolution, env overrides, validation
//! - `engine_tests`: full windowing, selection, and rationale pipeline
//! - `output_tests`: JSON/CSV/zip result files
//! - `service_tests`: batch orchestration and failure isolation

pub mod service_tests;

use crate::config::Settings;
use crate::engine::IntentScorer;
use crate::error::AppError;

/// Deterministic stand-in for the model set: votes 0.9 when the windowed
/// conversation mentions any configured keyword of the intent, 0.1
/// otherwise. Lets pipeline tests run without model downloads.
pub struct KeywordScorer {
    models: Vec<String>,
    keywords: Vec<(String, Vec<String>)>,
}

impl KeywordScorer {
    /// One mock model wired to the keyword lists from `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            models: vec!["mock-model".to_string()],
            keywords: settings
                .allowed_intents
                .iter()
                .map(|intent| (intent.clone(), settings.keywords_for(intent).to_vec()))
                .collect(),
        }
    }
}

impl IntentScorer for KeywordScorer {
    fn model_ids(&self) -> Vec<String> {
        self.models.clone()
    }

    fn score(
        &self,
        _model_index: usize,
        intent: &str,
        history: &str,
        last_message: &str,
    ) -> Result<f32, AppError> {
        let text = format!("{} {}", history, last_message);
        let hit = self
            .keywords
            .iter()
            .find(|(name, _)| name == intent)
            .map(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw.as_str())))
            .unwrap_or(false);
        Ok(if hit { 0.9 } else { 0.1 })
    }
}
