//! Intent selection across the candidate-intent × model grid.

use crate::engine::scorer::IntentScorer;
use crate::error::AppError;
use crate::models::ScoredIntent;
use tracing::{debug, warn};

/// Scores every candidate intent with every loaded model and returns the
/// winner.
///
/// The per-intent aggregate is the arithmetic mean of the successful model
/// votes for that intent; a failed forward pass is an omitted vote, not a
/// zero. The winning intent is the argmax of the aggregates; equal
/// aggregates resolve to whichever intent is configured earlier.
///
/// Fails with `EngineNotLoaded` when no model is loaded, and with
/// `Inference` when every (intent, model) pair failed; a conversation
/// never gets a fabricated prediction.
pub fn select(
    scorer: &dyn IntentScorer,
    intents: &[String],
    history: &str,
    last_message: &str,
) -> Result<ScoredIntent, AppError> {
    let model_ids = scorer.model_ids();
    if model_ids.is_empty() {
        return Err(AppError::EngineNotLoaded);
    }
    if intents.is_empty() {
        return Err(AppError::Config("No candidate intents configured".into()));
    }

    let mut aggregates: Vec<ScoredIntent> = Vec::with_capacity(intents.len());

    for intent in intents {
        let mut votes: Vec<f32> = Vec::with_capacity(model_ids.len());

        for (model_index, model_id) in model_ids.iter().enumerate() {
            match scorer.score(model_index, intent, history, last_message) {
                Ok(confidence) => {
                    debug!(intent = %intent, model = %model_id, confidence, "Model vote");
                    votes.push(confidence);
                }
                Err(e) => {
                    warn!(
                        intent = %intent,
                        model = %model_id,
                        error = %e,
                        "Model vote failed; omitting it from the aggregate"
                    );
                }
            }
        }

        if !votes.is_empty() {
            let confidence = votes.iter().sum::<f32>() / votes.len() as f32;
            aggregates.push(ScoredIntent {
                intent: intent.clone(),
                confidence,
            });
        }
    }

    if aggregates.is_empty() {
        return Err(AppError::Inference(
            "Every (intent, model) scoring attempt failed".into(),
        ));
    }

    // Strict comparison keeps ties on the earlier configured intent.
    let mut best = aggregates[0].clone();
    for candidate in &aggregates[1..] {
        if candidate.confidence > best.confidence {
            best = candidate.clone();
        }
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Deterministic scorer keyed by (model index, intent).
    struct FixedScorer {
        models: Vec<String>,
        scores: HashMap<(usize, String), Result<f32, String>>,
    }

    impl FixedScorer {
        fn new(model_count: usize) -> Self {
            Self {
                models: (0..model_count).map(|i| format!("model-{}", i)).collect(),
                scores: HashMap::new(),
            }
        }

        fn with_score(mut self, model: usize, intent: &str, score: f32) -> Self {
            self.scores.insert((model, intent.to_string()), Ok(score));
            self
        }

        fn with_failure(mut self, model: usize, intent: &str) -> Self {
            self.scores
                .insert((model, intent.to_string()), Err("boom".to_string()));
            self
        }
    }

    impl IntentScorer for FixedScorer {
        fn model_ids(&self) -> Vec<String> {
            self.models.clone()
        }

        fn score(
            &self,
            model_index: usize,
            intent: &str,
            _history: &str,
            _last_message: &str,
        ) -> Result<f32, AppError> {
            match self.scores.get(&(model_index, intent.to_string())) {
                Some(Ok(score)) => Ok(*score),
                Some(Err(msg)) => Err(AppError::Inference(msg.clone())),
                None => Ok(0.0),
            }
        }
    }

    fn intents(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_aggregate_is_mean_of_model_votes() {
        let scorer = FixedScorer::new(2)
            .with_score(0, "Support Request", 0.9)
            .with_score(1, "Support Request", 0.4);
        let best = select(&scorer, &intents(&["Support Request"]), "", "user: help").unwrap();
        assert_eq!(best.intent, "Support Request");
        assert!((best.confidence - 0.65).abs() < 1e-6);
    }

    #[test]
    fn test_failed_vote_is_omitted_not_zeroed() {
        let scorer = FixedScorer::new(2)
            .with_score(0, "Follow-Up", 0.8)
            .with_failure(1, "Follow-Up");
        let best = select(&scorer, &intents(&["Follow-Up"]), "", "user: any news").unwrap();
        assert!((best.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_tie_resolves_to_earlier_configured_intent() {
        let scorer = FixedScorer::new(1)
            .with_score(0, "Product Inquiry", 0.7)
            .with_score(0, "Follow-Up", 0.7);
        let best = select(
            &scorer,
            &intents(&["Product Inquiry", "Follow-Up"]),
            "",
            "user: hi",
        )
        .unwrap();
        assert_eq!(best.intent, "Product Inquiry");
    }

    #[test]
    fn test_no_models_is_engine_not_loaded() {
        let scorer = FixedScorer::new(0);
        let err = select(&scorer, &intents(&["Follow-Up"]), "", "user: hi").unwrap_err();
        assert!(matches!(err, AppError::EngineNotLoaded));
    }

    #[test]
    fn test_all_pairs_failing_surfaces_an_error() {
        let scorer = FixedScorer::new(1)
            .with_failure(0, "Follow-Up")
            .with_failure(0, "Support Request");
        let err = select(
            &scorer,
            &intents(&["Follow-Up", "Support Request"]),
            "",
            "user: hi",
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Inference(_)));
    }

    #[test]
    fn test_selection_is_deterministic() {
        let scorer = FixedScorer::new(2)
            .with_score(0, "A", 0.3)
            .with_score(1, "A", 0.5)
            .with_score(0, "B", 0.6)
            .with_score(1, "B", 0.2);
        let first = select(&scorer, &intents(&["A", "B"]), "h", "l").unwrap();
        let second = select(&scorer, &intents(&["A", "B"]), "h", "l").unwrap();
        assert_eq!(first, second);
    }
}
