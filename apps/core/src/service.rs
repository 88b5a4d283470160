//! Batch orchestration.
//!
//! `BatchRunner` fans a batch of conversations out over a bounded worker
//! pool, isolates per-conversation failures, and guarantees that every
//! input conversation ends up with either a result or a recorded failure
//! reason.

use crate::engine::ClassificationEngine;
use crate::error::AppError;
use crate::models::{BatchOutcome, Conversation, FailureRecord};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

/// The service seam the HTTP boundary and the CLI talk to. Production
/// implementation is [`BatchRunner`]; tests substitute lightweight fakes.
#[async_trait]
pub trait ConversationClassifier: Send + Sync {
    /// Classifies a whole batch; never fails as a whole, since
    /// per-conversation errors become failure records.
    async fn classify_batch(&self, conversations: Vec<Conversation>) -> BatchOutcome;

    /// The configured allowed-intent list, in order.
    fn intents(&self) -> Vec<String>;

    /// Identifiers of the loaded models.
    fn model_ids(&self) -> Vec<String>;
}

/// Production batch orchestrator over a loaded [`ClassificationEngine`].
pub struct BatchRunner {
    engine: Arc<ClassificationEngine>,
    limiter: Arc<Semaphore>,
    deadline: Duration,
}

impl BatchRunner {
    pub fn new(engine: Arc<ClassificationEngine>) -> Self {
        let settings = engine.settings();
        let limiter = Arc::new(Semaphore::new(settings.max_concurrency));
        let deadline = Duration::from_secs(settings.conversation_timeout_secs);
        Self {
            engine,
            limiter,
            deadline,
        }
    }
}

#[async_trait]
impl ConversationClassifier for BatchRunner {
    async fn classify_batch(&self, conversations: Vec<Conversation>) -> BatchOutcome {
        let batch_id = Uuid::new_v4();
        info!(%batch_id, count = conversations.len(), "Classifying batch");

        let tasks = conversations.into_iter().map(|conversation| {
            let engine = Arc::clone(&self.engine);
            let limiter = Arc::clone(&self.limiter);
            let deadline = self.deadline;

            async move {
                let conversation_id = conversation.conversation_id.clone();

                let permit = match limiter.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            conversation_id,
                            Err(AppError::Internal("Worker pool closed".into())),
                        )
                    }
                };

                // The permit travels into the blocking closure so a slot
                // only frees up when the forward passes actually finish,
                // even if the deadline fired first.
                let outcome = timeout(
                    deadline,
                    tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        engine.classify(&conversation)
                    }),
                )
                .await;

                let result = match outcome {
                    Err(elapsed) => Err(AppError::from(elapsed)),
                    Ok(Err(join_error)) => Err(AppError::Internal(format!(
                        "Classification task failed: {}",
                        join_error
                    ))),
                    Ok(Ok(result)) => result,
                };

                (conversation_id, result)
            }
        });

        let settled = futures::future::join_all(tasks).await;

        let mut outcome = BatchOutcome::default();
        for (conversation_id, result) in settled {
            match result {
                Ok(result) => outcome.results.push(result),
                Err(error) => {
                    warn!(%conversation_id, %error, "Conversation skipped");
                    outcome.failures.push(FailureRecord {
                        conversation_id,
                        reason: error.to_string(),
                    });
                }
            }
        }

        info!(
            %batch_id,
            results = outcome.results.len(),
            failures = outcome.failures.len(),
            "Batch classification complete"
        );
        outcome
    }

    fn intents(&self) -> Vec<String> {
        self.engine.settings().allowed_intents.clone()
    }

    fn model_ids(&self) -> Vec<String> {
        self.engine.model_ids()
    }
}

/// Parses a raw batch document into conversations. Used by both the CLI
/// and the upload endpoint; an unparsable document rejects the whole batch
/// before any model work begins.
pub fn parse_batch(data: &[u8]) -> Result<Vec<Conversation>, AppError> {
    serde_json::from_slice::<Vec<Conversation>>(data)
        .map_err(|_| AppError::MalformedInput("Invalid JSON format".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_accepts_conversation_array() {
        let raw = br#"[
            {"conversation_id": "c1", "messages": [{"sender": "user", "text": "hi"}]},
            {"conversation_id": "c2", "messages": []}
        ]"#;
        let conversations = parse_batch(raw).unwrap();
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].conversation_id, "c1");
    }

    #[test]
    fn test_parse_batch_rejects_non_array_documents() {
        let err = parse_batch(b"{\"not\": \"a batch\"}").unwrap_err();
        assert!(matches!(err, AppError::MalformedInput(_)));
    }

    #[test]
    fn test_parse_batch_rejects_invalid_json() {
        let err = parse_batch(b"not json at all").unwrap_err();
        assert!(matches!(err, AppError::MalformedInput(_)));
    }
}
