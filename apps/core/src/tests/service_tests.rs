//! Batch Orchestration Tests
//!
//! Verifies partial-failure semantics: bad conversations become failure
//! records, good ones are classified, and nothing is silently dropped.

use crate::config::Settings;
use crate::engine::ClassificationEngine;
use crate::models::{Conversation, Message};
use crate::service::{BatchRunner, ConversationClassifier};
use crate::tests::KeywordScorer;
use std::sync::Arc;

fn runner() -> BatchRunner {
    let settings = Arc::new(Settings::default());
    let scorer = Box::new(KeywordScorer::from_settings(&settings));
    let engine = Arc::new(ClassificationEngine::new(scorer, settings));
    BatchRunner::new(engine)
}

fn conversation(id: &str, texts: &[&str]) -> Conversation {
    Conversation {
        conversation_id: id.to_string(),
        messages: texts
            .iter()
            .map(|text| Message {
                sender: "user".to_string(),
                text: text.to_string(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod batch_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_conversation_is_skipped_batch_continues() {
        let runner = runner();
        let batch = vec![
            conversation("c1", &["I want to schedule a viewing"]),
            conversation("c2", &[]),
            conversation("c3", &["Any update on my request, just checking in"]),
        ];

        let outcome = runner.classify_batch(batch).await;

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].conversation_id, "c2");
        assert!(outcome.failures[0].reason.contains("no messages"));
    }

    #[tokio::test]
    async fn test_every_conversation_is_accounted_for() {
        let runner = runner();
        let batch: Vec<Conversation> = (0..12)
            .map(|i| {
                if i % 4 == 3 {
                    conversation(&format!("c{}", i), &[])
                } else {
                    conversation(&format!("c{}", i), &["what is the price"])
                }
            })
            .collect();
        let total = batch.len();

        let outcome = runner.classify_batch(batch).await;
        assert_eq!(outcome.results.len() + outcome.failures.len(), total);
    }

    #[tokio::test]
    async fn test_results_preserve_input_order() {
        let runner = runner();
        let batch = vec![
            conversation("first", &["schedule a viewing please"]),
            conversation("second", &["is there a discount on the price"]),
            conversation("third", &["i have an issue, need support"]),
        ];

        let outcome = runner.classify_batch(batch).await;
        let ids: Vec<&str> = outcome
            .results
            .iter()
            .map(|r| r.conversation_id.as_str())
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_blank_conversation_id_becomes_failure_record() {
        let runner = runner();
        let batch = vec![
            conversation("", &["hello there"]),
            conversation("ok", &["schedule a tour"]),
        ];

        let outcome = runner.classify_batch(batch).await;
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].conversation_id, "ok");
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].reason.contains("Validation"));
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_processed_independently() {
        let runner = runner();
        let batch = vec![
            conversation("dup", &["schedule a viewing"]),
            conversation("dup", &["any news, checking in"]),
        ];

        let outcome = runner.classify_batch(batch).await;
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].predicted_intent, "Book Appointment");
        assert_eq!(outcome.results[1].predicted_intent, "Follow-Up");
    }

    #[tokio::test]
    async fn test_empty_batch_yields_empty_outcome() {
        let runner = runner();
        let outcome = runner.classify_batch(Vec::new()).await;
        assert!(outcome.results.is_empty());
        assert!(outcome.failures.is_empty());
    }
}
