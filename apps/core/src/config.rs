//! Runtime configuration.
//!
//! Settings are resolved once at startup from built-in defaults, then an
//! optional JSON settings file, then environment overrides (a `.env` file
//! is honored via `dotenv`), and passed around behind an `Arc` for the
//! lifetime of the process. Nothing mutates them after load.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix for all environment overrides.
const ENV_PREFIX: &str = "INTENTCAST_";

/// Immutable process-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HuggingFace model identifiers loaded into the scorer, in load order.
    pub models: Vec<String>,
    /// Allowed final intents. Order defines iteration order and tie-break
    /// priority in the selector.
    pub allowed_intents: Vec<String>,
    /// Per-intent keyword lists used by the rationale generator. Every key
    /// must be a member of `allowed_intents`.
    pub intent_keywords: HashMap<String, Vec<String>>,
    /// Number of trailing messages the windower keeps.
    pub max_history_turns: usize,
    /// Below this confidence the rationale carries a low-confidence note
    /// instead of keyword evidence.
    pub confidence_threshold: f32,
    /// When false, rationales collapse to the generic fallback.
    pub rationale_enabled: bool,
    /// Upper bound on conversations classified concurrently.
    pub max_concurrency: usize,
    /// Per-conversation classification deadline.
    pub conversation_timeout_secs: u64,
    /// Force CPU inference even when CUDA is available.
    pub prefer_cpu: bool,
    /// Directory for JSON/CSV/zip result files.
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut intent_keywords = HashMap::new();
        intent_keywords.insert(
            "Book Appointment".to_string(),
            str_vec(&[
                "schedule",
                "appointment",
                "visit",
                "viewing",
                "tour",
                "meet",
                "book",
                "come see",
            ]),
        );
        intent_keywords.insert(
            "Product Inquiry".to_string(),
            str_vec(&[
                "looking for",
                "need",
                "bhk",
                "property",
                "details",
                "specifications",
                "tell me about",
            ]),
        );
        intent_keywords.insert(
            "Pricing Negotiation".to_string(),
            str_vec(&[
                "budget",
                "price",
                "cost",
                "negotiate",
                "discount",
                "max",
                "afford",
                "deal",
            ]),
        );
        intent_keywords.insert(
            "Support Request".to_string(),
            str_vec(&[
                "issue",
                "problem",
                "help",
                "support",
                "not working",
                "error",
                "fix",
                "urgent",
            ]),
        );
        intent_keywords.insert(
            "Follow-Up".to_string(),
            str_vec(&[
                "following up",
                "update",
                "status",
                "waiting",
                "checking in",
                "any news",
                "previously",
            ]),
        );

        Self {
            models: str_vec(&["roberta-large-mnli", "microsoft/deberta-base"]),
            allowed_intents: str_vec(&[
                "Book Appointment",
                "Product Inquiry",
                "Pricing Negotiation",
                "Support Request",
                "Follow-Up",
            ]),
            intent_keywords,
            max_history_turns: 5,
            confidence_threshold: 0.5,
            rationale_enabled: true,
            max_concurrency: num_cpus::get(),
            conversation_timeout_secs: 30,
            prefer_cpu: false,
            output_dir: None,
        }
    }
}

fn str_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Settings {
    /// Resolves the settings: defaults, then `path` (JSON) if given, then
    /// environment overrides. Validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        // Load a .env file into the environment if one is present.
        dotenv::dotenv().ok();

        let mut settings = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p).map_err(|e| {
                    AppError::Config(format!("Cannot read settings file {:?}: {}", p, e))
                })?;
                serde_json::from_str::<Settings>(&raw).map_err(|e| {
                    AppError::Config(format!("Cannot parse settings file {:?}: {}", p, e))
                })?
            }
            None => Settings::default(),
        };

        settings.apply_env_overrides();
        settings.validate()?;

        info!(
            models = settings.models.len(),
            intents = settings.allowed_intents.len(),
            max_history_turns = settings.max_history_turns,
            "Settings resolved"
        );
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(models) = env::var(format!("{}MODELS", ENV_PREFIX)) {
            let parsed: Vec<String> = models
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !parsed.is_empty() {
                self.models = parsed;
            }
        }
        if let Ok(turns) = env::var(format!("{}MAX_HISTORY_TURNS", ENV_PREFIX)) {
            if let Ok(turns) = turns.parse() {
                self.max_history_turns = turns;
            }
        }
        if let Ok(threshold) = env::var(format!("{}CONFIDENCE_THRESHOLD", ENV_PREFIX)) {
            if let Ok(threshold) = threshold.parse() {
                self.confidence_threshold = threshold;
            }
        }
        if let Ok(enabled) = env::var(format!("{}RATIONALE_ENABLED", ENV_PREFIX)) {
            if let Ok(enabled) = enabled.parse() {
                self.rationale_enabled = enabled;
            }
        }
        if let Ok(cpu) = env::var(format!("{}PREFER_CPU", ENV_PREFIX)) {
            if let Ok(cpu) = cpu.parse() {
                self.prefer_cpu = cpu;
            }
        }
        if let Ok(dir) = env::var(format!("{}OUTPUT_DIR", ENV_PREFIX)) {
            if !dir.is_empty() {
                self.output_dir = Some(PathBuf::from(dir));
            }
        }
    }

    /// Checks internal coherence. Called by `load`, and again by preflight.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.models.is_empty() {
            return Err(AppError::Config("At least one model must be configured".into()));
        }
        if self.allowed_intents.is_empty() {
            return Err(AppError::Config("At least one intent must be configured".into()));
        }
        for intent in self.intent_keywords.keys() {
            if !self.allowed_intents.iter().any(|i| i == intent) {
                return Err(AppError::Config(format!(
                    "Keyword list references unknown intent '{}'",
                    intent
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(AppError::Config(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.max_history_turns == 0 {
            return Err(AppError::Config("max_history_turns must be at least 1".into()));
        }
        if self.max_concurrency == 0 {
            return Err(AppError::Config("max_concurrency must be at least 1".into()));
        }
        Ok(())
    }

    /// Keyword list for an intent; intents without configured keywords
    /// simply have no evidence vocabulary.
    pub fn keywords_for(&self, intent: &str) -> &[String] {
        self.intent_keywords
            .get(intent)
            .map(|k| k.as_slice())
            .unwrap_or(&[])
    }
}
