//! Multi-model zero-shot scorer.
//!
//! Holds a fixed set of (tokenizer, sequence-classification model) pairs
//! loaded once at startup from the HuggingFace Hub. Each `score` call
//! phrases the candidate intent as a natural-language question (zero-shot
//! style), runs one forward pass, and returns the positive-class
//! probability. Supports both BERT and RoBERTa head naming conventions.

use crate::engine::prompt::build_zero_shot_prompt;
use crate::error::AppError;
use crate::fs_manager::PortablePathManager;
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::sync::ApiBuilder;
use std::sync::Mutex;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::info;

/// Token budget per prompt; longer inputs are truncated.
pub const MAX_TOKEN_LENGTH: usize = 512;

/// Logit index of the positive/entailment class.
const POSITIVE_CLASS: usize = 1;

/// Scoring seam between the selector and the loaded models. The
/// production implementation is [`ZeroShotScorer`]; tests substitute
/// deterministic scorers.
pub trait IntentScorer: Send + Sync {
    /// Identifiers of the loaded models, in load order.
    fn model_ids(&self) -> Vec<String>;

    /// Confidence in [0, 1] that the conversation expresses `intent`,
    /// according to the model at `model_index`. A failed forward pass is
    /// an `Inference` error handled per (intent, model) pair by the
    /// caller.
    fn score(
        &self,
        model_index: usize,
        intent: &str,
        history: &str,
        last_message: &str,
    ) -> Result<f32, AppError>;
}

/// One loaded tokenizer/model pair with its classification heads.
struct LoadedModel {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

/// A loaded model behind its serialization lock. Weights are read-only
/// after load, but the model object is not proven safe for concurrent
/// forward passes, so passes through one model never overlap.
struct ModelSlot {
    id: String,
    inner: Mutex<LoadedModel>,
}

/// Production scorer over candle sequence-classification models.
pub struct ZeroShotScorer {
    slots: Vec<ModelSlot>,
}

impl ZeroShotScorer {
    /// Loads every model in `model_ids`, in order. Loading is not atomic
    /// across the set: a failure part-way leaves earlier handles built,
    /// but the error propagates and callers abort startup by default.
    pub fn load(model_ids: &[String], prefer_cpu: bool) -> Result<Self, AppError> {
        if model_ids.is_empty() {
            return Err(AppError::Config("At least one model must be configured".into()));
        }

        let device = if prefer_cpu {
            Device::Cpu
        } else {
            Device::cuda_if_available(0)
                .map_err(|e| AppError::ModelLoad(format!("Device setup failed: {}", e)))?
        };

        let mut slots = Vec::with_capacity(model_ids.len());
        for id in model_ids {
            info!(model = %id, "Loading classification model");
            let loaded = LoadedModel::fetch(id, &device)?;
            slots.push(ModelSlot {
                id: id.clone(),
                inner: Mutex::new(loaded),
            });
            info!(model = %id, "Model loaded successfully");
        }

        Ok(Self { slots })
    }
}

impl IntentScorer for ZeroShotScorer {
    fn model_ids(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.id.clone()).collect()
    }

    fn score(
        &self,
        model_index: usize,
        intent: &str,
        history: &str,
        last_message: &str,
    ) -> Result<f32, AppError> {
        let slot = self.slots.get(model_index).ok_or_else(|| {
            AppError::Internal(format!("No model loaded at index {}", model_index))
        })?;
        let model = slot
            .inner
            .lock()
            .map_err(|_| AppError::Internal(format!("Model '{}' lock poisoned", slot.id)))?;

        let prompt = build_zero_shot_prompt(history, last_message, intent);
        model.score_prompt(&prompt)
    }
}

impl LoadedModel {
    /// Resolves a model id through the hub cache and materializes the
    /// tokenizer, transformer, and classification heads.
    fn fetch(model_id: &str, device: &Device) -> Result<Self, AppError> {
        let load_err =
            |what: &str, e: String| AppError::ModelLoad(format!("{} ({}): {}", what, model_id, e));

        let cache_dir = std::env::var("HF_HOME")
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|_| PortablePathManager::models_dir());

        let api = ApiBuilder::new()
            .with_cache_dir(cache_dir)
            .build()
            .map_err(|e| load_err("Hub API initialization failed", e.to_string()))?;
        let repo = api.model(model_id.to_string());

        let config_path = repo
            .get("config.json")
            .map_err(|e| load_err("Config download failed", e.to_string()))?;
        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| load_err("Config read failed", e.to_string()))?;
        let config: Config = serde_json::from_str(&config_str)
            .map_err(|e| load_err("Config parse failed", e.to_string()))?;
        let raw_config: serde_json::Value = serde_json::from_str(&config_str)
            .map_err(|e| load_err("Config parse failed", e.to_string()))?;

        let num_labels = num_labels_from_config(&raw_config);
        if num_labels < 2 {
            return Err(load_err(
                "Unsupported classification head",
                format!("{} labels, need at least 2", num_labels),
            ));
        }

        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| load_err("Tokenizer download failed", e.to_string()))?;
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| load_err("Tokenizer load failed", e.to_string()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKEN_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| load_err("Tokenizer truncation setup failed", e.to_string()))?;

        let weights_path = match repo.get("model.safetensors") {
            Ok(path) => path,
            Err(_) => repo
                .get("pytorch_model.bin")
                .map_err(|e| load_err("No model weights found", e.to_string()))?,
        };
        let use_pth = weights_path.extension().and_then(|s| s.to_str()) == Some("bin");

        let vb = if use_pth {
            VarBuilder::from_pth(&weights_path, DType::F32, device)
                .map_err(|e| load_err("Weights load failed", e.to_string()))?
        } else {
            unsafe {
                VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
                    .map_err(|e| load_err("Weights load failed", e.to_string()))?
            }
        };

        // RoBERTa checkpoints name the transformer "roberta" and fold the
        // pooler into the classification head; plain BERT keeps a separate
        // pooler. Try RoBERTa first, then fall back.
        let (bert, pooler, classifier) = match BertModel::load(vb.pp("roberta"), &config) {
            Ok(bert) => {
                let pooler = candle_nn::linear(
                    config.hidden_size,
                    config.hidden_size,
                    vb.pp("classifier").pp("dense"),
                )
                .map_err(|e| load_err("RoBERTa head load failed", e.to_string()))?;
                let classifier = candle_nn::linear(
                    config.hidden_size,
                    num_labels,
                    vb.pp("classifier").pp("out_proj"),
                )
                .map_err(|e| load_err("RoBERTa head load failed", e.to_string()))?;
                (bert, pooler, classifier)
            }
            Err(_) => {
                let bert = BertModel::load(vb.pp("bert"), &config)
                    .map_err(|e| load_err("Transformer load failed", e.to_string()))?;
                let pooler = candle_nn::linear(
                    config.hidden_size,
                    config.hidden_size,
                    vb.pp("bert").pp("pooler").pp("dense"),
                )
                .map_err(|e| load_err("BERT pooler load failed", e.to_string()))?;
                let classifier =
                    candle_nn::linear(config.hidden_size, num_labels, vb.pp("classifier"))
                        .map_err(|e| load_err("BERT head load failed", e.to_string()))?;
                (bert, pooler, classifier)
            }
        };

        Ok(Self {
            bert,
            pooler,
            classifier,
            tokenizer,
            device: device.clone(),
        })
    }

    /// Tokenizes one prompt and returns the positive-class probability
    /// from a single forward pass. Read-only with respect to the weights.
    fn score_prompt(&self, prompt: &str) -> Result<f32, AppError> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| AppError::Inference(format!("Tokenization failed: {}", e)))?;

        let token_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = token_ids.zeros_like()?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let sequence_output =
            self.bert
                .forward(&token_ids, &token_type_ids, Some(&attention_mask))?;

        // CLS pooling: first token -> linear -> tanh, then the head.
        let cls_token = sequence_output.i((.., 0))?;
        let pooled = self.pooler.forward(&cls_token)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;

        let probabilities = candle_nn::ops::softmax(&logits, 1)?.squeeze(0)?;
        let probabilities: Vec<f32> = probabilities.to_vec1()?;

        probabilities.get(POSITIVE_CLASS).copied().ok_or_else(|| {
            AppError::Inference(format!(
                "Classifier produced {} probabilities, expected at least {}",
                probabilities.len(),
                POSITIVE_CLASS + 1
            ))
        })
    }
}

/// Reads the label count from a raw HF config: `num_labels` when present,
/// the `id2label` map size otherwise, defaulting to binary.
fn num_labels_from_config(raw: &serde_json::Value) -> usize {
    if let Some(n) = raw.get("num_labels").and_then(|v| v.as_u64()) {
        return n as usize;
    }
    if let Some(map) = raw.get("id2label").and_then(|v| v.as_object()) {
        if !map.is_empty() {
            return map.len();
        }
    }
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_labels_explicit() {
        let raw = serde_json::json!({ "num_labels": 3 });
        assert_eq!(num_labels_from_config(&raw), 3);
    }

    #[test]
    fn test_num_labels_from_id2label() {
        let raw = serde_json::json!({
            "id2label": { "0": "CONTRADICTION", "1": "NEUTRAL", "2": "ENTAILMENT" }
        });
        assert_eq!(num_labels_from_config(&raw), 3);
    }

    #[test]
    fn test_num_labels_defaults_to_binary() {
        let raw = serde_json::json!({ "hidden_size": 768 });
        assert_eq!(num_labels_from_config(&raw), 2);
    }

    #[test]
    fn test_load_rejects_empty_model_list() {
        let err = ZeroShotScorer::load(&[], true).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
