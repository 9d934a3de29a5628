// src/services/text_classifier.rs
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use ort::session::Session;
use ort::value::Tensor;
use serde::Deserialize;
use tokenizers::Tokenizer;

use crate::error::{InferenceError, ModelError};

pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const MODEL_FILE: &str = "model.onnx";

#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Maps free text to scored labels, best label first.
pub trait TextClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Vec<LabelScore>, InferenceError>;
}

/// True when the top label is the one designated as "stressed".
pub fn is_stressed(scores: &[LabelScore], stress_label: &str) -> bool {
    scores
        .first()
        .map(|top| top.label == stress_label)
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct ModelConfig {
    #[serde(default)]
    id2label: HashMap<String, String>,
}

/// Orders `id2label` by class index; every index below the label count must
/// be present exactly once.
fn labels_from_config(config: ModelConfig) -> Result<Vec<String>, String> {
    let n = config.id2label.len();
    if n == 0 {
        return Err("config has no id2label mapping".to_string());
    }

    let mut labels: Vec<Option<String>> = vec![None; n];
    for (id, label) in config.id2label {
        let idx = id
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("label id {id:?} is not a class index"))?;
        let slot = labels
            .get_mut(idx)
            .ok_or_else(|| format!("label id {idx} is out of range for {n} labels"))?;
        if slot.replace(label).is_some() {
            return Err(format!("label id {idx} is defined twice"));
        }
    }

    labels
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| "id2label has gaps".to_string())
}

fn softmax(logits: &[f32]) -> Vec<f64> {
    let logits: Vec<f64> = logits.iter().map(|l| f64::from(*l)).collect();
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Pairs logits with labels as probabilities, best first. Ties keep class order.
fn rank(labels: &[String], logits: &[f32]) -> Vec<LabelScore> {
    let mut scores: Vec<LabelScore> = labels
        .iter()
        .zip(softmax(logits))
        .map(|(label, score)| LabelScore {
            label: label.clone(),
            score,
        })
        .collect();
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    scores
}

/// Sequence-classification checkpoint exported to ONNX.
///
/// The model directory holds `config.json` (for `id2label`), `tokenizer.json`
/// and `model.onnx`, the layout a transformers ONNX export produces. The
/// session takes `input_ids` and `attention_mask` and yields `[1, labels]`
/// logits as its first output.
pub struct OnnxTextClassifier {
    labels: Vec<String>,
    tokenizer: Tokenizer,
    session: Mutex<Session>,
}

impl OnnxTextClassifier {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ModelError> {
        let dir = dir.as_ref();

        let config_path = dir.join(CONFIG_FILE);
        let raw = std::fs::read_to_string(&config_path).map_err(|source| ModelError::Io {
            path: config_path.clone(),
            source,
        })?;
        let config: ModelConfig =
            serde_json::from_str(&raw).map_err(|source| ModelError::Parse {
                path: config_path.clone(),
                source,
            })?;
        let labels = labels_from_config(config).map_err(|reason| ModelError::Invalid {
            path: config_path.clone(),
            reason,
        })?;

        let tokenizer_path = dir.join(TOKENIZER_FILE);
        let tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| ModelError::Tokenizer {
                path: tokenizer_path.clone(),
                reason: e.to_string(),
            })?;

        let model_path = dir.join(MODEL_FILE);
        if !model_path.is_file() {
            return Err(ModelError::Io {
                path: model_path,
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        let session = Session::builder()
            .map_err(|e| ModelError::Runtime {
                path: model_path.clone(),
                reason: e.to_string(),
            })?
            .commit_from_file(&model_path)
            .map_err(|e| ModelError::Runtime {
                path: model_path.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            labels,
            tokenizer,
            session: Mutex::new(session),
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl TextClassifier for OnnxTextClassifier {
    fn classify(&self, text: &str) -> Result<Vec<LabelScore>, InferenceError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| InferenceError::Tokenize(e.to_string()))?;
        let ids: Vec<i64> = encoding.get_ids().iter().map(|id| i64::from(*id)).collect();
        if ids.is_empty() {
            return Err(InferenceError::EmptyInput);
        }
        let mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|m| i64::from(*m))
            .collect();

        let len = ids.len();
        let input_ids = Tensor::from_array(([1usize, len], ids))
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;
        let attention_mask = Tensor::from_array(([1usize, len], mask))
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;

        let logits = {
            let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
            let outputs = session
                .run(ort::inputs![
                    "input_ids" => input_ids,
                    "attention_mask" => attention_mask,
                ])
                .map_err(|e| InferenceError::Runtime(e.to_string()))?;
            let (_, logits) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| InferenceError::Runtime(e.to_string()))?;
            logits.to_vec()
        };

        if logits.len() != self.labels.len() {
            return Err(InferenceError::Output(format!(
                "model produced {} logits for {} labels",
                logits.len(),
                self.labels.len()
            )));
        }
        Ok(rank(&self.labels, &logits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> ModelConfig {
        ModelConfig {
            id2label: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn labels_are_ordered_by_class_index() {
        let labels = labels_from_config(config(&[("1", "LABEL_1"), ("0", "LABEL_0")])).unwrap();
        assert_eq!(labels, ["LABEL_0", "LABEL_1"]);
    }

    #[test]
    fn label_gaps_and_bad_ids_are_rejected() {
        let err = labels_from_config(config(&[("0", "a"), ("2", "b")])).unwrap_err();
        assert!(err.contains("out of range"));

        let err = labels_from_config(config(&[("zero", "a")])).unwrap_err();
        assert!(err.contains("\"zero\""));

        let err = labels_from_config(config(&[("0", "a"), ("00", "b")])).unwrap_err();
        assert!(err.contains("twice"));

        assert!(labels_from_config(config(&[])).is_err());
    }

    #[test]
    fn rank_puts_highest_logit_first() {
        let labels = vec!["LABEL_0".to_string(), "LABEL_1".to_string()];
        let scores = rank(&labels, &[-0.7, 2.3]);
        assert_eq!(scores[0].label, "LABEL_1");
        assert!(is_stressed(&scores, "LABEL_1"));
        let total: f64 = scores.iter().map(|s| s.score).sum();
        assert!((total - 1.0).abs() < 1e-9);

        let calm = rank(&labels, &[1.5, -0.9]);
        assert!(!is_stressed(&calm, "LABEL_1"));
    }

    #[test]
    fn ties_keep_class_order() {
        let labels = vec!["LABEL_0".to_string(), "LABEL_1".to_string()];
        assert_eq!(rank(&labels, &[0.0, 0.0])[0].label, "LABEL_0");
    }

    #[test]
    fn empty_scores_are_not_stressed() {
        assert!(!is_stressed(&[], "LABEL_1"));
    }
}
