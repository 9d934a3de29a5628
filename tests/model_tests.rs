use stress_chat_backend::error::ModelError;
use stress_chat_backend::services::biometric_classifier::{
    self, BiometricClassifier, BiometricSample, ForestModel,
};
use stress_chat_backend::services::text_classifier::{
    CONFIG_FILE, MODEL_FILE, OnnxTextClassifier, TOKENIZER_FILE,
};

use std::io::Write;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};

const GPT2_CONFIG: &str = r#"{
    "architectures": ["GPT2ForSequenceClassification"],
    "model_type": "gpt2",
    "id2label": { "0": "LABEL_0", "1": "LABEL_1" },
    "label2id": { "LABEL_0": 0, "LABEL_1": 1 }
}"#;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn temp_json(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn model_dir(config: Option<&str>, with_tokenizer: bool) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    if let Some(config) = config {
        std::fs::write(dir.path().join(CONFIG_FILE), config).unwrap();
    }
    if with_tokenizer {
        std::fs::copy(fixture("tokenizer.json"), dir.path().join(TOKENIZER_FILE)).unwrap();
    }
    dir
}

fn load_error(dir: &TempDir) -> ModelError {
    match OnnxTextClassifier::load(dir.path()) {
        Ok(_) => panic!("model directory unexpectedly loaded"),
        Err(e) => e,
    }
}

#[test]
fn test_text_model_without_config_fails_to_load() {
    let dir = model_dir(None, true);
    match load_error(&dir) {
        ModelError::Io { path, .. } => assert!(path.ends_with(CONFIG_FILE)),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_text_model_config_must_parse_and_map_labels() {
    let dir = model_dir(Some("{ not json"), true);
    assert!(matches!(load_error(&dir), ModelError::Parse { .. }));

    let dir = model_dir(Some(r#"{ "model_type": "gpt2" }"#), true);
    let err = load_error(&dir);
    assert!(matches!(err, ModelError::Invalid { .. }));
    assert!(err.to_string().contains("id2label"));
}

#[test]
fn test_text_model_without_tokenizer_fails_to_load() {
    let dir = model_dir(Some(GPT2_CONFIG), false);
    match load_error(&dir) {
        ModelError::Tokenizer { path, .. } => assert!(path.ends_with(TOKENIZER_FILE)),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_text_model_without_onnx_graph_fails_to_load() {
    let dir = model_dir(Some(GPT2_CONFIG), true);
    match load_error(&dir) {
        ModelError::Io { path, .. } => assert!(path.ends_with(MODEL_FILE)),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_forest_model_scores_default_sample_as_calm() {
    let model = ForestModel::load(fixture("forest_model.json")).unwrap();
    assert_eq!(model.n_trees(), 3);

    let predictions = model.predict(&[BiometricSample::default().features()]);
    assert_eq!(predictions, vec![0.0]);
    assert!(!biometric_classifier::is_stressed(&predictions));
}

#[test]
fn test_forest_model_flags_aroused_sample() {
    let model = ForestModel::load(fixture("forest_model.json")).unwrap();
    let sample: BiometricSample = "0.1, 0.2, 0.1, 0.9, 3.0, 35.5".parse().unwrap();

    let proba = model.predict_proba(&sample.features());
    assert!(proba[1] > 0.8);
    assert!(biometric_classifier::is_stressed(
        &model.predict(&[sample.features()])
    ));
}

#[test]
fn test_missing_forest_fails_to_load() {
    let err = ForestModel::load(fixture("does_not_exist.json")).unwrap_err();
    assert!(matches!(err, ModelError::Io { .. }));
}

#[test]
fn test_malformed_forest_is_reported() {
    let file = temp_json("{ not json");
    let err = ForestModel::load(file.path()).unwrap_err();
    assert!(matches!(err, ModelError::Parse { .. }));

    let file = temp_json(r#"{ "classes": [0, 1], "n_features": 6, "trees": [] }"#);
    let err = ForestModel::load(file.path()).unwrap_err();
    assert!(matches!(err, ModelError::Invalid { .. }));
    assert!(err.to_string().contains("no trees"));
}
