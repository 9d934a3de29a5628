// src/config.rs
use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::services::biometric_classifier::BiometricSample;

pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub frontend_origin: String,
    /// Directory holding `config.json`, `tokenizer.json` and `model.onnx`.
    pub text_model_path: PathBuf,
    pub biometric_model_path: PathBuf,
    pub stress_label: String,
    pub ollama_url: String,
    pub ollama_model: String,
    /// `None` means the built-in sample is scored.
    pub biometric_sample: Option<BiometricSample>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to
    /// touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: "PORT",
                value: value.clone(),
                reason: e.to_string(),
            })?,
            None => 8000,
        };

        let text_model_path = lookup("TEXT_MODEL_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("TEXT_MODEL_PATH"))?;

        let biometric_model_path = lookup("BIOMETRIC_MODEL_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("BIOMETRIC_MODEL_PATH"))?;

        let biometric_sample = lookup("BIOMETRIC_SAMPLE")
            .map(|value| {
                value.parse::<BiometricSample>().map_err(|reason| ConfigError::Invalid {
                    var: "BIOMETRIC_SAMPLE",
                    value: value.clone(),
                    reason,
                })
            })
            .transpose()?;

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            frontend_origin: lookup("FRONTEND_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3001".to_string()),
            text_model_path,
            biometric_model_path,
            stress_label: lookup("STRESS_LABEL").unwrap_or_else(|| "LABEL_1".to_string()),
            ollama_url: lookup("OLLAMA_URL")
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            ollama_model: lookup("OLLAMA_MODEL").unwrap_or_else(|| "llama3.2".to_string()),
            biometric_sample,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
