// src/error.rs
use std::path::PathBuf;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors surfaced to HTTP callers. Only request validation lands here;
/// everything past it is absorbed by the chat service.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::InvalidBody(rejection) => (rejection.status(), rejection.body_text()),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("model artifact {path} is malformed: {reason}")]
    Invalid { path: PathBuf, reason: String },
    #[error("failed to load tokenizer {path}: {reason}")]
    Tokenizer { path: PathBuf, reason: String },
    #[error("failed to start inference session for {path}: {reason}")]
    Runtime { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("tokenization failed: {0}")]
    Tokenize(String),
    #[error("message produced no tokens")]
    EmptyInput,
    #[error("inference failed: {0}")]
    Runtime(String),
    #[error("unexpected model output: {0}")]
    Output(String),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to reach chat backend: {0}")]
    Request(#[from] reqwest::Error),
    #[error("chat backend returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("chat backend reply could not be decoded: {0}")]
    Decode(String),
}

