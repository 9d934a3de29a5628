// src/message.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub timestamp: String,
    pub response: String,
    pub stress_detected_text: bool,
    pub stress_detected_smartwatch: bool,
    pub overall_stress_detected: bool,
}
