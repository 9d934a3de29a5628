// src/services/stress.rs
use std::sync::Arc;

use chrono::Local;

use crate::message::ChatResponse;
use crate::services::biometric_classifier::{self, BiometricClassifier, BiometricSample};
use crate::services::responder::ResponseGenerator;
use crate::services::text_classifier::{self, TextClassifier};

pub const STRESSED_CONTEXT: &str = "The user seems stressed. Respond with empathy and suggest relaxing activities or supportive words.";
pub const NEUTRAL_CONTEXT: &str = "Respond naturally to the following message.";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressAssessment {
    pub text_stressed: bool,
    pub biometric_stressed: bool,
    pub overall_stressed: bool,
}

impl StressAssessment {
    pub fn new(text_stressed: bool, biometric_stressed: bool) -> Self {
        Self {
            text_stressed,
            biometric_stressed,
            overall_stressed: text_stressed || biometric_stressed,
        }
    }
}

pub fn context_for(overall_stressed: bool) -> &'static str {
    if overall_stressed {
        STRESSED_CONTEXT
    } else {
        NEUTRAL_CONTEXT
    }
}

/// Owns the loaded classifiers and the reply backend. Built once at startup
/// and shared read-only across requests.
#[derive(Clone)]
pub struct StressChatService {
    text: Arc<dyn TextClassifier>,
    biometric: Arc<dyn BiometricClassifier>,
    generator: Arc<dyn ResponseGenerator>,
    sample: BiometricSample,
    stress_label: String,
}

impl StressChatService {
    pub fn new(
        text: Arc<dyn TextClassifier>,
        biometric: Arc<dyn BiometricClassifier>,
        generator: Arc<dyn ResponseGenerator>,
    ) -> Self {
        Self {
            text,
            biometric,
            generator,
            sample: BiometricSample::default(),
            stress_label: "LABEL_1".to_string(),
        }
    }

    pub fn with_sample(mut self, sample: BiometricSample) -> Self {
        self.sample = sample;
        self
    }

    pub fn with_stress_label(mut self, label: impl Into<String>) -> Self {
        self.stress_label = label.into();
        self
    }

    /// A failed inference counts as not stressed so the reply still goes out.
    pub fn text_stressed(&self, message: &str) -> bool {
        match self.text.classify(message) {
            Ok(scores) => text_classifier::is_stressed(&scores, &self.stress_label),
            Err(e) => {
                tracing::warn!(error = %e, "text stress classification failed");
                false
            }
        }
    }

    /// Scores the configured sample; nothing from the request is used.
    pub fn biometric_stressed(&self) -> bool {
        let predictions = self.biometric.predict(&[self.sample.features()]);
        biometric_classifier::is_stressed(&predictions)
    }

    pub fn assess(&self, message: &str) -> StressAssessment {
        StressAssessment::new(self.text_stressed(message), self.biometric_stressed())
    }

    /// Never fails: a backend error is reported as the reply text.
    pub async fn handle(&self, message: &str) -> ChatResponse {
        let assessment = self.assess(message);
        tracing::debug!(
            text = assessment.text_stressed,
            smartwatch = assessment.biometric_stressed,
            overall = assessment.overall_stressed,
            "stress assessed"
        );

        let context = context_for(assessment.overall_stressed);
        let response = match self.generator.generate(context, message).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "response generation failed");
                format!("Error: {e}")
            }
        };

        ChatResponse {
            timestamp: Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string(),
            response,
            stress_detected_text: assessment.text_stressed,
            stress_detected_smartwatch: assessment.biometric_stressed,
            overall_stress_detected: assessment.overall_stressed,
        }
    }
}
