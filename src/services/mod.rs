pub mod biometric_classifier;
pub mod responder;
pub mod stress;
pub mod text_classifier;
