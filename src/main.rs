use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use tracing_subscriber::EnvFilter;

use stress_chat_backend::{
    config::AppConfig,
    routes,
    services::{
        biometric_classifier::ForestModel, responder::OllamaClient, stress::StressChatService,
        text_classifier::OnnxTextClassifier,
    },
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let text_model = OnnxTextClassifier::load(&config.text_model_path)
        .context("failed to load text stress model")?;
    tracing::info!(
        path = %config.text_model_path.display(),
        labels = ?text_model.labels(),
        "text stress model loaded"
    );

    let forest = ForestModel::load(&config.biometric_model_path)
        .context("failed to load biometric stress model")?;
    tracing::info!(
        path = %config.biometric_model_path.display(),
        trees = forest.n_trees(),
        "biometric stress model loaded"
    );

    let sample = config.biometric_sample.unwrap_or_default();
    tracing::warn!(
        ?sample,
        "biometric stress is scored from a fixed sample, not from request data"
    );

    let generator = OllamaClient::new(&config.ollama_url, &config.ollama_model);
    tracing::info!(url = %config.ollama_url, model = generator.model(), "chat backend configured");

    let chat = StressChatService::new(Arc::new(text_model), Arc::new(forest), Arc::new(generator))
        .with_sample(sample)
        .with_stress_label(config.stress_label.clone());
    let state = Arc::new(AppState::new(chat));

    let origin = HeaderValue::from_str(&config.frontend_origin)
        .with_context(|| format!("invalid FRONTEND_ORIGIN {:?}", config.frontend_origin))?;

    let app = routes::create_router()
        .with_state(state)
        .layer(routes::cors_layer(origin));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("stress-aware chat backend running at http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
