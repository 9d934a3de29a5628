// src/state.rs
use std::sync::Arc;

use crate::services::stress::StressChatService;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub chat: StressChatService,
}

impl AppState {
    pub fn new(chat: StressChatService) -> Self {
        Self { chat }
    }
}
