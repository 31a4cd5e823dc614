//! Prompt templates endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::prompts::PromptSet;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/prompts", get(list_prompts))
}

/// Prompt files by name, as loaded at startup
async fn list_prompts(State(state): State<AppState>) -> Json<PromptSet> {
    Json(state.prompts().clone())
}
