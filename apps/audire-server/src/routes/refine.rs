//! Retry refinement for individual findings

use std::collections::HashMap;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::findings::{collapse_whitespace, Finding, FindingsMap};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct RefineRequest {
    /// Finding id to original text
    pub findings: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefineResponse {
    pub findings_map: FindingsMap,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/refine-findings", post(refine_findings))
}

async fn refine_findings(
    State(state): State<AppState>,
    Json(request): Json<RefineRequest>,
) -> Result<Json<RefineResponse>> {
    let mut findings: FindingsMap = request
        .findings
        .into_iter()
        .map(|(id, original)| {
            let finding = Finding::new(id.clone(), collapse_whitespace(&original));
            (id, finding)
        })
        .collect();

    let summary = state.orchestrator().refine_all(&mut findings).await?;
    tracing::debug!(refined = summary.refined, failed = summary.failed, "Refinement retry");

    Ok(Json(RefineResponse {
        findings_map: findings,
    }))
}
