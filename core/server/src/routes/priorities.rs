use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use ryan_planner::PrioritizationOutcome;
use serde_json::json;

use super::ok;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn prioritize(State(state): State<AppState>) -> ApiResult<Response> {
    let response = match state.prioritizer.prioritize_all().await? {
        PrioritizationOutcome::NoTodos => Json(json!({
            "success": true,
            "message": "No todos to prioritize"
        }))
        .into_response(),
        PrioritizationOutcome::Completed(report) => ok(report).into_response(),
    };
    Ok(response)
}

pub async fn priority_status(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let status = state.prioritizer.status()?;
    Ok(ok(status))
}

/// Advisory lookup; an unreadable roadmap yields an empty list
pub async fn project_blockers(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let blockers = state.prioritizer.blockers_for_project(&slug);
    Json(json!({
        "success": true,
        "project": slug,
        "blockers": blockers
    }))
}
