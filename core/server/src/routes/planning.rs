use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Redirect},
    Json,
};
use ryan_schemas::PhaseId;
use serde::Deserialize;
use tracing::info;

use super::{ok, WHATS_NEXT_PATH};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    pub phase_id: Option<PhaseId>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FocusRequest {
    pub phase_id: Option<PhaseId>,
    pub rationale: Option<String>,
}

pub async fn whats_next(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let result = state.scorer.whats_next()?;
    Ok(ok(result))
}

/// Completes the phase (if any) and hands over to what's next with a 307,
/// so the follow-up keeps the POST method.
pub async fn complete(
    State(state): State<AppState>,
    payload: Result<Json<CompleteRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => CompleteRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };

    if let Some(notes) = request.notes.as_deref().filter(|n| !n.is_empty()) {
        info!("Completion notes: {}", notes);
    }
    state.focus.complete(request.phase_id.as_ref())?;

    Ok(Redirect::temporary(WHATS_NEXT_PATH))
}

pub async fn set_focus(
    State(state): State<AppState>,
    payload: Result<Json<FocusRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let phase_id = request
        .phase_id
        .ok_or_else(|| ApiError::bad_request("phase_id is required"))?;

    let outcome = state
        .focus
        .set_focus(&phase_id, request.rationale.as_deref())?;
    Ok(ok(outcome))
}

pub async fn briefing(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let briefing = state.briefing.build()?;
    Ok(ok(briefing))
}

pub async fn status(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let rollup = state.status.snapshot()?;
    Ok(ok(rollup))
}
