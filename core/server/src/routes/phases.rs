use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use ryan_planner::PhaseDraft;
use ryan_schemas::{DependencyId, PhaseId, PhasePatch, PhaseStatus, ProjectId};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreatePhaseRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<PhaseStatus>,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateDependencyRequest {
    pub phase_id: Option<PhaseId>,
    pub depends_on_phase_id: Option<PhaseId>,
    pub dependency_type: Option<String>,
    pub notes: Option<String>,
}

pub async fn list_project_phases(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let phases = state.phases.list_for_project(&ProjectId(project_id))?;
    Ok(Json(json!({ "success": true, "phases": phases })))
}

pub async fn create_phase(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    payload: Result<Json<CreatePhaseRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let phase = state.phases.create(
        &ProjectId(project_id),
        PhaseDraft {
            name: request.name,
            description: request.description,
            status: request.status,
            sort_order: request.sort_order,
        },
    )?;
    Ok(Json(json!({ "success": true, "phase": phase })))
}

pub async fn update_phase(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PhasePatch>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(patch) = payload?;
    let phase = state.phases.update(&PhaseId(id), patch)?;
    Ok(Json(json!({ "success": true, "phase": phase })))
}

pub async fn delete_phase(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.phases.delete(&PhaseId(id))?;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_dependencies(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let dependencies = state.phases.dependencies(&PhaseId(id))?;
    Ok(Json(json!({ "success": true, "dependencies": dependencies })))
}

pub async fn create_dependency(
    State(state): State<AppState>,
    payload: Result<Json<CreateDependencyRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let dependency = state.phases.add_dependency(
        request.phase_id,
        request.depends_on_phase_id,
        request.dependency_type,
        request.notes,
    )?;
    Ok(Json(json!({ "success": true, "dependency": dependency })))
}

pub async fn delete_dependency(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.phases.remove_dependency(&DependencyId(id))?;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_blocked(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let blocked = state.phases.blocked()?;
    Ok(Json(json!({ "success": true, "blocked": blocked })))
}
