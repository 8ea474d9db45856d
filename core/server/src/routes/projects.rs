use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use ryan_planner::ProjectDraft;
use ryan_schemas::ProjectId;
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub parent_id: Option<ProjectId>,
    pub client_id: Option<String>,
    pub is_parent: Option<bool>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddPathRequest {
    pub path: Option<String>,
}

pub async fn list_projects(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let projects = state.projects.list()?;
    Ok(Json(json!({ "success": true, "projects": projects })))
}

pub async fn create_project(
    State(state): State<AppState>,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let project = state.projects.create(ProjectDraft {
        name: request.name,
        slug: request.slug,
        parent_id: request.parent_id,
        client_id: request.client_id,
        is_parent: request.is_parent,
        is_active: request.is_active,
        sort_order: request.sort_order,
    })?;
    Ok(Json(json!({ "success": true, "project": project })))
}

pub async fn add_project_path(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AddPathRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let paths = state.projects.add_path(&ProjectId(id), request.path)?;
    Ok(Json(json!({ "success": true, "paths": paths })))
}
