use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    Json,
};
use ryan_planner::TradelineDraft;
use ryan_schemas::{TradelineId, TradelinePatch, TradelineRun, TradelineStatus};
use serde::Deserialize;
use serde_json::json;

use super::ok;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TradelineQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateTradelineRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub status: Option<TradelineStatus>,
    pub port_number: Option<i64>,
    pub server_path: Option<String>,
    pub droplet_ip: Option<String>,
    pub notes: Option<String>,
}

pub async fn list_tradelines(
    State(state): State<AppState>,
    Query(query): Query<TradelineQuery>,
) -> ApiResult<impl IntoResponse> {
    let status = query
        .status
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<TradelineStatus>())
        .transpose()?;

    let listing = state.tradelines.list(status)?;
    Ok(ok(listing))
}

pub async fn create_tradeline(
    State(state): State<AppState>,
    payload: Result<Json<CreateTradelineRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let tradeline = state.tradelines.create(TradelineDraft {
        name: request.name,
        slug: request.slug,
        status: request.status,
        port_number: request.port_number,
        server_path: request.server_path,
        droplet_ip: request.droplet_ip,
        notes: request.notes,
    })?;
    Ok(Json(json!({ "success": true, "tradeline": tradeline })))
}

pub async fn update_tradeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TradelinePatch>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(patch) = payload?;
    let tradeline = state.tradelines.update(&TradelineId(id), patch)?;
    Ok(Json(json!({ "success": true, "tradeline": tradeline })))
}

pub async fn record_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TradelineRun>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(run) = payload?;
    let tradeline = state.tradelines.record_run(&TradelineId(id), &run)?;
    Ok(Json(json!({ "success": true, "tradeline": tradeline })))
}
