use axum::{extract::State, response::IntoResponse, Json};
use ryan_store::now_timestamp;
use serde_json::json;

use crate::state::AppState;

pub const SERVICE_NAME: &str = "ryan";
pub const SERVICE_ROLE: &str = "Project Manager";

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "port": state.info.port,
        "role": SERVICE_ROLE,
        "timestamp": now_timestamp(),
        "peers": {
            "susan": state.info.susan_url,
            "clair": state.info.clair_url
        }
    }))
}
