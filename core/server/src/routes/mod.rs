pub mod health;
pub mod phases;
pub mod planning;
pub mod priorities;
pub mod projects;
pub mod tradelines;

use axum::{
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Serialize;

use crate::state::AppState;

pub const WHATS_NEXT_PATH: &str = "/api/whats-next";

/// Success body: `{ "success": true, ...fields }`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

pub fn ok<T: Serialize>(body: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        body,
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        // Recommendation and focus
        .route(
            WHATS_NEXT_PATH,
            get(planning::whats_next).post(planning::whats_next),
        )
        .route("/api/complete", post(planning::complete))
        .route("/api/focus", post(planning::set_focus))
        .route("/api/briefing", get(planning::briefing))
        .route("/api/status", get(planning::status))
        // Projects
        .route("/api/projects", get(projects::list_projects))
        .route("/api/project", post(projects::create_project))
        .route("/api/project/:id/path", post(projects::add_project_path))
        // Phases and dependencies
        .route("/api/project/:id/phases", get(phases::list_project_phases))
        .route("/api/project/:id/phase", post(phases::create_phase))
        .route(
            "/api/phase/:id",
            patch(phases::update_phase).delete(phases::delete_phase),
        )
        .route("/api/phase/:id/dependencies", get(phases::list_dependencies))
        .route("/api/dependency", post(phases::create_dependency))
        .route("/api/dependency/:id", delete(phases::delete_dependency))
        .route("/api/blocked", get(phases::list_blocked))
        // Tradelines
        .route("/api/tradelines", get(tradelines::list_tradelines))
        .route("/api/tradeline", post(tradelines::create_tradeline))
        .route("/api/tradeline/:id", patch(tradelines::update_tradeline))
        .route("/api/tradeline/:id/run", post(tradelines::record_run))
        // Cross-project prioritization
        .route("/api/prioritize", post(priorities::prioritize))
        .route("/api/priorities/status", get(priorities::priority_status))
        .route(
            "/api/priorities/blockers/:slug",
            get(priorities::project_blockers),
        )
}
