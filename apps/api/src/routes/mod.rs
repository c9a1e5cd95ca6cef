pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::agents::handlers;
use crate::intake::MAX_RESUME_BYTES;
use crate::state::AppState;

/// Room for multipart framing around a maximum-size resume.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/health", get(health::health_handler))
        // Agents
        .route("/api/v1/analyze-jd", post(handlers::handle_analyze_jd))
        .route(
            "/api/v1/analyze-profile",
            post(handlers::handle_analyze_profile),
        )
        .route(
            "/api/v1/profile/resume",
            post(handlers::handle_resume_upload)
                .layer(DefaultBodyLimit::max(MAX_RESUME_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/api/v1/skill-gap", post(handlers::handle_skill_gap))
        .route("/api/v1/roadmap", post(handlers::handle_roadmap))
        .route("/api/v1/practice", post(handlers::handle_practice))
        .route("/api/v1/progress", post(handlers::handle_progress))
        // History
        .route("/api/v1/analyses/:id", get(handlers::handle_get_analysis))
        .route(
            "/api/v1/dashboard-summary",
            get(handlers::handle_dashboard_summary),
        )
        .with_state(state)
}
