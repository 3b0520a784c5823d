//! encuesta-srv library - survey administration HTTP service
//!
//! Serves the questionnaire, records response sessions and per-question
//! answers, and exposes aggregate analytics and reports to authenticated
//! dashboard consumers.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Bearer token required on dashboard/reports routes (empty disables auth)
    pub api_token: String,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, api_token: String) -> Self {
        Self { db, api_token }
    }
}

/// Build application router
///
/// Survey routes and /health are public; dashboard and report routes sit
/// behind the bearer-token middleware.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/api/dashboard/stats", get(api::dashboard_stats))
        .route("/api/dashboard/satisfaction", get(api::satisfaction_analysis))
        .route("/api/dashboard/hierarchy", get(api::hierarchy_analysis))
        .route("/api/dashboard/issues", get(api::issues_analysis))
        .route("/api/reports/summary", get(api::summary_report))
        .route("/api/reports/detailed", get(api::detailed_report))
        .route("/api/reports/responses", get(api::export_responses))
        .route("/api/reports/analytics", get(api::analytics_series))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/api/survey/template", get(api::get_survey_template))
        .route("/api/survey/start", post(api::start_survey))
        .route("/api/survey/answer", post(api::save_answer))
        .route("/api/survey/complete", post(api::complete_survey))
        .merge(api::health_routes());

    // Combine routers
    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
