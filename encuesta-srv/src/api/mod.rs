//! HTTP API handlers for encuesta-srv

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod reports;
pub mod survey;

pub use auth::auth_middleware;
pub use dashboard::{dashboard_stats, hierarchy_analysis, issues_analysis, satisfaction_analysis};
pub use health::health_routes;
pub use reports::{analytics_series, detailed_report, export_responses, summary_report};
pub use survey::{complete_survey, get_survey_template, save_answer, start_survey};
