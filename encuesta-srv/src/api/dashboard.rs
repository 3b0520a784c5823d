//! Dashboard analytics endpoints
//!
//! All analytics are read-only and computed fresh per call from stored
//! answers. Questions are located by substring-matching their seeded display
//! text, so analytics degrade to empty defaults when a question is absent;
//! the only failure mode is a store error.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::db::{answers, responses, templates};
use crate::AppState;

const AREA_QUESTION_FRAGMENT: &str = "área trabajas";
const EXPERIENCE_QUESTION_FRAGMENT: &str = "tiempo llevas trabajando";
const SATISFACTION_QUESTION_FRAGMENT: &str = "ambiente laboral";
const ROLE_QUESTION_FRAGMENT: &str = "rol específico";
const SUPERVISOR_QUESTION_FRAGMENT: &str = "líder directo";
const IMPEDIMENT_QUESTION_FRAGMENT: &str = "impedimento";
const IMPEDIMENT_DETAIL_FRAGMENT: &str = "especifica cuáles";

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DashboardStatsResponse {
    pub total_responses: i64,
    pub completed_responses: i64,
    pub completion_rate: f64,
    pub responses_by_area: Vec<AreaCount>,
    pub responses_by_experience: Vec<ExperienceCount>,
}

#[derive(Debug, Serialize)]
pub struct AreaCount {
    pub area: Option<String>,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct ExperienceCount {
    pub experience: Option<String>,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct SatisfactionResponse {
    pub overall_satisfaction: OverallSatisfaction,
    pub satisfaction_by_area: Vec<AreaSatisfaction>,
    /// Placeholder for temporal trends
    pub satisfaction_trends: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct OverallSatisfaction {
    pub average: f64,
    pub distribution: Vec<RatingCount>,
}

#[derive(Debug, Serialize)]
pub struct RatingCount {
    pub rating: Option<String>,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct AreaSatisfaction {
    pub area: Option<String>,
    pub average: f64,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct HierarchyResponse {
    pub organizational_chart: Vec<SupervisorGroup>,
    pub management_levels: i64,
    /// Unimplemented signal, always empty
    pub areas_without_clear_hierarchy: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SupervisorGroup {
    pub supervisor: Option<String>,
    pub direct_reports: Vec<DirectReport>,
    pub span_of_control: usize,
}

#[derive(Debug, Serialize)]
pub struct DirectReport {
    pub name: String,
    pub role: Option<String>,
    pub area: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IssuesResponse {
    pub common_impediments: Vec<ImpedimentCount>,
    pub improvement_suggestions: Vec<ImprovementSuggestion>,
    pub training_needs: Vec<TrainingNeed>,
}

#[derive(Debug, Serialize)]
pub struct ImpedimentCount {
    pub impediment: Option<String>,
    pub frequency: i64,
    pub percentage: f64,
    pub affected_areas: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ImprovementSuggestion {
    pub suggestion: String,
    pub frequency: i64,
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct TrainingNeed {
    pub training_type: String,
    pub requests: i64,
    pub areas: Vec<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/dashboard/stats
///
/// Session counts, completion rate, and answer frequencies for the area and
/// tenure questions (all session statuses included).
pub async fn dashboard_stats(
    State(state): State<AppState>,
) -> Result<Json<DashboardStatsResponse>, DashboardError> {
    let total_responses = responses::count_responses(&state.db).await?;
    let completed_responses = responses::count_completed_responses(&state.db).await?;

    let completion_rate = if total_responses > 0 {
        round2(completed_responses as f64 / total_responses as f64 * 100.0)
    } else {
        0.0
    };

    let responses_by_area =
        match templates::find_question_by_text(&state.db, AREA_QUESTION_FRAGMENT).await? {
            Some(question) => answers::counts_by_text(&state.db, &question.id)
                .await?
                .into_iter()
                .map(|(area, count)| AreaCount { area, count })
                .collect(),
            None => Vec::new(),
        };

    let responses_by_experience =
        match templates::find_question_by_text(&state.db, EXPERIENCE_QUESTION_FRAGMENT).await? {
            Some(question) => answers::counts_by_text(&state.db, &question.id)
                .await?
                .into_iter()
                .map(|(experience, count)| ExperienceCount { experience, count })
                .collect(),
            None => Vec::new(),
        };

    Ok(Json(DashboardStatsResponse {
        total_responses,
        completed_responses,
        completion_rate,
        responses_by_area,
        responses_by_experience,
    }))
}

/// GET /api/dashboard/satisfaction
///
/// Distribution and weighted average over the work-environment ratings.
/// Unmapped rating texts appear in the distribution but contribute nothing
/// to the weighted sum.
///
/// The per-area breakdown keys on the satisfaction answer's own text rather
/// than the respondent's area; the aggregation is kept as the consumers
/// expect it (see DESIGN.md).
pub async fn satisfaction_analysis(
    State(state): State<AppState>,
) -> Result<Json<SatisfactionResponse>, DashboardError> {
    let satisfaction_question =
        templates::find_question_by_text(&state.db, SATISFACTION_QUESTION_FRAGMENT).await?;

    let mut overall_satisfaction = OverallSatisfaction {
        average: 0.0,
        distribution: Vec::new(),
    };
    let mut satisfaction_by_area = Vec::new();

    if let Some(question) = satisfaction_question {
        let counts = answers::counts_by_text(&state.db, &question.id).await?;
        let total: i64 = counts.iter().map(|(_, count)| count).sum();

        let mut total_score: i64 = 0;
        let mut distribution = Vec::new();

        for (rating, count) in counts {
            let percentage = if total > 0 {
                round2(count as f64 / total as f64 * 100.0)
            } else {
                0.0
            };

            total_score += satisfaction_score(rating.as_deref()) * count;

            distribution.push(RatingCount {
                rating,
                count,
                percentage,
            });
        }

        let average = if total > 0 {
            round2(total_score as f64 / total as f64)
        } else {
            0.0
        };

        overall_satisfaction = OverallSatisfaction {
            average,
            distribution,
        };

        if templates::find_question_by_text(&state.db, AREA_QUESTION_FRAGMENT)
            .await?
            .is_some()
        {
            satisfaction_by_area = answers::satisfaction_by_answer_text(&state.db, &question.id)
                .await?
                .into_iter()
                .map(|(area, average, count)| AreaSatisfaction {
                    area,
                    average: round2(average),
                    count,
                })
                .collect();
        }
    }

    Ok(Json(SatisfactionResponse {
        overall_satisfaction,
        satisfaction_by_area,
        satisfaction_trends: Vec::new(),
    }))
}

/// GET /api/dashboard/hierarchy
///
/// Infers a reporting structure from the role and supervisor free-text
/// answers of completed sessions. Anonymous respondents appear as "Anónimo"
/// in the direct-report entries.
pub async fn hierarchy_analysis(
    State(state): State<AppState>,
) -> Result<Json<HierarchyResponse>, DashboardError> {
    let role_question = templates::find_question_by_text(&state.db, ROLE_QUESTION_FRAGMENT).await?;
    let supervisor_question =
        templates::find_question_by_text(&state.db, SUPERVISOR_QUESTION_FRAGMENT).await?;

    let mut organizational_chart: Vec<SupervisorGroup> = Vec::new();

    if let (Some(role_question), Some(supervisor_question)) = (role_question, supervisor_question) {
        let completed = responses::completed_responses(&state.db, None, None, None).await?;

        // Supervisor groups keep first-encounter order
        let mut hierarchy: Vec<(Option<String>, Vec<DirectReport>)> = Vec::new();

        for response in completed {
            let role_answer = answers::answer_for(&state.db, &response.id, &role_question.id).await?;
            let supervisor_answer =
                answers::answer_for(&state.db, &response.id, &supervisor_question.id).await?;

            if let (Some(role_answer), Some(supervisor_answer)) = (role_answer, supervisor_answer) {
                let name = response
                    .display_name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| "Anónimo".to_string());

                let report = DirectReport {
                    name,
                    role: role_answer.answer_text,
                    area: response.employee_area.clone(),
                };

                let supervisor = supervisor_answer.answer_text;
                match hierarchy.iter().position(|(s, _)| *s == supervisor) {
                    Some(idx) => hierarchy[idx].1.push(report),
                    None => hierarchy.push((supervisor, vec![report])),
                }
            }
        }

        organizational_chart = hierarchy
            .into_iter()
            .map(|(supervisor, direct_reports)| SupervisorGroup {
                supervisor,
                span_of_control: direct_reports.len(),
                direct_reports,
            })
            .collect();
    }

    // Simplification: one level per supervisor group, not true tree depth
    let management_levels = organizational_chart.len() as i64;

    Ok(Json(HierarchyResponse {
        organizational_chart,
        management_levels,
        areas_without_clear_hierarchy: Vec::new(),
    }))
}

/// GET /api/dashboard/issues
///
/// Impediment frequencies plus keyword-categorized free-text details.
pub async fn issues_analysis(
    State(state): State<AppState>,
) -> Result<Json<IssuesResponse>, DashboardError> {
    let impediment_question =
        templates::find_question_by_text(&state.db, IMPEDIMENT_QUESTION_FRAGMENT).await?;
    let detail_question =
        templates::find_question_by_text(&state.db, IMPEDIMENT_DETAIL_FRAGMENT).await?;

    let mut common_impediments = Vec::new();
    let mut improvement_suggestions = Vec::new();

    if let (Some(impediment_question), Some(detail_question)) =
        (impediment_question, detail_question)
    {
        let counts = answers::counts_by_text(&state.db, &impediment_question.id).await?;
        let total: i64 = counts.iter().map(|(_, count)| count).sum();

        for (impediment, frequency) in counts {
            let percentage = if total > 0 {
                round2(frequency as f64 / total as f64 * 100.0)
            } else {
                0.0
            };

            common_impediments.push(ImpedimentCount {
                impediment,
                frequency,
                percentage,
                affected_areas: Vec::new(),
            });
        }

        // Category buckets keep first-encounter order
        let mut categories: Vec<(&'static str, i64)> = Vec::new();
        for text in answers::answer_texts(&state.db, &detail_question.id).await? {
            let category = categorize_impediment(&text);
            match categories.iter().position(|(c, _)| *c == category) {
                Some(idx) => categories[idx].1 += 1,
                None => categories.push((category, 1)),
            }
        }

        improvement_suggestions = categories
            .into_iter()
            .map(|(suggestion, frequency)| ImprovementSuggestion {
                suggestion: suggestion.to_string(),
                frequency,
                category: "Operacional".to_string(),
            })
            .collect();
    }

    // Training needs are a static placeholder, not derived from data
    let training_needs = vec![
        TrainingNeed {
            training_type: "Capacitación técnica".to_string(),
            requests: 5,
            areas: vec!["Mecánica".to_string()],
        },
        TrainingNeed {
            training_type: "Atención al cliente".to_string(),
            requests: 3,
            areas: vec!["Ventas".to_string(), "Administración".to_string()],
        },
        TrainingNeed {
            training_type: "Liderazgo".to_string(),
            requests: 2,
            areas: vec!["Administración".to_string()],
        },
    ];

    Ok(Json(IssuesResponse {
        common_impediments,
        improvement_suggestions,
        training_needs,
    }))
}

// ============================================================================
// Pure helpers
// ============================================================================

/// Round to 2 decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Map a work-environment rating to its 5..1 score; unmapped text scores 0
fn satisfaction_score(rating: Option<&str>) -> i64 {
    match rating {
        Some("Excelente") => 5,
        Some("Muy bueno") => 4,
        Some("Bueno") => 3,
        Some("Regular") => 2,
        Some("Malo") => 1,
        _ => 0,
    }
}

/// Categorize an impediment detail text by keywords, first match wins
fn categorize_impediment(text: &str) -> &'static str {
    let text = text.to_lowercase();
    if text.contains("herramienta") || text.contains("equipo") {
        "Falta de herramientas/equipos"
    } else if text.contains("capacitación") || text.contains("entrenamiento") {
        "Falta de capacitación"
    } else if text.contains("comunicación") {
        "Problemas de comunicación"
    } else if text.contains("tiempo") || text.contains("sobrecarga") {
        "Sobrecarga de trabajo"
    } else {
        "Otros"
    }
}

/// Dashboard API errors
#[derive(Debug)]
pub enum DashboardError {
    Internal(String),
}

impl From<encuesta_common::Error> for DashboardError {
    fn from(err: encuesta_common::Error) -> Self {
        DashboardError::Internal(err.to_string())
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let DashboardError::Internal(message) = self;

        let body = Json(json!({
            "error": message,
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
