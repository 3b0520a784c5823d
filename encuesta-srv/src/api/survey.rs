//! Survey-facing endpoints: template, start, answer, complete
//!
//! These routes are public; respondents are not authenticated. Answer
//! submissions are trusted as sent by the survey front-end, so no validation
//! against question type, options or the required flag happens here.

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use encuesta_common::db::models::{Question, SurveyResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use tracing::info;
use uuid::Uuid;

use crate::db::{answers, responses, templates};
use crate::AppState;

/// Section of the questionnaire: name plus its questions in order
#[derive(Debug, Serialize)]
pub struct Section {
    pub name: String,
    pub questions: Vec<Question>,
}

/// GET /api/survey/template response
#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Deserialize)]
pub struct StartSurveyRequest {
    pub employee_name: Option<String>,
    pub employee_area: Option<String>,
    pub work_experience: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Serialize)]
pub struct StartSurveyResponse {
    pub response_id: String,
    pub session_token: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveAnswerRequest {
    pub response_id: String,
    pub question_id: String,
    pub answer: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct CompleteSurveyRequest {
    pub response_id: String,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}

/// GET /api/survey/template
///
/// Returns the active questionnaire, seeding the default one on first call.
/// Sections appear in the order they are first encountered among
/// order-sorted questions.
pub async fn get_survey_template(
    State(state): State<AppState>,
) -> Result<Json<TemplateResponse>, SurveyError> {
    let template = templates::get_or_seed_active_template(&state.db).await?;
    let questions = templates::questions_for_template(&state.db, &template.id).await?;

    let mut sections: Vec<Section> = Vec::new();
    for question in questions {
        match sections.iter().position(|s| s.name == question.section_name) {
            Some(idx) => sections[idx].questions.push(question),
            None => sections.push(Section {
                name: question.section_name.clone(),
                questions: vec![question],
            }),
        }
    }

    Ok(Json(TemplateResponse {
        id: template.id,
        title: template.title,
        description: template.description,
        sections,
    }))
}

/// POST /api/survey/start
///
/// Creates an in_progress response session against the active template and
/// returns its id plus an opaque correlation token.
pub async fn start_survey(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<StartSurveyRequest>,
) -> Result<Response, SurveyError> {
    let template = templates::active_template(&state.db)
        .await?
        .ok_or_else(|| SurveyError::NotFound("No hay plantilla de encuesta activa".to_string()))?;

    let response = SurveyResponse {
        id: Uuid::new_v4().to_string(),
        survey_template_id: template.id,
        employee_name: request.employee_name,
        employee_area: request.employee_area,
        work_experience: request.work_experience,
        is_anonymous: request.is_anonymous,
        ip_address: connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()),
        started_at: Utc::now(),
        completed_at: None,
        status: "in_progress".to_string(),
    };

    responses::insert_response(&state.db, &response).await?;

    info!("Started survey response {}", response.id);

    // The token is a client-side correlation handle, not a credential
    let body = Json(StartSurveyResponse {
        session_token: format!("session_{}", response.id),
        response_id: response.id,
    });

    Ok((StatusCode::CREATED, body).into_response())
}

/// POST /api/survey/answer
///
/// Upserts the answer for one (session, question) pair. Replaying the same
/// call leaves the same final state; re-submitting replaces the prior value
/// entirely.
pub async fn save_answer(
    State(state): State<AppState>,
    Json(request): Json<SaveAnswerRequest>,
) -> Result<Json<AckResponse>, SurveyError> {
    let response = responses::get_response(&state.db, &request.response_id)
        .await?
        .ok_or_else(|| SurveyError::NotFound("Respuesta no encontrada".to_string()))?;

    if !templates::question_exists(&state.db, &request.question_id).await? {
        return Err(SurveyError::NotFound("Pregunta no encontrada".to_string()));
    }

    let value = answers::classify_answer(&request.answer);
    answers::upsert_answer(
        &state.db,
        &response.id,
        &request.question_id,
        &value,
        Utc::now(),
    )
    .await?;

    Ok(Json(AckResponse {
        success: true,
        message: "Respuesta guardada".to_string(),
    }))
}

/// POST /api/survey/complete
///
/// Marks the session completed and stamps the completion time,
/// unconditionally. Does not verify that required questions were answered.
pub async fn complete_survey(
    State(state): State<AppState>,
    Json(request): Json<CompleteSurveyRequest>,
) -> Result<Json<AckResponse>, SurveyError> {
    let updated = responses::complete_response(&state.db, &request.response_id, Utc::now()).await?;

    if !updated {
        return Err(SurveyError::NotFound("Respuesta no encontrada".to_string()));
    }

    info!("Completed survey response {}", request.response_id);

    Ok(Json(AckResponse {
        success: true,
        message: "Encuesta completada exitosamente".to_string(),
    }))
}

/// Survey API errors
#[derive(Debug)]
pub enum SurveyError {
    NotFound(String),
    Internal(String),
}

impl From<encuesta_common::Error> for SurveyError {
    fn from(err: encuesta_common::Error) -> Self {
        match err {
            encuesta_common::Error::NotFound(msg) => SurveyError::NotFound(msg),
            other => SurveyError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for SurveyError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            SurveyError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            SurveyError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
