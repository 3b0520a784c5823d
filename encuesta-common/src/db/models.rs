//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dashboard consumer identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    pub role: String,
    pub full_name: Option<String>,
    pub is_active: bool,
}

/// A named, versioned questionnaire; at most one is active at a time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyTemplate {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub version: String,
    pub is_active: bool,
    pub created_by: Option<String>,
}

/// A single question within a template
///
/// Serialized without the owning-template backreference; API consumers see
/// questions only inside their template's section list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(skip_serializing, default)]
    pub survey_template_id: String,
    pub section_name: String,
    pub question_text: String,
    pub question_type: String,
    pub options: Option<serde_json::Value>,
    pub is_required: bool,
    pub order_index: i64,
    pub validation_rules: Option<serde_json::Value>,
}

/// One respondent's pass through the questionnaire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: String,
    pub survey_template_id: String,
    pub employee_name: Option<String>,
    pub employee_area: Option<String>,
    pub work_experience: Option<String>,
    pub is_anonymous: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: String,
}

impl SurveyResponse {
    /// Respondent name for outward-facing views
    ///
    /// Anonymous responses always render as "Anónimo" regardless of the
    /// stored name.
    pub fn display_name(&self) -> Option<String> {
        if self.is_anonymous {
            Some("Anónimo".to_string())
        } else {
            self.employee_name.clone()
        }
    }
}

/// Stored answer for one (response, question) pair
///
/// Exactly one of the three value slots is populated; overwrites clear the
/// slots that no longer apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub id: String,
    pub survey_response_id: String,
    pub question_id: String,
    pub answer_text: Option<String>,
    pub answer_numeric: Option<f64>,
    pub answer_json: Option<serde_json::Value>,
    pub answered_at: DateTime<Utc>,
}
