//! Answer storage and aggregation queries
//!
//! One answer row per (response, question) pair, enforced by a unique index
//! and a single-statement upsert. Each row holds exactly one populated value
//! slot; overwrites clear the slots that no longer apply.

use chrono::{DateTime, Utc};
use encuesta_common::db::models::QuestionAnswer;
use encuesta_common::{Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Value slot chosen by the shape of an incoming answer
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerValue {
    Text(String),
    Numeric(f64),
    Structured(serde_json::Value),
}

/// Classify an incoming JSON answer into its storage slot
///
/// Objects and arrays land in the structured slot, numbers in the numeric
/// slot, and everything else (strings, booleans, null) is coerced to text.
pub fn classify_answer(value: &serde_json::Value) -> AnswerValue {
    match value {
        serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
            AnswerValue::Structured(value.clone())
        }
        serde_json::Value::Number(n) => AnswerValue::Numeric(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(s) => AnswerValue::Text(s.clone()),
        other => AnswerValue::Text(other.to_string()),
    }
}

/// Insert or overwrite the answer for a (response, question) pair
///
/// A single INSERT .. ON CONFLICT statement, so concurrent writes for the
/// same pair resolve to one winner with all three slots consistent.
pub async fn upsert_answer(
    pool: &SqlitePool,
    response_id: &str,
    question_id: &str,
    value: &AnswerValue,
    answered_at: DateTime<Utc>,
) -> Result<()> {
    let (answer_text, answer_numeric, answer_json) = match value {
        AnswerValue::Text(s) => (Some(s.clone()), None, None),
        AnswerValue::Numeric(n) => (None, Some(*n), None),
        AnswerValue::Structured(v) => {
            let json = serde_json::to_string(v)
                .map_err(|e| Error::Internal(format!("Failed to serialize answer: {}", e)))?;
            (None, None, Some(json))
        }
    };

    sqlx::query(
        "INSERT INTO question_answers \
         (id, survey_response_id, question_id, answer_text, answer_numeric, answer_json, answered_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(survey_response_id, question_id) DO UPDATE SET \
             answer_text = excluded.answer_text, \
             answer_numeric = excluded.answer_numeric, \
             answer_json = excluded.answer_json, \
             answered_at = excluded.answered_at",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(response_id)
    .bind(question_id)
    .bind(&answer_text)
    .bind(answer_numeric)
    .bind(&answer_json)
    .bind(answered_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load the answer a session gave to a question, if any
pub async fn answer_for(
    pool: &SqlitePool,
    response_id: &str,
    question_id: &str,
) -> Result<Option<QuestionAnswer>> {
    let row = sqlx::query(
        "SELECT id, survey_response_id, question_id, answer_text, answer_numeric, answer_json, answered_at \
         FROM question_answers WHERE survey_response_id = ? AND question_id = ?",
    )
    .bind(response_id)
    .bind(question_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(answer_from_row).transpose()
}

/// Answer-text frequency for one question, any session status
pub async fn counts_by_text(
    pool: &SqlitePool,
    question_id: &str,
) -> Result<Vec<(Option<String>, i64)>> {
    let rows = sqlx::query_as::<_, (Option<String>, i64)>(
        "SELECT answer_text, COUNT(id) FROM question_answers \
         WHERE question_id = ? GROUP BY answer_text",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Per-answer-text satisfaction averages for one question
///
/// Mirrors the dashboard's area-satisfaction query: answers join to their
/// owning session, but the group key is the satisfaction answer's own text,
/// so the average collapses to that text's score.
pub async fn satisfaction_by_answer_text(
    pool: &SqlitePool,
    question_id: &str,
) -> Result<Vec<(Option<String>, f64, i64)>> {
    let rows = sqlx::query_as::<_, (Option<String>, f64, i64)>(
        "SELECT qa.answer_text, \
                AVG(CASE qa.answer_text \
                    WHEN 'Excelente' THEN 5 \
                    WHEN 'Muy bueno' THEN 4 \
                    WHEN 'Bueno' THEN 3 \
                    WHEN 'Regular' THEN 2 \
                    WHEN 'Malo' THEN 1 \
                    ELSE 0 END), \
                COUNT(qa.id) \
         FROM question_answers qa \
         JOIN survey_responses sr ON qa.survey_response_id = sr.id \
         WHERE qa.question_id = ? \
         GROUP BY qa.answer_text",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Non-null answer texts for one question
pub async fn answer_texts(pool: &SqlitePool, question_id: &str) -> Result<Vec<String>> {
    let rows = sqlx::query_scalar::<_, String>(
        "SELECT answer_text FROM question_answers \
         WHERE question_id = ? AND answer_text IS NOT NULL",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

fn answer_from_row(row: &SqliteRow) -> Result<QuestionAnswer> {
    let answer_json: Option<String> = row.get("answer_json");
    let answer_json = answer_json
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse answer_json: {}", e)))?;

    let answered_at: String = row.get("answered_at");
    let answered_at = DateTime::parse_from_rfc3339(&answered_at)
        .map_err(|e| Error::Internal(format!("Failed to parse answered_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(QuestionAnswer {
        id: row.get("id"),
        survey_response_id: row.get("survey_response_id"),
        question_id: row.get("question_id"),
        answer_text: row.get("answer_text"),
        answer_numeric: row.get("answer_numeric"),
        answer_json,
        answered_at,
    })
}
