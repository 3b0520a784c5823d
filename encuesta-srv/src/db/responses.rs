//! Response session queries
//!
//! Sessions are created in_progress, mutated only by completion, and never
//! deleted. The 'abandoned' status exists in the schema but nothing here
//! transitions into it.

use chrono::{DateTime, Utc};
use encuesta_common::db::models::SurveyResponse;
use encuesta_common::{Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

/// Insert a freshly started response session
pub async fn insert_response(pool: &SqlitePool, response: &SurveyResponse) -> Result<()> {
    sqlx::query(
        "INSERT INTO survey_responses \
         (id, survey_template_id, employee_name, employee_area, work_experience, \
          is_anonymous, ip_address, user_agent, started_at, status) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&response.id)
    .bind(&response.survey_template_id)
    .bind(&response.employee_name)
    .bind(&response.employee_area)
    .bind(&response.work_experience)
    .bind(response.is_anonymous)
    .bind(&response.ip_address)
    .bind(&response.user_agent)
    .bind(response.started_at.to_rfc3339())
    .bind(&response.status)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a response session by id
pub async fn get_response(pool: &SqlitePool, id: &str) -> Result<Option<SurveyResponse>> {
    let row = sqlx::query(
        "SELECT id, survey_template_id, employee_name, employee_area, work_experience, \
                is_anonymous, ip_address, user_agent, started_at, completed_at, status \
         FROM survey_responses WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(response_from_row).transpose()
}

/// Mark a session completed and stamp the completion time
///
/// Unconditional: repeating the call overwrites the timestamp. Returns false
/// when the session does not exist.
pub async fn complete_response(
    pool: &SqlitePool,
    id: &str,
    completed_at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE survey_responses SET status = 'completed', completed_at = ? WHERE id = ?",
    )
    .bind(completed_at.to_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Total number of response sessions, any status
pub async fn count_responses(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM survey_responses")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Number of completed response sessions
pub async fn count_completed_responses(pool: &SqlitePool) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM survey_responses WHERE status = 'completed'")
            .fetch_one(pool)
            .await?;

    Ok(count)
}

/// Completed sessions, optionally bounded by completion time and area
///
/// Bounds are inclusive. Timestamps are stored as RFC 3339 UTC strings, so
/// lexicographic comparison in SQL matches chronological order.
pub async fn completed_responses(
    pool: &SqlitePool,
    date_from: Option<DateTime<Utc>>,
    date_to: Option<DateTime<Utc>>,
    area: Option<&str>,
) -> Result<Vec<SurveyResponse>> {
    let mut sql = String::from(
        "SELECT id, survey_template_id, employee_name, employee_area, work_experience, \
                is_anonymous, ip_address, user_agent, started_at, completed_at, status \
         FROM survey_responses WHERE status = 'completed'",
    );
    if date_from.is_some() {
        sql.push_str(" AND completed_at >= ?");
    }
    if date_to.is_some() {
        sql.push_str(" AND completed_at <= ?");
    }
    if area.is_some() {
        sql.push_str(" AND employee_area = ?");
    }
    sql.push_str(" ORDER BY started_at");

    let mut query = sqlx::query(&sql);
    if let Some(from) = date_from {
        query = query.bind(from.to_rfc3339());
    }
    if let Some(to) = date_to {
        query = query.bind(to.to_rfc3339());
    }
    if let Some(area) = area {
        query = query.bind(area.to_string());
    }

    let rows = query.fetch_all(pool).await?;

    rows.iter().map(response_from_row).collect()
}

fn response_from_row(row: &SqliteRow) -> Result<SurveyResponse> {
    let started_at: String = row.get("started_at");
    let started_at = DateTime::parse_from_rfc3339(&started_at)
        .map_err(|e| Error::Internal(format!("Failed to parse started_at: {}", e)))?
        .with_timezone(&Utc);

    let completed_at: Option<String> = row.get("completed_at");
    let completed_at = completed_at
        .map(|s| DateTime::parse_from_rfc3339(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse completed_at: {}", e)))?
        .map(|dt| dt.with_timezone(&Utc));

    Ok(SurveyResponse {
        id: row.get("id"),
        survey_template_id: row.get("survey_template_id"),
        employee_name: row.get("employee_name"),
        employee_area: row.get("employee_area"),
        work_experience: row.get("work_experience"),
        is_anonymous: row.get::<i64, _>("is_anonymous") != 0,
        ip_address: row.get("ip_address"),
        user_agent: row.get("user_agent"),
        started_at,
        completed_at,
        status: row.get("status"),
    })
}
