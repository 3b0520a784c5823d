//! Report endpoints: summary, detailed, response export, analytics series
//!
//! The summary narrative, the detailed per-section payloads and the analytics
//! series are fixed editorial content; only the response counts and the
//! export rows are computed from the store.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::db::responses;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub format: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetailedQuery {
    pub section: Option<String>,
    /// Accepted for forward compatibility; not used by the canned payloads
    #[allow(dead_code)]
    pub area: Option<String>,
    #[allow(dead_code)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub include_personal_data: Option<String>,
    pub area: Option<String>,
}

/// GET /api/reports/summary
///
/// Counts completed sessions within the optional inclusive completion-time
/// bounds and wraps the count in the fixed narrative payload.
pub async fn summary_report(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<serde_json::Value>, ReportError> {
    let date_from = query
        .date_from
        .as_deref()
        .map(|raw| {
            parse_date_bound(raw).ok_or_else(|| ReportError::InvalidDate(format!(
                "Invalid date_from: {}",
                raw
            )))
        })
        .transpose()?;

    let date_to = query
        .date_to
        .as_deref()
        .map(|raw| {
            parse_date_bound(raw)
                .ok_or_else(|| ReportError::InvalidDate(format!("Invalid date_to: {}", raw)))
        })
        .transpose()?;

    let filtered = responses::completed_responses(&state.db, date_from, date_to, None).await?;

    let format = query.format.as_deref().unwrap_or("json");
    if format != "json" {
        // Other formats answer with a download reference instead of inline data
        return Ok(Json(json!({
            "download_url": format!(
                "/api/reports/download/summary_{}_{}",
                format,
                Utc::now().format("%Y%m%d")
            ),
        })));
    }

    let report_data = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "period": {
            "from": query.date_from,
            "to": query.date_to,
        },
        "summary": {
            "total_responses": filtered.len(),
            "response_rate": "85%",
            "completion_time_avg": "12 minutos",
        },
        "key_findings": [
            "El 78% de los empleados considera el ambiente laboral como bueno o excelente",
            "La principal área de mejora identificada es la disponibilidad de herramientas",
            "El 65% de los empleados se siente valorado en su trabajo",
            "Se identificaron 3 niveles jerárquicos principales",
        ],
        "recommendations": [
            "Implementar un sistema de gestión de herramientas y equipos",
            "Establecer reuniones regulares de feedback entre supervisores y empleados",
            "Crear un programa de reconocimiento de empleados",
            "Documentar formalmente la estructura organizacional",
        ],
    });

    Ok(Json(json!({ "report_data": report_data })))
}

/// GET /api/reports/detailed
///
/// Canned per-section analysis; unknown sections yield an empty analysis.
pub async fn detailed_report(
    Query(query): Query<DetailedQuery>,
) -> Json<serde_json::Value> {
    let (section_analysis, recommendations, action_items) = match query.section.as_deref() {
        Some("Ambiente Laboral") => (
            json!({
                "section_name": "Ambiente Laboral",
                "response_count": 25,
                "satisfaction_score": 3.8,
                "key_metrics": {
                    "ambiente_general": 3.8,
                    "valoracion_personal": 3.5,
                    "comunicacion_equipos": 3.6,
                },
                "trends": "Mejora gradual en los últimos 6 meses",
                "areas_concern": ["Valoración personal", "Comunicación entre turnos"],
            }),
            json!([
                "Implementar programa de reconocimiento mensual",
                "Establecer reuniones de coordinación entre turnos",
                "Crear espacios de descanso más cómodos",
            ]),
            json!([
                "Diseñar sistema de reconocimiento - Responsable: RRHH - Plazo: 30 días",
                "Programar reuniones inter-turno - Responsable: Supervisores - Plazo: 15 días",
                "Evaluar espacios comunes - Responsable: Administración - Plazo: 45 días",
            ]),
        ),
        Some("Estructura Organizacional") => (
            json!({
                "section_name": "Estructura Organizacional",
                "response_count": 25,
                "clarity_score": 2.9,
                "hierarchy_levels": 3,
                "span_of_control_avg": 4.2,
                "areas_unclear_hierarchy": ["Área de limpieza", "Seguridad nocturna"],
            }),
            json!([
                "Crear organigrama visual oficial",
                "Definir roles y responsabilidades por escrito",
                "Establecer líneas de reporte claras",
            ]),
            json!([
                "Documentar organigrama - Responsable: Gerencia - Plazo: 20 días",
                "Crear manual de roles - Responsable: RRHH - Plazo: 30 días",
                "Comunicar estructura a todo el personal - Responsable: Gerencia - Plazo: 35 días",
            ]),
        ),
        _ => (json!({}), json!([]), json!([])),
    };

    Json(json!({
        "section_analysis": section_analysis,
        "recommendations": recommendations,
        "action_items": action_items,
    }))
}

/// GET /api/reports/responses
///
/// Exports completed sessions, optionally filtered by exact area. Personal
/// data is included only on request and anonymized per the "Anónimo" rule.
/// CSV format answers with a download reference instead of inline rows.
pub async fn export_responses(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<serde_json::Value>, ReportError> {
    let include_personal_data = query
        .include_personal_data
        .as_deref()
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let rows =
        responses::completed_responses(&state.db, None, None, query.area.as_deref()).await?;

    if query.format.as_deref() == Some("csv") {
        let filename = format!("responses_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"));
        return Ok(Json(json!({
            "download_url": format!("/api/reports/download/{}", filename),
            "total_records": rows.len(),
        })));
    }

    let data: Vec<serde_json::Value> = rows
        .iter()
        .map(|response| {
            let mut record = json!({
                "id": response.id,
                "area": response.employee_area,
                "experience": response.work_experience,
                "completed_at": response.completed_at.map(|dt| dt.to_rfc3339()),
                "is_anonymous": response.is_anonymous,
            });
            if include_personal_data {
                record["name"] = json!(response.display_name());
            }
            record
        })
        .collect();

    Ok(Json(json!({
        "total_records": data.len(),
        "responses": data,
    })))
}

/// GET /api/reports/analytics
///
/// Hand-authored sample series for the dashboard charts; not computed from
/// the store.
pub async fn analytics_series() -> Json<serde_json::Value> {
    Json(json!({
        "satisfaction_trend": [
            { "month": "Enero", "score": 3.2 },
            { "month": "Febrero", "score": 3.4 },
            { "month": "Marzo", "score": 3.8 },
            { "month": "Abril", "score": 3.7 },
            { "month": "Mayo", "score": 3.9 },
        ],
        "area_performance": [
            { "area": "Mecánica", "satisfaction": 4.1, "productivity": 85 },
            { "area": "Administración", "satisfaction": 3.8, "productivity": 92 },
            { "area": "Ventas", "satisfaction": 3.6, "productivity": 78 },
            { "area": "Limpieza", "satisfaction": 3.9, "productivity": 88 },
        ],
        "impediments_frequency": [
            { "impediment": "Falta de herramientas", "count": 12 },
            { "impediment": "Problemas de comunicación", "count": 8 },
            { "impediment": "Sobrecarga de trabajo", "count": 6 },
            { "impediment": "Falta de capacitación", "count": 4 },
        ],
        "hierarchy_distribution": [
            { "level": "Gerencia", "count": 2 },
            { "level": "Supervisores", "count": 5 },
            { "level": "Técnicos", "count": 15 },
            { "level": "Auxiliares", "count": 8 },
        ],
    }))
}

/// Parse an ISO-8601 date bound
///
/// Accepts a full RFC 3339 timestamp, a bare datetime, or a bare date
/// (interpreted as midnight UTC).
fn parse_date_bound(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    if let Some(ndt) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    None
}

/// Report API errors
#[derive(Debug)]
pub enum ReportError {
    InvalidDate(String),
    Internal(String),
}

impl From<encuesta_common::Error> for ReportError {
    fn from(err: encuesta_common::Error) -> Self {
        ReportError::Internal(err.to_string())
    }
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ReportError::InvalidDate(msg) => (StatusCode::BAD_REQUEST, msg),
            ReportError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
