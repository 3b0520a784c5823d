//! Integration tests for encuesta-srv API endpoints
//!
//! Tests cover:
//! - Questionnaire template serving and idempotent lazy seeding
//! - Response session lifecycle (start, answer upsert, complete)
//! - Bearer-token authentication on dashboard/report routes
//! - Dashboard analytics (stats, satisfaction, hierarchy, issues)
//! - Reports (summary, detailed, export, analytics series)

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

use encuesta_common::db::init_database;
use encuesta_srv::{build_router, AppState};

/// Test helper: Create a scratch database in a temp directory
///
/// The TempDir must stay alive for the duration of the test.
async fn setup_test_db() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let db_path = dir.path().join("encuesta.db");
    let pool = init_database(&db_path)
        .await
        .expect("Should initialize database");
    (dir, pool)
}

/// Test helper: Create app with auth disabled (empty token)
fn setup_app(db: SqlitePool) -> axum::Router {
    let state = AppState::new(db, String::new());
    build_router(state)
}

/// Test helper: Create app with a configured bearer token
fn setup_app_with_token(db: SqlitePool, token: &str) -> axum::Router {
    let state = AppState::new(db, token.to_string());
    build_router(state)
}

/// Test helper: Build a GET request
fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Build a GET request with a bearer token
fn get_request_with_auth(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Build a POST request with a JSON body
fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Test helper: Fetch the template (seeding it on first call)
async fn fetch_template(app: &axum::Router) -> Value {
    let response = app
        .clone()
        .oneshot(get_request("/api/survey/template"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body()).await
}

/// Test helper: Find a question id by a fragment of its text
fn question_id_containing(template: &Value, fragment: &str) -> String {
    for section in template["sections"].as_array().unwrap() {
        for question in section["questions"].as_array().unwrap() {
            if question["question_text"].as_str().unwrap().contains(fragment) {
                return question["id"].as_str().unwrap().to_string();
            }
        }
    }
    panic!("No question containing {:?}", fragment);
}

/// Test helper: Start a session, returning its response_id
async fn start_session(app: &axum::Router, body: Value) -> String {
    let response = app
        .clone()
        .oneshot(post_json("/api/survey/start", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    body["response_id"].as_str().unwrap().to_string()
}

/// Test helper: Record one answer
async fn submit_answer(app: &axum::Router, response_id: &str, question_id: &str, answer: Value) {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/survey/answer",
            json!({
                "response_id": response_id,
                "question_id": question_id,
                "answer": answer,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// Test helper: Complete a session
async fn complete_session(app: &axum::Router, response_id: &str) {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/survey/complete",
            json!({ "response_id": response_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Health Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app_with_token(db, "secreto");

    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "encuesta-srv");
    assert!(body["version"].is_string());
}

// =============================================================================
// Template Tests
// =============================================================================

#[tokio::test]
async fn test_template_seeds_default_questionnaire() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let template = fetch_template(&app).await;

    assert_eq!(template["title"], "Encuesta Organizacional PowerCars 2025");
    assert!(template["id"].is_string());

    let sections = template["sections"].as_array().unwrap();
    let section_names: Vec<&str> = sections
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        section_names,
        vec![
            "Información Personal",
            "Rol y Responsabilidades",
            "Impedimentos y Mejoras",
            "Ambiente Laboral",
            "Condiciones Laborales",
            "Experiencia General",
        ]
    );

    let question_counts: Vec<usize> = sections
        .iter()
        .map(|s| s["questions"].as_array().unwrap().len())
        .collect();
    assert_eq!(question_counts, vec![3, 3, 3, 3, 2, 4]);

    // Questions carry order indices 1-18 in section traversal order
    let order_indices: Vec<i64> = sections
        .iter()
        .flat_map(|s| s["questions"].as_array().unwrap())
        .map(|q| q["order_index"].as_i64().unwrap())
        .collect();
    assert_eq!(order_indices, (1..=18).collect::<Vec<i64>>());

    // Spot-check one question per type
    let first = &sections[0]["questions"][0];
    assert_eq!(first["question_text"], "¿Cuál es tu nombre completo?");
    assert_eq!(first["question_type"], "text");
    assert_eq!(first["is_required"], true);
    assert!(first["options"].is_null());

    let area = &sections[0]["questions"][1];
    assert_eq!(area["question_type"], "select");
    assert_eq!(
        area["options"],
        json!(["Mecánica", "Administración", "Ventas", "Limpieza", "Seguridad", "Otro"])
    );

    let scale = &sections[5]["questions"][0];
    assert_eq!(scale["question_type"], "scale");
    assert_eq!(scale["options"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_template_seeding_idempotent() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db.clone());

    let first = fetch_template(&app).await;
    let second = fetch_template(&app).await;

    // Second call returns the template seeded by the first, not a duplicate
    assert_eq!(first["id"], second["id"]);
    assert_eq!(first, second);

    let active_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM survey_templates WHERE is_active = 1")
            .fetch_one(&db)
            .await
            .unwrap();
    assert_eq!(active_count, 1);

    let question_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(question_count, 18);
}

// =============================================================================
// Session Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_start_without_template_returns_404() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    // No template has been seeded yet
    let response = app
        .oneshot(post_json("/api/survey/start", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "No hay plantilla de encuesta activa");
}

#[tokio::test]
async fn test_start_returns_session_token() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    fetch_template(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/survey/start",
            json!({
                "employee_name": "Juan Pérez",
                "employee_area": "Mecánica",
                "work_experience": "1-3 años",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let body = extract_json(response.into_body()).await;
    let response_id = body["response_id"].as_str().unwrap();
    assert!(!response_id.is_empty());
    assert_eq!(
        body["session_token"],
        format!("session_{}", response_id)
    );
}

#[tokio::test]
async fn test_answer_unknown_session_returns_404() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    let template = fetch_template(&app).await;
    let question_id = question_id_containing(&template, "área trabajas");

    let response = app
        .oneshot(post_json(
            "/api/survey/answer",
            json!({
                "response_id": "no-such-session",
                "question_id": question_id,
                "answer": "Mecánica",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Respuesta no encontrada");
}

#[tokio::test]
async fn test_answer_unknown_question_returns_404() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    fetch_template(&app).await;
    let response_id = start_session(&app, json!({})).await;

    let response = app
        .oneshot(post_json(
            "/api/survey/answer",
            json!({
                "response_id": response_id,
                "question_id": "no-such-question",
                "answer": "Mecánica",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Pregunta no encontrada");
}

#[tokio::test]
async fn test_answer_upsert_keeps_single_row_last_write_wins() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db.clone());
    let template = fetch_template(&app).await;
    let question_id = question_id_containing(&template, "escala del 1 al 10");
    let response_id = start_session(&app, json!({})).await;

    // Text answer first, then overwrite with a numeric one
    submit_answer(&app, &response_id, &question_id, json!("ocho")).await;
    submit_answer(&app, &response_id, &question_id, json!(8)).await;

    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM question_answers WHERE survey_response_id = ? AND question_id = ?",
    )
    .bind(&response_id)
    .bind(&question_id)
    .fetch_one(&db)
    .await
    .unwrap();
    assert_eq!(count, 1);

    // Only the final value is observable; stale slots are cleared
    let (text, numeric): (Option<String>, Option<f64>) = sqlx::query_as(
        "SELECT answer_text, answer_numeric FROM question_answers \
         WHERE survey_response_id = ? AND question_id = ?",
    )
    .bind(&response_id)
    .bind(&question_id)
    .fetch_one(&db)
    .await
    .unwrap();
    assert_eq!(text, None);
    assert_eq!(numeric, Some(8.0));

    // Replaying the same call leaves the same final state
    submit_answer(&app, &response_id, &question_id, json!(8)).await;
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM question_answers WHERE survey_response_id = ? AND question_id = ?",
    )
    .bind(&response_id)
    .bind(&question_id)
    .fetch_one(&db)
    .await
    .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_complete_sets_status_and_timestamp() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db.clone());
    fetch_template(&app).await;
    let response_id = start_session(&app, json!({})).await;

    complete_session(&app, &response_id).await;

    let (status, started_at, completed_at): (String, String, Option<String>) = sqlx::query_as(
        "SELECT status, started_at, completed_at FROM survey_responses WHERE id = ?",
    )
    .bind(&response_id)
    .fetch_one(&db)
    .await
    .unwrap();

    assert_eq!(status, "completed");
    let completed_at = completed_at.expect("completed_at should be stamped");
    // RFC 3339 UTC strings compare lexicographically in chronological order
    assert!(completed_at >= started_at);

    // Completing again is idempotent and still succeeds
    complete_session(&app, &response_id).await;
}

#[tokio::test]
async fn test_complete_unknown_session_returns_404() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    fetch_template(&app).await;

    let response = app
        .oneshot(post_json(
            "/api/survey/complete",
            json!({ "response_id": "no-such-session" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Authentication Tests
// =============================================================================

#[tokio::test]
async fn test_protected_routes_require_bearer_token() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app_with_token(db, "secreto");

    // No Authorization header
    let response = app
        .clone()
        .oneshot(get_request("/api/dashboard/stats"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Wrong token
    let response = app
        .clone()
        .oneshot(get_request_with_auth("/api/dashboard/stats", "equivocado"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Correct token
    let response = app
        .clone()
        .oneshot(get_request_with_auth("/api/dashboard/stats", "secreto"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Survey routes stay public
    let response = app
        .oneshot(get_request("/api/survey/template"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_empty_token_disables_auth() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let response = app
        .oneshot(get_request("/api/dashboard/stats"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Dashboard Tests
// =============================================================================

#[tokio::test]
async fn test_dashboard_stats_empty_store() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    fetch_template(&app).await;

    let response = app
        .oneshot(get_request("/api/dashboard/stats"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_responses"], 0);
    assert_eq!(body["completed_responses"], 0);
    assert_eq!(body["completion_rate"], 0.0);
    assert_eq!(body["responses_by_area"], json!([]));
    assert_eq!(body["responses_by_experience"], json!([]));
}

#[tokio::test]
async fn test_dashboard_stats_completion_rate_and_area_counts() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    let template = fetch_template(&app).await;
    let area_question = question_id_containing(&template, "área trabajas");
    let exp_question = question_id_containing(&template, "tiempo llevas trabajando");

    // 4 sessions, 3 completed -> 75.0
    let mut ids = Vec::new();
    for _ in 0..4 {
        ids.push(start_session(&app, json!({})).await);
    }
    for id in ids.iter().take(3) {
        complete_session(&app, id).await;
    }

    // Area answers count regardless of session status (the 4th stays open)
    submit_answer(&app, &ids[0], &area_question, json!("Mecánica")).await;
    submit_answer(&app, &ids[1], &area_question, json!("Ventas")).await;
    submit_answer(&app, &ids[3], &area_question, json!("Mecánica")).await;
    submit_answer(&app, &ids[0], &exp_question, json!("1-3 años")).await;

    let response = app
        .oneshot(get_request("/api/dashboard/stats"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["total_responses"], 4);
    assert_eq!(body["completed_responses"], 3);
    assert_eq!(body["completion_rate"], 75.0);

    let by_area = body["responses_by_area"].as_array().unwrap();
    let mecanica = by_area
        .iter()
        .find(|e| e["area"] == "Mecánica")
        .expect("Mecánica bucket");
    assert_eq!(mecanica["count"], 2);
    let ventas = by_area.iter().find(|e| e["area"] == "Ventas").unwrap();
    assert_eq!(ventas["count"], 1);

    let by_experience = body["responses_by_experience"].as_array().unwrap();
    assert_eq!(by_experience.len(), 1);
    assert_eq!(by_experience[0]["experience"], "1-3 años");
    assert_eq!(by_experience[0]["count"], 1);
}

#[tokio::test]
async fn test_satisfaction_analysis_average_and_distribution() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    let template = fetch_template(&app).await;
    let satisfaction_question = question_id_containing(&template, "ambiente laboral");

    // {Excelente: 2, Bueno: 1, Malo: 1} -> average 3.5
    for rating in ["Excelente", "Excelente", "Bueno", "Malo"] {
        let id = start_session(&app, json!({})).await;
        submit_answer(&app, &id, &satisfaction_question, json!(rating)).await;
        complete_session(&app, &id).await;
    }

    let response = app
        .oneshot(get_request("/api/dashboard/satisfaction"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let overall = &body["overall_satisfaction"];
    assert_eq!(overall["average"], 3.5);

    let distribution = overall["distribution"].as_array().unwrap();
    let excelente = distribution
        .iter()
        .find(|e| e["rating"] == "Excelente")
        .unwrap();
    assert_eq!(excelente["count"], 2);
    assert_eq!(excelente["percentage"], 50.0);
    let malo = distribution.iter().find(|e| e["rating"] == "Malo").unwrap();
    assert_eq!(malo["percentage"], 25.0);

    // The by-area breakdown keys on the rating text itself
    let by_area = body["satisfaction_by_area"].as_array().unwrap();
    let excelente_group = by_area.iter().find(|e| e["area"] == "Excelente").unwrap();
    assert_eq!(excelente_group["average"], 5.0);
    assert_eq!(excelente_group["count"], 2);

    assert_eq!(body["satisfaction_trends"], json!([]));
}

#[tokio::test]
async fn test_satisfaction_analysis_empty_store() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    fetch_template(&app).await;

    let response = app
        .oneshot(get_request("/api/dashboard/satisfaction"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["overall_satisfaction"]["average"], 0.0);
    assert_eq!(body["overall_satisfaction"]["distribution"], json!([]));
    assert_eq!(body["satisfaction_by_area"], json!([]));
}

#[tokio::test]
async fn test_hierarchy_groups_by_supervisor_and_redacts_anonymous() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    let template = fetch_template(&app).await;
    let role_question = question_id_containing(&template, "rol específico");
    let supervisor_question = question_id_containing(&template, "líder directo");

    // Anonymous respondent: stored name must never surface
    let anon = start_session(
        &app,
        json!({
            "employee_name": "Juan",
            "employee_area": "Mecánica",
            "is_anonymous": true,
        }),
    )
    .await;
    submit_answer(&app, &anon, &role_question, json!("Mecánico")).await;
    submit_answer(&app, &anon, &supervisor_question, json!("Carlos")).await;
    complete_session(&app, &anon).await;

    let named = start_session(
        &app,
        json!({
            "employee_name": "María",
            "employee_area": "Ventas",
        }),
    )
    .await;
    submit_answer(&app, &named, &role_question, json!("Vendedora")).await;
    submit_answer(&app, &named, &supervisor_question, json!("Carlos")).await;
    complete_session(&app, &named).await;

    // In-progress sessions are excluded even with both answers present
    let open = start_session(&app, json!({ "employee_name": "Pedro" })).await;
    submit_answer(&app, &open, &role_question, json!("Auxiliar")).await;
    submit_answer(&app, &open, &supervisor_question, json!("Carlos")).await;

    let response = app
        .oneshot(get_request("/api/dashboard/hierarchy"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let chart = body["organizational_chart"].as_array().unwrap();
    assert_eq!(chart.len(), 1);
    assert_eq!(chart[0]["supervisor"], "Carlos");
    assert_eq!(chart[0]["span_of_control"], 2);

    let reports = chart[0]["direct_reports"].as_array().unwrap();
    let names: Vec<&str> = reports.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert!(names.contains(&"Anónimo"));
    assert!(names.contains(&"María"));
    assert!(!names.contains(&"Juan"));

    assert_eq!(body["management_levels"], 1);
    assert_eq!(body["areas_without_clear_hierarchy"], json!([]));
}

#[tokio::test]
async fn test_issues_analysis_categorizes_details() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    let template = fetch_template(&app).await;
    let impediment_question = question_id_containing(&template, "impedimento");
    let detail_question = question_id_containing(&template, "especifica cuáles");

    let entries = [
        ("Sí", Some("falta de herramienta de diagnóstico")),
        ("Sí", Some("mala comunicación entre turnos")),
        ("No", None),
    ];
    for (impediment, detail) in entries {
        let id = start_session(&app, json!({})).await;
        submit_answer(&app, &id, &impediment_question, json!(impediment)).await;
        if let Some(detail) = detail {
            submit_answer(&app, &id, &detail_question, json!(detail)).await;
        }
        complete_session(&app, &id).await;
    }

    let response = app
        .oneshot(get_request("/api/dashboard/issues"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;

    let impediments = body["common_impediments"].as_array().unwrap();
    let si = impediments.iter().find(|e| e["impediment"] == "Sí").unwrap();
    assert_eq!(si["frequency"], 2);
    assert_eq!(si["percentage"], 66.67);
    let no = impediments.iter().find(|e| e["impediment"] == "No").unwrap();
    assert_eq!(no["percentage"], 33.33);

    let suggestions = body["improvement_suggestions"].as_array().unwrap();
    let tools = suggestions
        .iter()
        .find(|s| s["suggestion"] == "Falta de herramientas/equipos")
        .expect("tools category");
    assert_eq!(tools["frequency"], 1);
    assert_eq!(tools["category"], "Operacional");
    assert!(suggestions
        .iter()
        .any(|s| s["suggestion"] == "Problemas de comunicación"));

    // Training needs are static editorial content
    let training = body["training_needs"].as_array().unwrap();
    assert_eq!(training.len(), 3);
    assert_eq!(training[0]["training_type"], "Capacitación técnica");
}

// =============================================================================
// Reports Tests
// =============================================================================

#[tokio::test]
async fn test_summary_report_invalid_date_returns_400() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    fetch_template(&app).await;

    let response = app
        .oneshot(get_request("/api/reports/summary?date_from=not-a-date"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("Invalid date_from"));
}

#[tokio::test]
async fn test_summary_report_counts_completed_in_period() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    fetch_template(&app).await;

    for _ in 0..2 {
        let id = start_session(&app, json!({})).await;
        complete_session(&app, &id).await;
    }
    // An open session never counts
    start_session(&app, json!({})).await;

    let response = app
        .clone()
        .oneshot(get_request(
            "/api/reports/summary?date_from=2020-01-01&date_to=2099-01-01",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let report = &body["report_data"];
    assert_eq!(report["summary"]["total_responses"], 2);
    assert_eq!(report["summary"]["response_rate"], "85%");
    assert_eq!(report["period"]["from"], "2020-01-01");
    assert_eq!(report["key_findings"].as_array().unwrap().len(), 4);
    assert_eq!(report["recommendations"].as_array().unwrap().len(), 4);

    // A bound in the past filters everything out
    let response = app
        .oneshot(get_request("/api/reports/summary?date_to=2020-01-01"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["report_data"]["summary"]["total_responses"], 0);
}

#[tokio::test]
async fn test_summary_report_non_json_format_returns_download_url() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    fetch_template(&app).await;

    let response = app
        .oneshot(get_request("/api/reports/summary?format=pdf"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let url = body["download_url"].as_str().unwrap();
    assert!(url.starts_with("/api/reports/download/summary_pdf_"));
}

#[tokio::test]
async fn test_detailed_report_sections() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let response = app
        .clone()
        .oneshot(get_request(
            "/api/reports/detailed?section=Ambiente%20Laboral",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["section_analysis"]["section_name"], "Ambiente Laboral");
    assert_eq!(body["section_analysis"]["satisfaction_score"], 3.8);
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 3);
    assert_eq!(body["action_items"].as_array().unwrap().len(), 3);

    let response = app
        .clone()
        .oneshot(get_request(
            "/api/reports/detailed?section=Estructura%20Organizacional",
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["section_analysis"]["hierarchy_levels"], 3);

    // Unknown sections yield an empty analysis
    let response = app
        .oneshot(get_request("/api/reports/detailed?section=Otra"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["section_analysis"], json!({}));
    assert_eq!(body["recommendations"], json!([]));
    assert_eq!(body["action_items"], json!([]));
}

#[tokio::test]
async fn test_export_responses_anonymizes_personal_data() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    fetch_template(&app).await;

    let anon = start_session(
        &app,
        json!({
            "employee_name": "Juan",
            "employee_area": "Mecánica",
            "work_experience": "1-3 años",
            "is_anonymous": true,
        }),
    )
    .await;
    complete_session(&app, &anon).await;

    let named = start_session(
        &app,
        json!({
            "employee_name": "María",
            "employee_area": "Ventas",
        }),
    )
    .await;
    complete_session(&app, &named).await;

    // Without the flag no name field is present at all
    let response = app
        .clone()
        .oneshot(get_request("/api/reports/responses"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_records"], 2);
    for record in body["responses"].as_array().unwrap() {
        assert!(record.get("name").is_none());
    }

    // With the flag anonymous records render as "Anónimo"
    let response = app
        .oneshot(get_request(
            "/api/reports/responses?include_personal_data=true",
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let records = body["responses"].as_array().unwrap();
    let anon_record = records.iter().find(|r| r["id"] == anon.as_str()).unwrap();
    assert_eq!(anon_record["name"], "Anónimo");
    assert_eq!(anon_record["is_anonymous"], true);
    let named_record = records.iter().find(|r| r["id"] == named.as_str()).unwrap();
    assert_eq!(named_record["name"], "María");
}

#[tokio::test]
async fn test_export_responses_filters_by_area() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    fetch_template(&app).await;

    for area in ["Mecánica", "Ventas", "Mecánica"] {
        let id = start_session(&app, json!({ "employee_area": area })).await;
        complete_session(&app, &id).await;
    }

    let response = app
        .oneshot(get_request("/api/reports/responses?area=Mec%C3%A1nica"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["total_records"], 2);
    for record in body["responses"].as_array().unwrap() {
        assert_eq!(record["area"], "Mecánica");
    }
}

#[tokio::test]
async fn test_export_responses_csv_returns_download_reference() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    fetch_template(&app).await;

    let id = start_session(&app, json!({})).await;
    complete_session(&app, &id).await;

    let response = app
        .oneshot(get_request("/api/reports/responses?format=csv"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_records"], 1);
    let url = body["download_url"].as_str().unwrap();
    assert!(url.starts_with("/api/reports/download/responses_"));
    assert!(url.ends_with(".csv"));
    assert!(body.get("responses").is_none());
}

#[tokio::test]
async fn test_analytics_series_is_static() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let response = app
        .oneshot(get_request("/api/reports/analytics"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["satisfaction_trend"].as_array().unwrap().len(), 5);
    assert_eq!(body["satisfaction_trend"][0]["month"], "Enero");
    assert_eq!(body["area_performance"][0]["area"], "Mecánica");
    assert_eq!(body["impediments_frequency"][0]["count"], 12);
    assert_eq!(body["hierarchy_distribution"][3]["level"], "Auxiliares");
}
