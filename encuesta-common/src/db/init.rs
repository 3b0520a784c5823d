//! Database initialization
//!
//! Creates the survey schema on first run and seeds the administrator
//! account. All statements are idempotent, so startup is safe to repeat.

use crate::api::auth::{generate_salt, hash_password};
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Run schema creation (idempotent - safe to call multiple times)
    create_settings_table(&pool).await?;
    create_users_table(&pool).await?;
    create_survey_templates_table(&pool).await?;
    create_questions_table(&pool).await?;
    create_survey_responses_table(&pool).await?;
    create_question_answers_table(&pool).await?;

    seed_admin_user(&pool).await?;

    Ok(pool)
}

/// Create the settings table
///
/// Stores application configuration key-value pairs (including the API
/// bearer token).
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the users table
///
/// Identity records for dashboard consumers. Credentials are issued and
/// verified by the external identity provider; this table only carries the
/// seeded administrator and profile fields.
pub async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'admin',
            full_name TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the survey_templates table
///
/// A partial unique index guarantees at most one active template at any time;
/// lazy seeding relies on it to stay race-free.
pub async fn create_survey_templates_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS survey_templates (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            version TEXT NOT NULL DEFAULT '1.0',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_by TEXT REFERENCES users(id),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_survey_templates_single_active \
         ON survey_templates(is_active) WHERE is_active = 1",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the questions table
///
/// order_index is unique within a template and defines presentation order,
/// both inside a section and globally.
pub async fn create_questions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            id TEXT PRIMARY KEY,
            survey_template_id TEXT NOT NULL REFERENCES survey_templates(id) ON DELETE CASCADE,
            section_name TEXT NOT NULL,
            question_text TEXT NOT NULL,
            question_type TEXT NOT NULL CHECK (question_type IN ('text', 'textarea', 'select', 'radio', 'checkbox', 'scale')),
            options TEXT,
            is_required INTEGER NOT NULL DEFAULT 0,
            order_index INTEGER NOT NULL,
            validation_rules TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (survey_template_id, order_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_questions_template ON questions(survey_template_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the survey_responses table
///
/// One row per respondent attempt. Rows are never deleted. The 'abandoned'
/// status is reserved; no operation currently transitions into it.
pub async fn create_survey_responses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS survey_responses (
            id TEXT PRIMARY KEY,
            survey_template_id TEXT NOT NULL REFERENCES survey_templates(id),
            employee_name TEXT,
            employee_area TEXT,
            work_experience TEXT,
            is_anonymous INTEGER NOT NULL DEFAULT 0,
            ip_address TEXT,
            user_agent TEXT,
            started_at TEXT NOT NULL,
            completed_at TEXT,
            status TEXT NOT NULL DEFAULT 'in_progress' CHECK (status IN ('in_progress', 'completed', 'abandoned'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_survey_responses_status ON survey_responses(status)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_survey_responses_template ON survey_responses(survey_template_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the question_answers table
///
/// At most one answer per (response, question) pair; the unique index backs
/// the single-statement upsert so concurrent writes cannot interleave
/// half-written slot states.
pub async fn create_question_answers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS question_answers (
            id TEXT PRIMARY KEY,
            survey_response_id TEXT NOT NULL REFERENCES survey_responses(id) ON DELETE CASCADE,
            question_id TEXT NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
            answer_text TEXT,
            answer_numeric REAL,
            answer_json TEXT,
            answered_at TEXT NOT NULL,
            UNIQUE (survey_response_id, question_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_question_answers_question ON question_answers(question_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_question_answers_response ON question_answers(survey_response_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed the administrator account if none exists
async fn seed_admin_user(pool: &SqlitePool) -> Result<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = 'admin')")
            .fetch_one(pool)
            .await?;

    if exists {
        return Ok(());
    }

    let salt = generate_salt();
    let password_hash = hash_password("admin123", &salt);

    // INSERT OR IGNORE handles concurrent initialization race conditions
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO users (id, username, email, password_hash, password_salt, role, full_name)
        VALUES (?, 'admin', 'admin@powercars.com', ?, ?, 'admin', 'Administrador PowerCars')
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&password_hash)
    .bind(&salt)
    .execute(pool)
    .await?;

    info!("Seeded administrator account 'admin'");
    Ok(())
}
