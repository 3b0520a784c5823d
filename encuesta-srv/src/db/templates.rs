//! Survey template and question queries
//!
//! The active template is found via the partial unique index on
//! survey_templates.is_active, never by incidental row order. Lazy seeding of
//! the default questionnaire relies on that index to stay race-free: the loser
//! of a concurrent seed re-reads the winner's row.

use encuesta_common::db::models::{Question, SurveyTemplate};
use encuesta_common::{Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// One entry of the default questionnaire seed
struct SeedQuestion {
    section: &'static str,
    text: &'static str,
    question_type: &'static str,
    options: Option<&'static [&'static str]>,
    required: bool,
    order: i64,
}

/// Default questionnaire: 6 sections, 18 questions, order indices 1-18
const DEFAULT_QUESTIONS: &[SeedQuestion] = &[
    // Sección 1: Información Personal
    SeedQuestion {
        section: "Información Personal",
        text: "¿Cuál es tu nombre completo?",
        question_type: "text",
        options: None,
        required: true,
        order: 1,
    },
    SeedQuestion {
        section: "Información Personal",
        text: "¿En qué área trabajas?",
        question_type: "select",
        options: Some(&[
            "Mecánica",
            "Administración",
            "Ventas",
            "Limpieza",
            "Seguridad",
            "Otro",
        ]),
        required: true,
        order: 2,
    },
    SeedQuestion {
        section: "Información Personal",
        text: "¿Cuánto tiempo llevas trabajando en PowerCars?",
        question_type: "radio",
        options: Some(&[
            "Menos de 6 meses",
            "6-12 meses",
            "1-3 años",
            "3-5 años",
            "Más de 5 años",
        ]),
        required: true,
        order: 3,
    },
    // Sección 2: Rol y Responsabilidades
    SeedQuestion {
        section: "Rol y Responsabilidades",
        text: "¿Cuál es tu rol específico en PowerCars?",
        question_type: "text",
        options: None,
        required: true,
        order: 4,
    },
    SeedQuestion {
        section: "Rol y Responsabilidades",
        text: "¿Quién es tu líder directo o supervisor inmediato?",
        question_type: "text",
        options: None,
        required: true,
        order: 5,
    },
    SeedQuestion {
        section: "Rol y Responsabilidades",
        text: "Describe tus principales funciones diarias:",
        question_type: "textarea",
        options: None,
        required: true,
        order: 6,
    },
    // Sección 3: Impedimentos y Mejoras
    SeedQuestion {
        section: "Impedimentos y Mejoras",
        text: "¿Existe algún impedimento principal para realizar tus funciones eficientemente?",
        question_type: "radio",
        options: Some(&["Sí", "No"]),
        required: true,
        order: 7,
    },
    SeedQuestion {
        section: "Impedimentos y Mejoras",
        text: "Si respondiste sí, especifica cuáles impedimentos enfrentas:",
        question_type: "textarea",
        options: None,
        required: false,
        order: 8,
    },
    SeedQuestion {
        section: "Impedimentos y Mejoras",
        text: "¿Crees que se pueden mejorar los protocolos actuales de trabajo?",
        question_type: "radio",
        options: Some(&["Sí", "No", "No estoy seguro"]),
        required: true,
        order: 9,
    },
    // Sección 4: Ambiente Laboral
    SeedQuestion {
        section: "Ambiente Laboral",
        text: "¿Cómo calificarías el ambiente laboral en PowerCars?",
        question_type: "radio",
        options: Some(&["Excelente", "Muy bueno", "Bueno", "Regular", "Malo"]),
        required: true,
        order: 10,
    },
    SeedQuestion {
        section: "Ambiente Laboral",
        text: "¿Te sientes valorado por tu trabajo?",
        question_type: "radio",
        options: Some(&["Siempre", "Frecuentemente", "A veces", "Raramente", "Nunca"]),
        required: true,
        order: 11,
    },
    SeedQuestion {
        section: "Ambiente Laboral",
        text: "¿Cómo es la comunicación entre compañeros de trabajo?",
        question_type: "radio",
        options: Some(&["Excelente", "Muy buena", "Buena", "Regular", "Mala"]),
        required: true,
        order: 12,
    },
    // Sección 5: Condiciones Laborales
    SeedQuestion {
        section: "Condiciones Laborales",
        text: "¿Cómo evalúas los horarios de trabajo actuales?",
        question_type: "radio",
        options: Some(&[
            "Muy adecuados",
            "Adecuados",
            "Aceptables",
            "Inadecuados",
            "Muy inadecuados",
        ]),
        required: true,
        order: 13,
    },
    SeedQuestion {
        section: "Condiciones Laborales",
        text: "¿Tienes acceso a todas las herramientas necesarias para tu trabajo?",
        question_type: "radio",
        options: Some(&["Sí", "No", "Parcialmente"]),
        required: true,
        order: 14,
    },
    // Sección 6: Experiencia General
    SeedQuestion {
        section: "Experiencia General",
        text: "En una escala del 1 al 10, ¿cómo calificarías tu experiencia trabajando en PowerCars?",
        question_type: "scale",
        options: Some(&["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]),
        required: true,
        order: 15,
    },
    SeedQuestion {
        section: "Experiencia General",
        text: "¿Qué es lo que más te gusta de trabajar aquí?",
        question_type: "textarea",
        options: None,
        required: false,
        order: 16,
    },
    SeedQuestion {
        section: "Experiencia General",
        text: "¿Tienes ideas específicas que crees sería ideal implementar?",
        question_type: "textarea",
        options: None,
        required: false,
        order: 17,
    },
    SeedQuestion {
        section: "Experiencia General",
        text: "Observaciones extras o comentarios adicionales:",
        question_type: "textarea",
        options: None,
        required: false,
        order: 18,
    },
];

/// Load the active survey template, if any
pub async fn active_template(pool: &SqlitePool) -> Result<Option<SurveyTemplate>> {
    let row = sqlx::query(
        "SELECT id, title, description, version, is_active, created_by \
         FROM survey_templates WHERE is_active = 1",
    )
    .fetch_optional(pool)
    .await?;

    row.map(|row| template_from_row(&row)).transpose()
}

/// Load the active template, seeding the default questionnaire if none exists
///
/// Idempotent: a second call finds the template created by the first. If two
/// requests race on an empty store, the unique active index rejects the
/// second insert and the loser re-reads.
pub async fn get_or_seed_active_template(pool: &SqlitePool) -> Result<SurveyTemplate> {
    if let Some(template) = active_template(pool).await? {
        return Ok(template);
    }

    match seed_default_template(pool).await {
        Ok(template) => Ok(template),
        Err(Error::Database(e)) if is_unique_violation(&e) => active_template(pool)
            .await?
            .ok_or_else(|| Error::Internal("active template missing after seed race".to_string())),
        Err(e) => Err(e),
    }
}

/// Insert the default template and its 18 questions in one transaction
async fn seed_default_template(pool: &SqlitePool) -> Result<SurveyTemplate> {
    let template_id = Uuid::new_v4().to_string();

    let created_by: Option<String> =
        sqlx::query_scalar("SELECT id FROM users WHERE username = 'admin'")
            .fetch_optional(pool)
            .await?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO survey_templates (id, title, description, is_active, created_by) \
         VALUES (?, ?, ?, 1, ?)",
    )
    .bind(&template_id)
    .bind("Encuesta Organizacional PowerCars 2025")
    .bind("Encuesta para mapear la estructura organizacional y identificar áreas de mejora")
    .bind(&created_by)
    .execute(&mut *tx)
    .await?;

    for seed in DEFAULT_QUESTIONS {
        let options_json = seed
            .options
            .map(|opts| serde_json::to_string(opts))
            .transpose()
            .map_err(|e| Error::Internal(format!("Failed to serialize options: {}", e)))?;

        sqlx::query(
            "INSERT INTO questions \
             (id, survey_template_id, section_name, question_text, question_type, options, is_required, order_index) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&template_id)
        .bind(seed.section)
        .bind(seed.text)
        .bind(seed.question_type)
        .bind(&options_json)
        .bind(seed.required)
        .bind(seed.order)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!("Seeded default survey template ({} questions)", DEFAULT_QUESTIONS.len());

    Ok(SurveyTemplate {
        id: template_id,
        title: "Encuesta Organizacional PowerCars 2025".to_string(),
        description: Some(
            "Encuesta para mapear la estructura organizacional y identificar áreas de mejora"
                .to_string(),
        ),
        version: "1.0".to_string(),
        is_active: true,
        created_by,
    })
}

/// All questions of a template, in presentation order
pub async fn questions_for_template(
    pool: &SqlitePool,
    template_id: &str,
) -> Result<Vec<Question>> {
    let rows = sqlx::query(
        "SELECT id, survey_template_id, section_name, question_text, question_type, \
                options, is_required, order_index, validation_rules \
         FROM questions WHERE survey_template_id = ? ORDER BY order_index",
    )
    .bind(template_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(question_from_row).collect()
}

/// Find a question whose text contains the given fragment
///
/// Analytics locate questions by substring-matching the seeded display text.
/// Ordered by order_index so the match is deterministic.
pub async fn find_question_by_text(
    pool: &SqlitePool,
    fragment: &str,
) -> Result<Option<Question>> {
    let pattern = format!("%{}%", fragment);

    let row = sqlx::query(
        "SELECT id, survey_template_id, section_name, question_text, question_type, \
                options, is_required, order_index, validation_rules \
         FROM questions WHERE question_text LIKE ? ORDER BY order_index LIMIT 1",
    )
    .bind(&pattern)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(question_from_row).transpose()
}

/// Check whether a question exists
pub async fn question_exists(pool: &SqlitePool, question_id: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM questions WHERE id = ?)")
        .bind(question_id)
        .fetch_one(pool)
        .await?;

    Ok(exists)
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}

fn template_from_row(row: &SqliteRow) -> Result<SurveyTemplate> {
    Ok(SurveyTemplate {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        version: row.get("version"),
        is_active: row.get::<i64, _>("is_active") != 0,
        created_by: row.get("created_by"),
    })
}

fn question_from_row(row: &SqliteRow) -> Result<Question> {
    let options: Option<String> = row.get("options");
    let options = options
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse question options: {}", e)))?;

    let validation_rules: Option<String> = row.get("validation_rules");
    let validation_rules = validation_rules
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse validation rules: {}", e)))?;

    Ok(Question {
        id: row.get("id"),
        survey_template_id: row.get("survey_template_id"),
        section_name: row.get("section_name"),
        question_text: row.get("question_text"),
        question_type: row.get("question_type"),
        options,
        is_required: row.get::<i64, _>("is_required") != 0,
        order_index: row.get("order_index"),
        validation_rules,
    })
}
