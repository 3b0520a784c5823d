//! encuesta-srv - Survey administration backend
//!
//! Serves the active questionnaire, records one response session per
//! respondent, and exposes aggregate analytics to authenticated dashboard
//! consumers.

use anyhow::Result;
use clap::Parser;
use encuesta_common::api::auth::load_api_token;
use encuesta_common::config::{database_path, ensure_root_folder, resolve_root_folder};
use encuesta_common::db::init_database;
use encuesta_srv::{build_router, AppState};
use std::net::SocketAddr;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "encuesta-srv", about = "Survey administration backend")]
struct Cli {
    /// Root folder holding the database (overrides ENCUESTA_ROOT_FOLDER)
    #[arg(long)]
    root_folder: Option<String>,

    /// Port to listen on
    #[arg(long, env = "ENCUESTA_PORT", default_value_t = 5001)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Encuesta survey backend (encuesta-srv) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli = Cli::parse();

    let root_folder = resolve_root_folder(cli.root_folder.as_deref(), "ENCUESTA_ROOT_FOLDER")?;
    ensure_root_folder(&root_folder)?;

    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let api_token = load_api_token(&pool).await?;
    if api_token.is_empty() {
        info!("API authentication disabled (empty api_bearer_token)");
    } else {
        info!("✓ Loaded API bearer token for dashboard/reports authentication");
    }

    // Create application state and router
    let state = AppState::new(pool, api_token);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cli.port)).await?;
    info!("encuesta-srv listening on http://0.0.0.0:{}", cli.port);
    info!("Health check: http://0.0.0.0:{}/health", cli.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
