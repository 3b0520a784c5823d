//! API token and password credential helpers
//!
//! Dashboard and report routes require a bearer token. The expected token
//! lives in the `settings` table under `api_bearer_token`: it is generated on
//! first startup, and an empty stored value disables checking entirely.
//!
//! Token verification against incoming requests is HTTP-framework specific and
//! lives in the service crate; this module contains only pure functions and
//! database operations.

use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::Result;

/// Settings key holding the dashboard/reports bearer token
pub const API_TOKEN_SETTING_KEY: &str = "api_bearer_token";

/// Load the API bearer token from the settings table
///
/// If no token has been stored yet, a fresh one is generated and persisted.
/// An empty stored value is returned as-is (auth disabled).
pub async fn load_api_token(db: &SqlitePool) -> Result<String> {
    let result: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(API_TOKEN_SETTING_KEY)
            .fetch_optional(db)
            .await?;

    match result {
        Some(value) => Ok(value.unwrap_or_default()),
        None => initialize_api_token(db).await,
    }
}

/// Generate and store a fresh API bearer token
pub async fn initialize_api_token(db: &SqlitePool) -> Result<String> {
    let token = generate_token();

    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(API_TOKEN_SETTING_KEY)
        .bind(&token)
        .execute(db)
        .await?;

    Ok(token)
}

/// Generate a random 32-hex-character token
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    format!("{:032x}", rng.gen::<u128>())
}

/// Generate a random 32-hex-character password salt
pub fn generate_salt() -> String {
    let mut rng = rand::thread_rng();
    format!("{:032x}", rng.gen::<u128>())
}

/// Hash a password with its salt
///
/// SHA-256 over salt followed by password, rendered as 64 hex characters.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}
