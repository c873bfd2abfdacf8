//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::imagehost::{IMGUR_API_URL, ImgurClient};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

const MIN_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Darkroom",
    about = "Photography portfolio backend with JWT authentication"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "darkroom.db")]
    pub database: String,

    /// Path to file containing the access token secret. Prefer the JWT_SECRET env var instead
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer the REFRESH_TOKEN_SECRET env var instead
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Base URL of the image hosting API
    #[arg(long, default_value = IMGUR_API_URL)]
    pub imgur_api_url: String,

    /// Imgur API client ID (can also be set via IMGUR_CLIENT_ID env var)
    #[arg(long, env = "IMGUR_CLIENT_ID")]
    pub imgur_client_id: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load a token secret from an environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_name: &str, secret_file: Option<&str>) -> Option<Vec<u8>> {
    let secret = if let Ok(secret) = std::env::var(env_name) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_name) };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            "Token secret is required. Set the {} environment variable (recommended) or use the secret file flag",
            env_name
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_name, MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret.into_bytes())
}

/// Build the Imgur client from arguments.
/// Returns None and logs an error if no client ID is configured.
pub fn build_image_host(api_url: &str, client_id: Option<String>) -> Option<ImgurClient> {
    let Some(client_id) = client_id.filter(|id| !id.is_empty()) else {
        error!("Imgur client ID is required. Set IMGUR_CLIENT_ID or use --imgur-client-id");
        return None;
    };

    Some(ImgurClient::new(client_id, api_url.to_string()))
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
    image_host: ImgurClient,
) -> ServerConfig {
    ServerConfig {
        db,
        access_secret,
        refresh_secret,
        image_host: Arc::new(image_host),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
