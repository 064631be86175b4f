//! CLI argument parsing, validation, and startup helpers.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use tracing::{error, info};

use crate::ServerConfig;
use crate::auth::{CookieSettings, DEFAULT_ACCESS_COOKIE, DEFAULT_REFRESH_COOKIE};
use crate::db::Database;
use crate::jwt::{self, DEFAULT_ACCESS_TTL_MS, DEFAULT_REFRESH_TTL_MS};
use crate::password;

/// Minimum decoded signing secret length in bytes (HS256 key size).
const MIN_SECRET_BYTES: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Wrengate",
    about = "Token-based authentication service with silent refresh"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7420")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "wrengate.db")]
    pub database: String,

    /// Path to file containing the base64-encoded signing secret.
    /// Prefer using the SIGNING_SECRET env var instead
    #[arg(long)]
    pub signing_secret_file: Option<String>,

    /// Access token lifetime in milliseconds
    #[arg(long, default_value_t = DEFAULT_ACCESS_TTL_MS)]
    pub access_ttl_ms: u64,

    /// Refresh token lifetime in milliseconds
    #[arg(long, default_value_t = DEFAULT_REFRESH_TTL_MS)]
    pub refresh_ttl_ms: u64,

    /// Cookie name for the access token
    #[arg(long, default_value = DEFAULT_ACCESS_COOKIE)]
    pub access_cookie_name: String,

    /// Cookie name for the refresh token
    #[arg(long, default_value = DEFAULT_REFRESH_COOKIE)]
    pub refresh_cookie_name: String,

    /// Set the Secure attribute on cookies (use behind HTTPS)
    #[arg(long)]
    pub secure_cookies: bool,

    /// Create an admin user on startup and print its generated password
    #[arg(long)]
    pub create_admin: bool,

    /// Disable new user signups (admin creation via --create-admin still works)
    #[arg(long)]
    pub no_signup: bool,

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

/// Load the signing secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_signing_secret(signing_secret_file: Option<&str>) -> Option<Vec<u8>> {
    let encoded = if let Ok(secret) = std::env::var("SIGNING_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("SIGNING_SECRET") };
        secret
    } else if let Some(path) = signing_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read signing secret file");
                return None;
            }
        }
    } else {
        error!(
            "Signing secret is required. Set SIGNING_SECRET environment variable (recommended) or use --signing-secret-file"
        );
        return None;
    };

    let secret = match STANDARD.decode(encoded.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "Signing secret is not valid base64");
            return None;
        }
    };

    if secret.len() < MIN_SECRET_BYTES {
        error!(
            "Signing secret decodes to fewer than {} bytes. Use a longer secret",
            MIN_SECRET_BYTES
        );
        return None;
    }

    Some(secret)
}

/// Handle the --create-admin flag: create an admin user with a generated
/// password, printed once to stdout. A no-op if the admin already exists.
pub async fn handle_create_admin(db: &Database) {
    match db.users().username_exists("admin").await {
        Ok(true) => {
            println!();
            println!("Admin user already exists: admin");
            println!();
        }
        Ok(false) => {
            let generated = jwt::issue_refresh_value();
            let hashed = match password::hash(&generated) {
                Ok(hashed) => hashed,
                Err(e) => {
                    error!(error = %e, "Failed to hash admin password");
                    std::process::exit(1);
                }
            };

            match db.users().create_admin("admin", &hashed).await {
                Ok(_) => {
                    println!();
                    println!("Admin user created: admin");
                    println!("Password (shown once): {}", generated);
                    println!();
                }
                Err(e) => {
                    error!(error = %e, "Failed to create admin user");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing admin");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, signing_secret: Vec<u8>) -> ServerConfig {
    ServerConfig {
        db,
        signing_secret,
        access_ttl: std::time::Duration::from_millis(args.access_ttl_ms),
        refresh_ttl: std::time::Duration::from_millis(args.refresh_ttl_ms),
        cookies: CookieSettings::new(
            args.access_cookie_name.clone(),
            args.refresh_cookie_name.clone(),
            args.secure_cookies,
        ),
        no_signup: args.no_signup,
        relaxed_rate_limits: false,
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
