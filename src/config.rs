// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;

/// Default page size for the admin student listing.
pub const DEFAULT_STUDENTS_PER_PAGE: i64 = 10;

/// Default page size for the admin result listing.
pub const DEFAULT_RESULTS_PER_PAGE: i64 = 20;

/// Seconds a late submission is still treated as on time.
pub const DEFAULT_EXAM_GRACE_SECONDS: i64 = 30;

/// Upper bound for request bodies (16 MiB).
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub server_port: u16,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub students_per_page: i64,
    pub results_per_page: i64,
    pub exam_grace_seconds: i64,
}

impl Config {
    /// Reads configuration from the process environment (and `.env`).
    ///
    /// Only `JWT_SECRET` is mandatory; everything else falls back to a
    /// development default.
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://exam_system.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET")?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration: parse_or("JWT_EXPIRATION", 7200),
            rust_log,
            server_port: parse_or("SERVER_PORT", 3000),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            students_per_page: parse_or("STUDENTS_PER_PAGE", DEFAULT_STUDENTS_PER_PAGE),
            results_per_page: parse_or("RESULTS_PER_PAGE", DEFAULT_RESULTS_PER_PAGE),
            exam_grace_seconds: parse_or("EXAM_GRACE_SECONDS", DEFAULT_EXAM_GRACE_SECONDS),
        })
    }

    /// A configuration suitable for tests: in-memory database, short-lived
    /// tokens and no seeded admin.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: jwt_secret.to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            server_port: 0,
            admin_email: None,
            admin_password: None,
            students_per_page: DEFAULT_STUDENTS_PER_PAGE,
            results_per_page: DEFAULT_RESULTS_PER_PAGE,
            exam_grace_seconds: DEFAULT_EXAM_GRACE_SECONDS,
        }
    }
}

/// Parses an optional variable, logging and falling back on garbage values.
fn parse_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
