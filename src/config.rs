use serde::Deserialize;
use tracing::warn;

pub const MAX_SESSION_TTL_DAYS: i64 = 3650;
const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

const DEV_SESSION_SECRET: &str = "dev-session-secret-change-me-in-production";

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_days: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub db_path: String,
    pub host: String,
    pub port: u16,
    pub seed_data: bool,
    pub allowed_origins: Vec<String>,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = match std::env::var("SESSION_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                warn!("SESSION_SECRET not set; using the development secret");
                DEV_SESSION_SECRET.to_string()
            }
        };
        let session = SessionConfig {
            secret,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "tasklist".into()),
            ttl_days: parse_ttl_days(std::env::var("SESSION_TTL_DAYS").ok().as_deref()),
            cookie_secure: env_flag("COOKIE_SECURE"),
        };

        let port = match std::env::var("PORT") {
            Ok(p) => p.parse::<u16>()?,
            Err(_) => 8080,
        };

        Ok(Self {
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "./data/todo.db".into()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            seed_data: env_flag("SEED_DATA"),
            allowed_origins: parse_origins(
                &std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:5173".into()),
            ),
            session,
        })
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Falls back to the default for anything outside `1..=MAX_SESSION_TTL_DAYS`.
fn parse_ttl_days(raw: Option<&str>) -> i64 {
    let Some(raw) = raw else {
        return DEFAULT_SESSION_TTL_DAYS;
    };
    match raw.trim().parse::<i64>() {
        Ok(d) if (1..=MAX_SESSION_TTL_DAYS).contains(&d) => d,
        _ => {
            warn!(value = %raw, "SESSION_TTL_DAYS out of range; using the default");
            DEFAULT_SESSION_TTL_DAYS
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}
