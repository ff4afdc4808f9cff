use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            _ => Environment::Production,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub cookie_name: String,
    pub max_age_secs: u64,
    pub secure: bool,
    pub prune_interval_secs: u64,
}

impl SessionConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub static_dir: String,
    pub cors_origin: Option<String>,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = required("DATABASE_URL")?;
        let session = SessionConfig {
            secret: required("SESSION_SECRET")?,
            cookie_name: std::env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "user.sid".into()),
            max_age_secs: parsed("SESSION_MAX_AGE_SECS").unwrap_or(24 * 60 * 60),
            secure: parsed("SESSION_COOKIE_SECURE").unwrap_or(true),
            prune_interval_secs: parsed("SESSION_PRUNE_INTERVAL_SECS").unwrap_or(15 * 60),
        };
        Ok(Self {
            database_url,
            db_max_connections: parsed("DB_MAX_CONNECTIONS").unwrap_or(10),
            environment: std::env::var("APP_ENV")
                .map(|v| Environment::parse(&v))
                .unwrap_or(Environment::Production),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parsed("APP_PORT").unwrap_or(3001),
            static_dir: std::env::var("STATIC_DIR").unwrap_or_else(|_| "client".into()),
            cors_origin: std::env::var("CORS_ORIGIN").ok().filter(|v| !v.trim().is_empty()),
            session,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    let value = std::env::var(key).with_context(|| format!("{key} environment variable is not set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("{key} environment variable is empty");
    }
    Ok(value)
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parsing_defaults_to_production() {
        assert_eq!(Environment::parse("development"), Environment::Development);
        assert_eq!(Environment::parse(" DEV "), Environment::Development);
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("staging"), Environment::Production);
    }

    #[test]
    fn session_max_age_is_seconds() {
        let cfg = SessionConfig {
            secret: "s".into(),
            cookie_name: "user.sid".into(),
            max_age_secs: 86_400,
            secure: true,
            prune_interval_secs: 900,
        };
        assert_eq!(cfg.max_age(), Duration::from_secs(24 * 60 * 60));
    }
}
