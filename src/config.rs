use std::env;

use thiserror::Error;

/// Runtime settings read from the environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub telemetry: TelemetryConfig,
    pub template_id: i32,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set to a Postgres instance")]
    MissingDatabaseUrl,
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let max_connections = positive(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?;
        let template_id = positive(&lookup, "ASSESSMENT_TEMPLATE_ID", 1)?;
        let log_level = lookup("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            database: DatabaseConfig {
                url,
                max_connections,
            },
            telemetry: TelemetryConfig { log_level },
            template_id: template_id as i32,
        })
    }
}

fn positive<F>(lookup: &F, name: &'static str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<u32>() {
            Ok(parsed) if parsed > 0 && parsed <= i32::MAX as u32 => Ok(parsed),
            _ => Err(ConfigError::InvalidNumber { name, value }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/vc")]))
            .expect("config loads");

        assert_eq!(config.database.url, "postgres://localhost/vc");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.template_id, 1);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn missing_url_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDatabaseUrl));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/vc"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("ASSESSMENT_TEMPLATE_ID", "3"),
            ("APP_LOG_LEVEL", "debug"),
        ]))
        .expect("config loads");

        assert_eq!(config.database.max_connections, 12);
        assert_eq!(config.template_id, 3);
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn invalid_numbers_name_the_variable() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/vc"),
            ("DATABASE_MAX_CONNECTIONS", "zero"),
        ]))
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "DATABASE_MAX_CONNECTIONS must be a positive integer, got 'zero'"
        );
    }
}
