use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_name: String,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub bind_address: String,
    pub frontend_origin: String,
    /// Re-check parent list ownership on PUT/DELETE /tasks/{id}.
    pub strict_task_ownership: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "DATABASE_MAX_CONNECTIONS",
                value: raw,
            })?,
            Err(_) => 5,
        };
        let strict_task_ownership = match env::var("STRICT_TASK_OWNERSHIP") {
            Ok(raw) => parse_flag(&raw).ok_or(ConfigError::Invalid {
                name: "STRICT_TASK_OWNERSHIP",
                value: raw,
            })?,
            Err(_) => true,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://tasklists.db".to_string()),
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "tasklists".to_string()),
            max_connections,
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            frontend_origin: env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            strict_task_ownership,
        })
    }

    pub fn uses_mongodb(&self) -> bool {
        self.database_url.starts_with("mongodb://")
            || self.database_url.starts_with("mongodb+srv://")
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
