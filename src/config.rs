use std::env;

use anyhow::{anyhow, Context};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub log_level: String,
}

impl AppConfig {
    /// Loads `.env` if present, then reads settings from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let max_connections = get_var_or("DB_MAX_CONNECTIONS", "5");
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow!("DATABASE_URL must be set to a Postgres instance"))?,
            max_connections: max_connections
                .parse()
                .with_context(|| format!("invalid DB_MAX_CONNECTIONS '{max_connections}'"))?,
            log_level: get_var_or("LOG_LEVEL", "info"),
        })
    }
}

fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}
