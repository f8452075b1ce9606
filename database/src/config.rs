use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        Ok(Self {
            database_url,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            max_connections: parse_or("DB_MAX_CONNECTIONS", 20),
            min_connections: parse_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_seconds: parse_or("DB_CONNECT_TIMEOUT", 30),
            idle_timeout_seconds: parse_or("DB_IDLE_TIMEOUT", 600),
        })
    }

    pub fn new(database_url: String, redis_url: Option<String>) -> Self {
        Self {
            database_url,
            redis_url,
            max_connections: 20,
            min_connections: 2,
            connect_timeout_seconds: 30,
            idle_timeout_seconds: 600,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_requires_database_url() {
        env::remove_var("DATABASE_URL");
        assert!(DatabaseConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_reads_pool_sizes() {
        env::set_var("DATABASE_URL", "postgres://localhost/courier");
        env::set_var("DB_MAX_CONNECTIONS", "7");
        env::set_var("REDIS_URL", "");

        let config = DatabaseConfig::from_env().unwrap();
        assert_eq!(config.max_connections, 7);
        assert_eq!(config.min_connections, 2);
        assert!(config.redis_url.is_none());

        env::remove_var("DATABASE_URL");
        env::remove_var("DB_MAX_CONNECTIONS");
        env::remove_var("REDIS_URL");
    }
}
