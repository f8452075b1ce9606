pub mod feature_toggles;

use std::str::FromStr;
use std::time::Duration;

use feature_toggles::FeatureToggles;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

/// Runtime settings shared by the Courier services.
#[derive(Clone, Debug)]
pub struct ServiceSettings {
    pub service_name: String,
    pub port: u16,
    pub environment: String,
    pub db_timeout: Duration,
    pub cache_timeout: Duration,
    pub report_cache_ttl_secs: u64,
    pub dashboard_cache_ttl_secs: u64,
    pub contact_cache_ttl_secs: u64,
    pub group_cache_ttl_secs: u64,
    pub feature_toggles: FeatureToggles,
}

impl ServiceSettings {
    /// Defaults used when no environment overrides are present.
    pub fn with_defaults(service_name: impl Into<String>, default_port: u16) -> Self {
        Self {
            service_name: service_name.into(),
            port: default_port,
            environment: "dev".to_string(),
            db_timeout: Duration::from_secs(5),
            cache_timeout: Duration::from_millis(500),
            report_cache_ttl_secs: 300,
            dashboard_cache_ttl_secs: 300,
            contact_cache_ttl_secs: 900,
            group_cache_ttl_secs: 1800,
            feature_toggles: FeatureToggles::default(),
        }
    }

    /// Load settings from the process environment (after `.env` has been applied).
    ///
    /// `PORT`, `ENVIRONMENT`, `DB_TIMEOUT_MS`, `CACHE_TIMEOUT_MS`,
    /// `REPORT_CACHE_TTL`, `DASHBOARD_CACHE_TTL`, `CONTACT_CACHE_TTL`, `GROUP_CACHE_TTL`.
    pub fn from_env(service_name: impl Into<String>, default_port: u16) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let defaults = Self::with_defaults(service_name, default_port);

        Ok(Self {
            port: env_or("PORT", defaults.port)?,
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            db_timeout: Duration::from_millis(env_or("DB_TIMEOUT_MS", 5_000u64)?),
            cache_timeout: Duration::from_millis(env_or("CACHE_TIMEOUT_MS", 500u64)?),
            report_cache_ttl_secs: env_or("REPORT_CACHE_TTL", defaults.report_cache_ttl_secs)?,
            dashboard_cache_ttl_secs: env_or("DASHBOARD_CACHE_TTL", defaults.dashboard_cache_ttl_secs)?,
            contact_cache_ttl_secs: env_or("CONTACT_CACHE_TTL", defaults.contact_cache_ttl_secs)?,
            group_cache_ttl_secs: env_or("GROUP_CACHE_TTL", defaults.group_cache_ttl_secs)?,
            feature_toggles: FeatureToggles::from_env_path(),
            service_name: defaults.service_name,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production" || self.environment == "prod"
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}
