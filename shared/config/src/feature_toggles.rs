use serde::Deserialize;
use std::collections::HashMap;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct FeatureToggles {
    #[serde(flatten)]
    pub flags: HashMap<String, bool>,
}

impl FeatureToggles {
    // Load from a provided path or env var FEATURE_TOGGLES_PATH, defaulting to ./feature-toggles.json
    pub fn from_path(path: Option<String>) -> Self {
        let default_path = std::env::var("FEATURE_TOGGLES_PATH")
            .unwrap_or_else(|_| "feature-toggles.json".to_string());
        let path = path.unwrap_or(default_path);

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path, error = %e, "Malformed feature toggles file, using defaults");
                FeatureToggles::default()
            }),
            Err(_) => FeatureToggles::default(),
        }
    }

    pub fn from_env_path() -> Self {
        Self::from_path(None)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn is_enabled_or(&self, name: &str, default: bool) -> bool {
        self.flags.get(name).copied().unwrap_or(default)
    }

    // Redis backs the report/dashboard/contact caches; when off the in-memory store is used.
    // Defaults to true when the flag is missing.
    pub fn redis_enabled(&self) -> bool {
        self.is_enabled_or("Redis", true)
    }

    pub fn enabled_features(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .flags
            .iter()
            .filter(|(_, &enabled)| enabled)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_defaults_to_enabled() {
        let toggles = FeatureToggles::default();
        assert!(toggles.redis_enabled());
        assert!(!toggles.is_enabled("Redis"));
    }

    #[test]
    fn test_parses_flags() {
        let toggles: FeatureToggles =
            serde_json::from_str(r#"{"Redis": false, "Heatmap": true}"#).unwrap();
        assert!(!toggles.redis_enabled());
        assert_eq!(toggles.enabled_features(), vec!["Heatmap".to_string()]);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let toggles = FeatureToggles::from_path(Some("/nonexistent/toggles.json".to_string()));
        assert!(toggles.flags.is_empty());
    }
}
