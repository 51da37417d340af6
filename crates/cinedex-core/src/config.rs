use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

/// Environment variable that supplies the TMDB key when the config leaves it empty.
pub const TMDB_API_KEY_ENV: &str = "TMDB_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub profile_store: ProfileStoreConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub recommendations: RecommendationConfig,
}

/// Metadata API (TMDB v3) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Hosted document store (Firestore REST) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileStoreConfig {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub api_key: String,
    /// Bearer token for the signed-in user, if the security rules need one.
    #[serde(default)]
    pub id_token: Option<String>,
    /// How often a collection subscription re-reads the server.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiescence window after the last keystroke before a request fires.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            image_base_url: default_image_base_url(),
            api_key: String::new(),
            language: default_language(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ProfileStoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            api_key: String::new(),
            id_token: None,
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
        }
    }
}

impl CatalogConfig {
    /// The configured key, or `TMDB_API_KEY` from the environment when unset.
    pub fn resolved_api_key(&self) -> String {
        if self.api_key.is_empty() {
            std::env::var(TMDB_API_KEY_ENV).unwrap_or_default()
        } else {
            self.api_key.clone()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ProfileStoreConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_catalog_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_image_base_url() -> String {
    "https://image.tmdb.org/t/p/original".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_max_results() -> usize {
    crate::recommend::DEFAULT_MAX_RESULTS
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search.debounce_ms, 300);
        assert_eq!(
            config.recommendations.max_results,
            crate::recommend::DEFAULT_MAX_RESULTS
        );
        assert!(config.catalog.base_url.starts_with("https://"));
        assert_eq!(config.profile_store.poll_interval(), Duration::from_secs(5));
        assert!(Config::config_path().ends_with("cinedex/config.toml"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [catalog]
            api_key = "abc"

            [search]
            debounce_ms = 120
            "#,
        )
        .unwrap();
        assert_eq!(config.catalog.api_key, "abc");
        assert_eq!(config.catalog.language, "en-US");
        assert_eq!(config.search.debounce(), Duration::from_millis(120));
        assert_eq!(config.recommendations.max_results, 6);
        assert!(config.profile_store.id_token.is_none());
    }

    #[test]
    fn test_explicit_key_wins_over_env() {
        let catalog = CatalogConfig {
            api_key: "from-file".to_string(),
            ..CatalogConfig::default()
        };
        assert_eq!(catalog.resolved_api_key(), "from-file");
    }

    #[test]
    fn test_poll_interval_never_zero() {
        let store = ProfileStoreConfig {
            poll_interval_secs: 0,
            ..ProfileStoreConfig::default()
        };
        assert_eq!(store.poll_interval(), Duration::from_secs(1));
    }
}
