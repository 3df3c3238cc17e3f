//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$EMLDIGEST_CONFIG` (environment variable)
//! 2. `~/.config/emldigest/config.toml` (Linux/macOS)
//!    `%APPDATA%\emldigest\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Message store settings.
    pub store: StoreConfig,
    /// Classifier tuning.
    pub classify: ClassifyConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for the metadata cache and logs.
    pub cache_dir: Option<PathBuf>,
}

/// Message store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Ordered charset candidates tried when decoding a message body.
    /// The first successful strict decode wins.
    pub encodings: Vec<String>,
    /// Number of parsed messages kept in the in-process LRU cache.
    pub parsed_cache_size: usize,
}

/// Classifier tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Mean-shift bandwidth over L2-normalized TF-IDF vectors.
    pub bandwidth: f64,
    /// Stopword languages applied during tokenization ("english", "spanish").
    pub stopword_languages: Vec<String>,
    /// Sender addresses always treated as promotional.
    pub promotional_senders: Vec<String>,
    /// Use full sender display names instead of address domains in digest titles.
    pub debug_titles: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            encodings: vec!["utf-8".to_string(), "windows-1252".to_string()],
            parsed_cache_size: 50,
        }
    }
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            bandwidth: 0.99,
            stopword_languages: vec!["english".to_string()],
            promotional_senders: Vec::new(),
            debug_titles: false,
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    // 1. Environment variable override
    if let Ok(env_path) = std::env::var("EMLDIGEST_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    // 2. Standard config directory
    dirs::config_dir().map(|d| d.join("emldigest").join("config.toml"))
}

/// Return the cache directory for the metadata cache, logs, etc.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("emldigest")
}
