use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::capability::{CapabilityRegistry, NamedCapability};
use crate::effectors::http::DEFAULT_TIMEOUT_SECS;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/apex.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub manifests: ManifestsConfig,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub search: SearchConfig,
    /// Coarse capability entries added to (or replacing) the builtin ones.
    #[serde(default)]
    pub capabilities: Vec<NamedCapability>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ManifestsConfig {
    /// Directory holding one `<skill>.json` per skill
    #[serde(default = "default_manifest_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GuardConfig {
    /// Extra protected directories, on top of the fixed system list
    #[serde(default)]
    pub protected_paths: Vec<String>,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Supports ${ENV_VAR} substitution; empty disables the provider
    #[serde(default)]
    pub you_api_key: String,
    /// Supports ${ENV_VAR} substitution; empty disables the provider
    #[serde(default)]
    pub bing_api_key: String,
    #[serde(default = "default_native_language")]
    pub native_language: String,
    #[serde(default = "default_foreign_language")]
    pub foreign_language: String,
}

fn default_manifest_dir() -> PathBuf {
    PathBuf::from("./manifests")
}

fn default_http_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_native_language() -> String {
    "ru".to_string()
}

fn default_foreign_language() -> String {
    "en".to_string()
}

impl Default for ManifestsConfig {
    fn default() -> Self {
        Self {
            dir: default_manifest_dir(),
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            protected_paths: vec![],
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            you_api_key: String::new(),
            bing_api_key: String::new(),
            native_language: default_native_language(),
            foreign_language: default_foreign_language(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            info!("No config at {path}, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        // Expand ${VAR} placeholders; unset variables become empty strings
        let expanded = shellexpand::env_with_context_no_errors(content, |var| {
            Some(std::env::var(var).unwrap_or_default())
        });
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.guard.http_timeout_secs)
    }

    /// Builtin capability entries with the configured ones applied on top.
    pub fn capability_registry(&self) -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::with_defaults();
        for named in &self.capabilities {
            registry.insert(&named.name, named.entry.clone());
        }
        registry
    }
}
