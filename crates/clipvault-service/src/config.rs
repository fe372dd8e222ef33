//! Service configuration.
//!
//! Configuration is loaded from a TOML file (default:
//! `~/.config/clipvault/config.toml`) with environment-variable fallback
//! (`CLIPVAULT_*`). Both remote credentials are user-supplied; validation
//! reports every problem at once so a fresh install sees the full list.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use clipvault_core::{defaults, Error, Result};
use clipvault_index::PineconeConfig;
use clipvault_inference::HuggingFaceConfig;

/// Embedding endpoint section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSection {
    /// Bearer token for the hosted inference API.
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub timeout_seconds: u64,
}

impl Default for InferenceSection {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: defaults::INFERENCE_BASE_URL.to_string(),
            model: defaults::EMBED_MODEL.to_string(),
            dimension: defaults::EMBED_DIMENSION,
            timeout_seconds: defaults::EMBED_TIMEOUT_SECS,
        }
    }
}

/// Vector index section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSection {
    /// API key sent in the `Api-Key` header.
    pub api_key: String,
    pub index_name: String,
    pub project_id: String,
    pub environment: String,
    /// Explicit data-plane host; overrides the synthesized one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_host: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            index_name: String::new(),
            project_id: String::new(),
            environment: "us-east-1-aws".to_string(),
            custom_host: None,
            timeout_seconds: defaults::INDEX_TIMEOUT_SECS,
        }
    }
}

/// Local storage section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Directory holding the snapshot and journal. Defaults to the
    /// platform data dir under `clipvault/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl StoreSection {
    /// Resolve the data directory.
    pub fn resolved_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from(".local/share"));
        path.push("clipvault");
        path
    }
}

/// Main clipvault configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipvaultConfig {
    pub inference: InferenceSection,
    pub index: IndexSection,
    pub store: StoreSection,
}

impl ClipvaultConfig {
    /// Get the default config file path.
    ///
    /// Returns: ~/.config/clipvault/config.toml
    pub fn default_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        path.push("clipvault");
        path.push("config.toml");
        path
    }

    /// Load configuration from the default path, falling back to
    /// environment variables when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::default_config_path();
        if path.exists() {
            info!("Loading config from: {}", path.display());
            Self::from_file(&path)
        } else {
            debug!(
                "Config file not found at {}, using environment variables",
                path.display()
            );
            Ok(Self::from_env())
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read({}): {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("parse({}): {}", path.display(), e)))
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = std::env::var("CLIPVAULT_HF_API_KEY") {
            config.inference.api_key = v;
        }
        if let Ok(v) = std::env::var("CLIPVAULT_HF_BASE_URL") {
            config.inference.base_url = v;
        }
        if let Ok(v) = std::env::var("CLIPVAULT_EMBED_MODEL") {
            config.inference.model = v;
        }
        if let Ok(v) = std::env::var("CLIPVAULT_EMBED_DIM") {
            if let Ok(dim) = v.parse() {
                config.inference.dimension = dim;
            }
        }
        if let Ok(v) = std::env::var("CLIPVAULT_INDEX_API_KEY") {
            config.index.api_key = v;
        }
        if let Ok(v) = std::env::var("CLIPVAULT_INDEX_NAME") {
            config.index.index_name = v;
        }
        if let Ok(v) = std::env::var("CLIPVAULT_INDEX_PROJECT") {
            config.index.project_id = v;
        }
        if let Ok(v) = std::env::var("CLIPVAULT_INDEX_ENVIRONMENT") {
            config.index.environment = v;
        }
        if let Ok(v) = std::env::var("CLIPVAULT_INDEX_HOST") {
            config.index.custom_host = Some(v);
        }
        if let Ok(v) = std::env::var("CLIPVAULT_DATA_DIR") {
            config.store.data_dir = Some(PathBuf::from(v));
        }
        config
    }

    /// Validate the configuration, reporting every problem at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.inference.api_key.len() < defaults::MIN_API_KEY_LEN {
            errors.push(
                "Embedding API key not configured; set inference.api_key or CLIPVAULT_HF_API_KEY",
            );
        }
        if !self.inference.base_url.starts_with("http://")
            && !self.inference.base_url.starts_with("https://")
        {
            errors.push("inference.base_url must start with http:// or https://");
        }
        if self.index.api_key.len() < defaults::MIN_API_KEY_LEN {
            errors.push(
                "Index API key not configured; set index.api_key or CLIPVAULT_INDEX_API_KEY",
            );
        }
        if self.index.custom_host.is_none()
            && (self.index.index_name.is_empty()
                || self.index.project_id.is_empty()
                || self.index.environment.is_empty())
        {
            errors.push(
                "Index host unresolvable; set index.custom_host or index_name/project_id/environment",
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(errors.join("; ")))
        }
    }

    /// Embedding backend configuration for this config.
    pub fn inference_config(&self) -> HuggingFaceConfig {
        HuggingFaceConfig {
            base_url: self.inference.base_url.clone(),
            api_key: self.inference.api_key.clone(),
            model: self.inference.model.clone(),
            dimension: self.inference.dimension,
            timeout_seconds: self.inference.timeout_seconds,
        }
    }

    /// Index client configuration for this config.
    pub fn index_config(&self) -> PineconeConfig {
        PineconeConfig {
            api_key: self.index.api_key.clone(),
            index_name: self.index.index_name.clone(),
            project_id: self.index.project_id.clone(),
            environment: self.index.environment.clone(),
            custom_host: self.index.custom_host.clone(),
            timeout_seconds: self.index.timeout_seconds,
        }
    }
}
