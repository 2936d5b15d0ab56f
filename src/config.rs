use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub upload_root: Utf8PathBuf,
    #[serde(default = "default_relative_prefix")]
    pub relative_prefix: String,
    #[serde(default)]
    pub google_api_key: Option<String>,
    #[serde(default = "default_content_timeout_secs")]
    pub content_timeout_secs: u64,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_max_height")]
    pub max_height: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_search_results")]
    pub search_results: usize,
    #[serde(default = "default_max_download_bytes")]
    pub max_download_bytes: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl PipelineConfig {
    pub fn new(upload_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            upload_root: upload_root.into(),
            relative_prefix: default_relative_prefix(),
            google_api_key: None,
            content_timeout_secs: default_content_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            max_width: default_max_width(),
            max_height: default_max_height(),
            jpeg_quality: default_jpeg_quality(),
            search_results: default_search_results(),
            max_download_bytes: default_max_download_bytes(),
            user_agent: default_user_agent(),
        }
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_secs(self.content_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

fn default_relative_prefix() -> String {
    "uploads".to_string()
}

fn default_content_timeout_secs() -> u64 {
    10
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_max_width() -> u32 {
    500
}

fn default_max_height() -> u32 {
    1000
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_search_results() -> usize {
    3
}

fn default_max_download_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: &str) -> Result<PipelineConfig, ResolveError> {
        let config_path = PathBuf::from(path);
        let content = fs::read_to_string(&config_path)
            .map_err(|_| ResolveError::ConfigRead(config_path.clone()))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|err| ResolveError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: PipelineConfig) -> Result<PipelineConfig, ResolveError> {
        if config.upload_root.as_str().trim().is_empty() {
            return Err(ResolveError::ConfigParse(
                "upload_root must not be empty".to_string(),
            ));
        }
        if !(1..=100).contains(&config.jpeg_quality) {
            return Err(ResolveError::ConfigParse(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                config.jpeg_quality
            )));
        }
        if config.max_width == 0 || config.max_height == 0 {
            return Err(ResolveError::ConfigParse(
                "max_width and max_height must be non-zero".to_string(),
            ));
        }
        if config.content_timeout_secs == 0 || config.probe_timeout_secs == 0 {
            return Err(ResolveError::ConfigParse(
                "timeouts must be non-zero".to_string(),
            ));
        }

        if config.max_download_bytes == 0 {
            return Err(ResolveError::ConfigParse(
                "max_download_bytes must be non-zero".to_string(),
            ));
        }

        let relative_prefix = config.relative_prefix.trim_matches('/').replace('\\', "/");
        let google_api_key = config
            .google_api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Ok(PipelineConfig {
            relative_prefix,
            google_api_key,
            ..config
        })
    }
}
