use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,
    pub cors_allow_any_origin: Option<bool>,
    pub max_upload_bytes: Option<usize>,

    // Feature configs
    pub pagination: Option<PaginationConfig>,
    pub difficulty: Option<DifficultyConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page_size: Option<usize>,
    pub max_page_size: Option<usize>,
    pub read_pool_size: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DifficultyConfig {
    /// Base URL of the difficulty service; uploads are disabled without it.
    pub url: Option<String>,
    pub timeout_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
