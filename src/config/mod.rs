mod file_config;

pub use file_config::{DifficultyConfig, FileConfig, PaginationConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3002;
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_READ_POOL_SIZE: usize = 4;
pub const DEFAULT_DIFFICULTY_TIMEOUT_SEC: u64 = 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub read_pool_size: usize,
    pub difficulty_service_url: Option<String>,
    pub difficulty_timeout_sec: u64,
    pub cors_allow_any_origin: bool,
    pub max_upload_bytes: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            db_dir: None,
            port: DEFAULT_PORT,
            logging_level: RequestsLoggingLevel::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            read_pool_size: DEFAULT_READ_POOL_SIZE,
            difficulty_service_url: None,
            difficulty_timeout_sec: DEFAULT_DIFFICULTY_TIMEOUT_SEC,
            cors_allow_any_origin: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub cors_allow_any_origin: bool,
    pub max_upload_bytes: usize,
    pub pagination: PaginationSettings,
    pub difficulty: DifficultySettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationSettings {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub read_pool_size: usize,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            read_pool_size: DEFAULT_READ_POOL_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifficultySettings {
    /// Uploads are disabled when no URL is set.
    pub url: Option<String>,
    pub timeout_sec: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let cors_allow_any_origin = file
            .cors_allow_any_origin
            .unwrap_or(cli.cors_allow_any_origin);
        let max_upload_bytes = file.max_upload_bytes.unwrap_or(cli.max_upload_bytes);
        if max_upload_bytes == 0 {
            bail!("max_upload_bytes must be positive");
        }

        let pagination_file = file.pagination.unwrap_or_default();
        let pagination = PaginationSettings {
            default_page_size: pagination_file
                .default_page_size
                .unwrap_or(cli.default_page_size),
            max_page_size: pagination_file.max_page_size.unwrap_or(cli.max_page_size),
            read_pool_size: pagination_file.read_pool_size.unwrap_or(cli.read_pool_size),
        };
        if pagination.max_page_size == 0 {
            bail!("max_page_size must be positive");
        }
        if pagination.default_page_size == 0
            || pagination.default_page_size > pagination.max_page_size
        {
            bail!(
                "default_page_size {} must be between 1 and max_page_size {}",
                pagination.default_page_size,
                pagination.max_page_size
            );
        }
        if pagination.read_pool_size == 0 {
            bail!("read_pool_size must be positive");
        }

        let difficulty_file = file.difficulty.unwrap_or_default();
        let difficulty_url = difficulty_file
            .url
            .or_else(|| cli.difficulty_service_url.clone())
            .filter(|url| !url.trim().is_empty());
        let difficulty = DifficultySettings {
            url: difficulty_url,
            timeout_sec: difficulty_file
                .timeout_sec
                .unwrap_or(cli.difficulty_timeout_sec),
        };

        Ok(Self {
            db_dir,
            port,
            logging_level,
            cors_allow_any_origin,
            max_upload_bytes,
            pagination,
            difficulty,
        })
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        self.db_dir.join("catalog.db")
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
