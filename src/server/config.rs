use super::RequestsLoggingLevel;
use crate::config::{
    AppConfig, DEFAULT_MAX_PAGE_SIZE, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PAGE_SIZE, DEFAULT_PORT,
};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Page size used when a request does not name one, and the number of
    /// pieces returned next to a difficulty estimate.
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub cors_allow_any_origin: bool,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: DEFAULT_PORT,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            cors_allow_any_origin: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl From<&AppConfig> for ServerConfig {
    fn from(config: &AppConfig) -> Self {
        ServerConfig {
            requests_logging_level: config.logging_level.clone(),
            port: config.port,
            default_page_size: config.pagination.default_page_size,
            max_page_size: config.pagination.max_page_size,
            cors_allow_any_origin: config.cors_allow_any_origin,
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}
