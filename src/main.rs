use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use score_catalog_server::config::{
    AppConfig, CliConfig, FileConfig, DEFAULT_DIFFICULTY_TIMEOUT_SEC, DEFAULT_MAX_PAGE_SIZE,
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PAGE_SIZE, DEFAULT_PORT, DEFAULT_READ_POOL_SIZE,
};
use score_catalog_server::difficulty::{DifficultyEstimator, HttpDifficultyEstimator};
use score_catalog_server::piece_store::{PieceStore, PieceStoreConfig, SqlitePieceStore};
use score_catalog_server::server::{run_server, RequestsLoggingLevel, ServerConfig};
use score_catalog_server::user::{SqliteUserStore, UserManager};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding catalog.db and user.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Optional TOML config file; its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Page size used when a request does not specify one.
    #[clap(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub default_page_size: usize,

    /// Largest page size a request may ask for.
    #[clap(long, default_value_t = DEFAULT_MAX_PAGE_SIZE)]
    pub max_page_size: usize,

    /// Number of read-only catalog connections.
    #[clap(long, default_value_t = DEFAULT_READ_POOL_SIZE)]
    pub read_pool_size: usize,

    /// URL of the difficulty estimation service. Score uploads are rejected
    /// when not set.
    #[clap(long)]
    pub difficulty_service_url: Option<String>,

    /// Timeout in seconds for difficulty service requests.
    #[clap(long, default_value_t = DEFAULT_DIFFICULTY_TIMEOUT_SEC)]
    pub difficulty_timeout_sec: u64,

    /// Whether to answer CORS requests from any origin.
    #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub cors_allow_any_origin: bool,

    /// Largest accepted score upload, in bytes.
    #[clap(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
            read_pool_size: self.read_pool_size,
            difficulty_service_url: self.difficulty_service_url.clone(),
            difficulty_timeout_sec: self.difficulty_timeout_sec,
            cors_allow_any_origin: self.cors_allow_any_origin,
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!(
        "Opening SQLite catalog database at {:?}...",
        app_config.catalog_db_path()
    );
    let piece_store = Arc::new(SqlitePieceStore::new(
        app_config.catalog_db_path(),
        PieceStoreConfig {
            read_pool_size: app_config.pagination.read_pool_size,
            max_page_size: app_config.pagination.max_page_size,
        },
    )?);
    let pieces_count = piece_store
        .count_pieces()
        .context("Failed to count catalog pieces")?;
    info!("Catalog holds {} pieces", pieces_count);

    let user_store = Arc::new(SqliteUserStore::new(app_config.user_db_path())?);
    let user_manager = Arc::new(UserManager::new(user_store));

    let difficulty_estimator: Option<Arc<dyn DifficultyEstimator>> =
        match &app_config.difficulty.url {
            Some(url) => {
                info!("Difficulty service configured at {}", url);
                Some(Arc::new(HttpDifficultyEstimator::new(
                    url.clone(),
                    app_config.difficulty.timeout_sec,
                )?))
            }
            None => {
                warn!("No difficulty service configured, score uploads are disabled");
                None
            }
        };

    info!("Ready to serve at port {}!", app_config.port);
    run_server(
        ServerConfig::from(&app_config),
        piece_store,
        user_manager,
        difficulty_estimator,
    )
    .await
}
