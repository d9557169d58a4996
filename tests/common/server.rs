//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own catalog and user database.

use super::constants::*;
use super::fixtures::{create_test_catalog, create_test_db_with_users};
use async_trait::async_trait;
use score_catalog_server::difficulty::{DifficultyError, DifficultyEstimator, ScoreUpload};
use score_catalog_server::piece_store::{Difficulty, PieceStoreConfig, SqlitePieceStore};
use score_catalog_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use score_catalog_server::user::{SqliteUserStore, UserManager};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Estimator placing every non-empty score at `MOCK_DIFFICULTY`
pub struct MockDifficultyEstimator;

#[async_trait]
impl DifficultyEstimator for MockDifficultyEstimator {
    async fn estimate(&self, score: ScoreUpload) -> Result<Difficulty, DifficultyError> {
        if score.bytes.is_empty() {
            return Err(DifficultyError::EmptyUpload);
        }
        Ok(Difficulty {
            x1: MOCK_DIFFICULTY.0,
            x2: MOCK_DIFFICULTY.1,
        })
    }
}

/// Estimator standing for a service that cannot be reached
pub struct UnreachableDifficultyEstimator;

#[async_trait]
impl DifficultyEstimator for UnreachableDifficultyEstimator {
    async fn estimate(&self, _score: ScoreUpload) -> Result<Difficulty, DifficultyError> {
        Err(DifficultyError::ServiceUnavailable(
            "connection refused".to_string(),
        ))
    }
}

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    #[allow(dead_code)]
    pub port: u16,

    // Keep resources alive until drop
    _temp_catalog_dir: TempDir,
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server with no difficulty service configured
    pub async fn spawn() -> Self {
        Self::spawn_with_estimator(None).await
    }

    /// Spawns a server on a random port, using `difficulty_estimator` for
    /// score uploads
    ///
    /// # Panics
    ///
    /// Panics if fixture creation, port binding or startup fails.
    pub async fn spawn_with_estimator(
        difficulty_estimator: Option<Arc<dyn DifficultyEstimator>>,
    ) -> Self {
        let (temp_catalog_dir, catalog_db_path) =
            create_test_catalog().expect("Failed to create test catalog");
        let (temp_db_dir, db_path) =
            create_test_db_with_users().expect("Failed to create test database");

        let piece_store = Arc::new(
            SqlitePieceStore::new(&catalog_db_path, PieceStoreConfig::default())
                .expect("Failed to open piece store"),
        );
        let user_store = Arc::new(SqliteUserStore::new(&db_path).expect("Failed to open user store"));
        let user_manager = Arc::new(UserManager::new(user_store));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            ..Default::default()
        };
        let app = make_app(config, piece_store, user_manager, difficulty_estimator);

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            _temp_catalog_dir: temp_catalog_dir,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };
        server.wait_for_ready().await;
        server
    }

    /// Polls the home endpoint until it answers
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
