use axum::extract::FromRef;

use crate::difficulty::DifficultyEstimator;
use crate::piece_store::PieceStore;
use crate::user::UserManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedPieceStore = Arc<dyn PieceStore>;
pub type GuardedUserManager = Arc<UserManager>;
pub type OptionalDifficultyEstimator = Option<Arc<dyn DifficultyEstimator>>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub piece_store: GuardedPieceStore,
    pub user_manager: GuardedUserManager,
    pub difficulty_estimator: OptionalDifficultyEstimator,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        piece_store: GuardedPieceStore,
        user_manager: GuardedUserManager,
        difficulty_estimator: OptionalDifficultyEstimator,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            piece_store,
            user_manager,
            difficulty_estimator,
        }
    }
}

impl FromRef<ServerState> for GuardedPieceStore {
    fn from_ref(input: &ServerState) -> Self {
        input.piece_store.clone()
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for OptionalDifficultyEstimator {
    fn from_ref(input: &ServerState) -> Self {
        input.difficulty_estimator.clone()
    }
}
