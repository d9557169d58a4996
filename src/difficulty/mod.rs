//! Estimation of a score's position in the difficulty map.
//!
//! The estimation itself runs in an external service; this module only
//! defines the contract and the HTTP client talking to it.

mod client;

use async_trait::async_trait;
use thiserror::Error;

use crate::piece_store::Difficulty;

pub use client::HttpDifficultyEstimator;

/// Multipart field carrying the score file, both on upload and towards the
/// difficulty service.
pub const SCORE_FIELD_NAME: &str = "score";

#[derive(Debug, Error)]
pub enum DifficultyError {
    /// The service could not be reached or answered with an error status.
    #[error("Difficulty service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The service answered, but not with a usable estimate.
    #[error("Invalid difficulty service response: {0}")]
    InvalidResponse(String),

    #[error("Uploaded score is empty")]
    EmptyUpload,
}

/// An uploaded score file.
#[derive(Clone, Debug)]
pub struct ScoreUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait DifficultyEstimator: Send + Sync {
    /// Places the uploaded score in the `(x1, x2)` difficulty map.
    async fn estimate(&self, score: ScoreUpload) -> Result<Difficulty, DifficultyError>;
}
