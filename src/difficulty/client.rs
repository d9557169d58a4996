//! HTTP client for the external difficulty service.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{DifficultyError, DifficultyEstimator, ScoreUpload, SCORE_FIELD_NAME};
use crate::piece_store::Difficulty;

#[derive(Deserialize)]
struct DifficultyResponse {
    x1: f64,
    x2: f64,
}

pub struct HttpDifficultyEstimator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDifficultyEstimator {
    /// * `base_url` - Base URL of the difficulty service (e.g., "http://localhost:5000")
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: String, timeout_sec: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl DifficultyEstimator for HttpDifficultyEstimator {
    async fn estimate(&self, score: ScoreUpload) -> Result<Difficulty, DifficultyError> {
        if score.bytes.is_empty() {
            return Err(DifficultyError::EmptyUpload);
        }

        let url = format!("{}/difficulty", self.base_url);
        let size = score.bytes.len();
        let part = Part::bytes(score.bytes).file_name(score.file_name.clone());
        let form = Form::new().part(SCORE_FIELD_NAME, part);

        debug!(
            "Sending {} ({:#}) to {}",
            score.file_name,
            byte_unit::Byte::from(size),
            url
        );
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| DifficultyError::ServiceUnavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(DifficultyError::ServiceUnavailable(format!(
                "status {}",
                response.status()
            )));
        }

        let body: DifficultyResponse = response
            .json()
            .await
            .map_err(|err| DifficultyError::InvalidResponse(err.to_string()))?;
        if !body.x1.is_finite() || !body.x2.is_finite() {
            return Err(DifficultyError::InvalidResponse(format!(
                "non-finite coordinates ({}, {})",
                body.x1, body.x2
            )));
        }

        Ok(Difficulty {
            x1: body.x1,
            x2: body.x2,
        })
    }
}
