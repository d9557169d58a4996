//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per server endpoint. When API routes or
//! request formats change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use score_catalog_server::difficulty::SCORE_FIELD_NAME;
use serde_json::json;
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

#[allow(dead_code)]
impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client logged in as `TEST_USER`
    ///
    /// # Panics
    ///
    /// Panics if authentication fails.
    pub async fn authenticated(base_url: String) -> Self {
        let client = Self::new(base_url);

        let response = client.login(TEST_USER, TEST_PASS).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Test user authentication failed: {:?}",
            response.text().await
        );

        client
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /v1/auth/login
    pub async fn login(&self, handle: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/v1/auth/login", self.base_url))
            .json(&json!({
                "user_handle": handle,
                "password": password,
            }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.client
            .get(format!("{}/v1/auth/logout", self.base_url))
            .send()
            .await
            .expect("Logout request failed")
    }

    /// POST /v1/auth/session
    pub async fn session(&self) -> Response {
        self.client
            .post(format!("{}/v1/auth/session", self.base_url))
            .send()
            .await
            .expect("Session request failed")
    }

    // ========================================================================
    // Catalog Endpoints
    // ========================================================================

    /// GET /
    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    /// GET /v1/pieces with raw query parameters
    pub async fn list_pieces(&self, query: &[(&str, &str)]) -> Response {
        self.client
            .get(format!("{}/v1/pieces", self.base_url))
            .query(query)
            .send()
            .await
            .expect("List pieces request failed")
    }

    /// GET /v1/pieces/{id}
    pub async fn get_piece(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/v1/pieces/{}", self.base_url, id))
            .send()
            .await
            .expect("Get piece request failed")
    }

    /// GET /v1/pieces/{id}/neighbors
    pub async fn get_piece_neighbors(&self, id: &str, size: Option<usize>) -> Response {
        let mut request = self
            .client
            .get(format!("{}/v1/pieces/{}/neighbors", self.base_url, id));
        if let Some(size) = size {
            request = request.query(&[("size", size.to_string())]);
        }
        request
            .send()
            .await
            .expect("Get neighbors request failed")
    }

    /// POST /v1/pieces with a multipart `score` field
    pub async fn upload_score(&self, file_name: &str, bytes: Vec<u8>) -> Response {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part(SCORE_FIELD_NAME, part);
        self.client
            .post(format!("{}/v1/pieces", self.base_url))
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }
}
