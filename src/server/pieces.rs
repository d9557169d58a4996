//! Routes serving the score catalog.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::session::Session;
use super::state::ServerState;
use crate::difficulty::{DifficultyError, ScoreUpload, SCORE_FIELD_NAME};
use crate::piece_store::{Difficulty, PageRequest, Piece, PieceFilter, PieceStoreError};

#[derive(Debug)]
pub enum ApiError {
    Store(PieceStoreError),
    Difficulty(DifficultyError),
    Upload(MultipartError),
    BadRequest(String),
    DifficultyServiceNotConfigured,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(PieceStoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Difficulty(err) => match err {
                DifficultyError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                DifficultyError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
                DifficultyError::EmptyUpload => StatusCode::BAD_REQUEST,
            },
            ApiError::Upload(err) => err.status(),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::DifficultyServiceNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Store(err) => err.to_string(),
            ApiError::Difficulty(err) => err.to_string(),
            ApiError::Upload(err) => err.body_text(),
            ApiError::BadRequest(message) => message.clone(),
            ApiError::DifficultyServiceNotConfigured => {
                "No difficulty service is configured".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            error!("{} {}", status, message);
        } else {
            debug!("{} {}", status, message);
        }
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<PieceStoreError> for ApiError {
    fn from(err: PieceStoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<DifficultyError> for ApiError {
    fn from(err: DifficultyError) -> Self {
        ApiError::Difficulty(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Upload(err)
    }
}

/// Raw listing parameters; every value is validated by hand so that errors
/// carry the catalog's own error kinds.
#[derive(Deserialize, Debug, Default)]
pub struct ListPiecesQuery {
    pub page: Option<String>,
    pub size: Option<String>,
    pub key: Option<String>,
    pub period: Option<String>,
    pub min_difficulty: Option<String>,
    pub max_difficulty: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct NeighborsQuery {
    pub size: Option<String>,
}

#[derive(Serialize)]
struct PieceListResponse {
    array: Vec<Piece>,
    total_pages: usize,
    page: usize,
}

#[derive(Serialize)]
struct ArrayResponse<T> {
    array: Vec<T>,
}

#[derive(Serialize)]
struct DataResponse<T> {
    data: T,
}

#[derive(Serialize)]
struct DifficultyEstimate {
    difficulty: Difficulty,
    pieces: Vec<Piece>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_bound(name: &str, value: Option<&str>) -> Result<Option<f64>, PieceStoreError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse::<f64>().map(Some).map_err(|_| {
            PieceStoreError::InvalidRange(format!("{} {:?} is not a number", name, raw))
        }),
    }
}

impl ListPiecesQuery {
    fn filter(&self) -> Result<PieceFilter, PieceStoreError> {
        Ok(PieceFilter {
            key: non_blank(self.key.clone()),
            period: non_blank(self.period.clone()),
            min_difficulty: parse_bound("min_difficulty", self.min_difficulty.as_deref())?,
            max_difficulty: parse_bound("max_difficulty", self.max_difficulty.as_deref())?,
        })
    }
}

fn parse_piece_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid piece id {:?}", raw)))
}

async fn list_pieces(
    State(state): State<ServerState>,
    Query(query): Query<ListPiecesQuery>,
) -> Result<Json<PieceListResponse>, ApiError> {
    let request = PageRequest::parse(
        query.page.as_deref(),
        query.size.as_deref(),
        state.config.default_page_size,
        state.config.max_page_size,
    )?;
    let filter = query.filter()?;

    let page = state
        .piece_store
        .list_pieces(request.page, request.page_size, &filter)?;
    Ok(Json(PieceListResponse {
        array: page.pieces,
        total_pages: page.total_pages,
        page: page.page,
    }))
}

async fn get_piece(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Piece>>, ApiError> {
    let id = parse_piece_id(&id)?;
    let piece = state.piece_store.get_piece_by_id(id)?;
    Ok(Json(DataResponse { data: piece }))
}

async fn get_piece_neighbors(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Query(query): Query<NeighborsQuery>,
) -> Result<Json<ArrayResponse<Piece>>, ApiError> {
    let id = parse_piece_id(&id)?;
    let size = PageRequest::parse(
        None,
        query.size.as_deref(),
        state.config.default_page_size,
        state.config.max_page_size,
    )?
    .page_size;

    let neighbors = state.piece_store.get_piece_neighbors(id, size)?;
    Ok(Json(ArrayResponse { array: neighbors }))
}

async fn estimate_difficulty(
    session: Session,
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> Result<Json<DataResponse<DifficultyEstimate>>, ApiError> {
    let estimator = state
        .difficulty_estimator
        .clone()
        .ok_or(ApiError::DifficultyServiceNotConfigured)?;

    let mut score: Option<ScoreUpload> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(SCORE_FIELD_NAME) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }
        let file_name = field.file_name().unwrap_or("score").to_string();
        let bytes = field.bytes().await?;
        score = Some(ScoreUpload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }
    let score = score.ok_or_else(|| {
        ApiError::BadRequest(format!("Missing multipart field '{}'", SCORE_FIELD_NAME))
    })?;

    debug!(
        "User {} uploaded {} ({} bytes)",
        session.user.handle,
        score.file_name,
        score.bytes.len()
    );
    let difficulty = estimator.estimate(score).await.inspect_err(|err| {
        warn!("Difficulty estimation failed: {}", err);
    })?;
    let pieces = state
        .piece_store
        .get_nearest_pieces(&difficulty, state.config.default_page_size)?;

    Ok(Json(DataResponse {
        data: DifficultyEstimate { difficulty, pieces },
    }))
}

pub fn make_pieces_routes(state: ServerState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;
    Router::new()
        .route(
            "/",
            get(list_pieces)
                .post(estimate_difficulty)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/{id}", get(get_piece))
        .route("/{id}/neighbors", get(get_piece_neighbors))
        .with_state(state)
}
