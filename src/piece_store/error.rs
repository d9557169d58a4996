use thiserror::Error;

/// Failures of catalog queries.
#[derive(Debug, Error)]
pub enum PieceStoreError {
    /// The storage result lacks a column the mapper needs, or holds a value
    /// of the wrong type.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Invalid page: {0}")]
    InvalidPage(String),

    #[error("Invalid page size: {0}")]
    InvalidPageSize(String),

    #[error("Invalid difficulty range: {0}")]
    InvalidRange(String),

    #[error("Piece {0} not found")]
    NotFound(i64),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl PieceStoreError {
    /// Whether the caller supplied bad input, as opposed to a server-side fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PieceStoreError::InvalidPage(_)
                | PieceStoreError::InvalidPageSize(_)
                | PieceStoreError::InvalidRange(_)
                | PieceStoreError::NotFound(_)
        )
    }
}

impl From<rusqlite::Error> for PieceStoreError {
    fn from(err: rusqlite::Error) -> Self {
        PieceStoreError::StorageUnavailable(err.to_string())
    }
}

pub type PieceStoreResult<T> = std::result::Result<T, PieceStoreError>;
