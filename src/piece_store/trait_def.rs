//! PieceStore trait definition.

use super::error::PieceStoreResult;
use super::models::{Difficulty, Piece, PieceFilter, PiecePage};

/// Read access to the score catalog.
pub trait PieceStore: Send + Sync {
    /// Lists one page of pieces matching `filter`, ordered by id.
    ///
    /// `page` is clamped into the pages available under the filter, so asking
    /// past the end serves the last page. Fails with `InvalidPageSize` when
    /// `page_size` is zero or above the configured maximum, and with
    /// `InvalidRange` when the difficulty bounds are inverted.
    fn list_pieces(
        &self,
        page: usize,
        page_size: usize,
        filter: &PieceFilter,
    ) -> PieceStoreResult<PiecePage>;

    /// Returns the piece with the given id, or `NotFound`.
    fn get_piece_by_id(&self, id: i64) -> PieceStoreResult<Piece>;

    /// Returns up to `size` pieces closest to piece `id` in the difficulty
    /// map, nearest first, excluding the piece itself.
    fn get_piece_neighbors(&self, id: i64, size: usize) -> PieceStoreResult<Vec<Piece>>;

    /// Returns up to `limit` pieces closest to `difficulty`, nearest first.
    fn get_nearest_pieces(
        &self,
        difficulty: &Difficulty,
        limit: usize,
    ) -> PieceStoreResult<Vec<Piece>>;

    /// Total number of pieces in the catalog.
    fn count_pieces(&self) -> PieceStoreResult<usize>;
}
