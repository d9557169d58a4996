//! Score catalog storage: row mapping, filtering, pagination and the
//! SQLite-backed [`PieceStore`].

mod error;
mod filter;
mod models;
mod pagination;
mod row_mapper;
mod schema;
mod store;
mod trait_def;

pub use error::{PieceStoreError, PieceStoreResult};
pub use filter::{build_filtered_page, build_predicate, FilteredPage, Predicate};
pub use models::{Difficulty, Piece, PieceFilter, PiecePage};
pub use pagination::{total_pages, PageRequest, PageWindow};
pub use row_mapper::{map_rows, RawRow};
pub use schema::CATALOG_VERSIONED_SCHEMAS;
pub use store::{PieceStoreConfig, SqlitePieceStore};
pub use trait_def::PieceStore;
