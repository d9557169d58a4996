//! Score Catalog Server Library
//!
//! This library exposes the internal modules for the binaries and for testing.

pub mod config;
pub mod difficulty;
pub mod piece_store;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use piece_store::{PieceStore, SqlitePieceStore};
pub use server::{make_app, run_server, RequestsLoggingLevel};
pub use user::{SqliteUserStore, UserManager, UserStore};
