//! Test fixture creation for the catalog and user databases

use super::constants::*;
use anyhow::Result;
use rusqlite::{params, Connection};
use score_catalog_server::piece_store::{PieceStoreConfig, SqlitePieceStore};
use score_catalog_server::user::{SqliteUserStore, UserManager};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Creates a temporary catalog with `PIECES_COUNT` pieces.
/// Returns (temp_dir, catalog_db_path)
///
/// Piece `i` sits at `(i / 4, -i / 2)` in the difficulty map, its period
/// cycles through `PERIODS` (piece 21 is forced to "Modern") and its key is
/// `KEYS[i % 3]`.
pub fn create_test_catalog() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let catalog_db_path = dir.path().join("catalog.db");

    // Creates the schema
    let _store = SqlitePieceStore::new(&catalog_db_path, PieceStoreConfig::default())?;

    let conn = Connection::open(&catalog_db_path)?;
    for i in 1..=PIECES_COUNT as i64 {
        let period = if i == 21 {
            "Modern"
        } else {
            PERIODS[((i - 1) % 5) as usize]
        };
        conn.execute(
            "INSERT INTO musicsheet (musicsheetid, work_title, composer, composer_period, latent_map_x1, latent_map_x2, _key)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                i,
                format!("Piece {}", i),
                format!("Composer {}", i % 7),
                period,
                i as f64 / 4.0,
                -(i as f64) / 2.0,
                KEYS[(i % 3) as usize],
            ],
        )?;
    }

    Ok((dir, catalog_db_path))
}

/// Creates a temporary user database holding `TEST_USER`.
/// Returns (temp_dir, user_db_path)
pub fn create_test_db_with_users() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("user.db");

    let user_store = Arc::new(SqliteUserStore::new(&db_path)?);
    let user_manager = UserManager::new(user_store);
    user_manager.create_user(TEST_USER)?;
    user_manager.set_password(TEST_USER, TEST_PASS)?;

    Ok((dir, db_path))
}
