//! SQLite schema of the score catalog.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, BASE_DB_VERSION};
use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

pub const MUSICSHEET_TABLE_NAME: &str = "musicsheet";

pub const COLUMN_ID: &str = "musicsheetid";
pub const COLUMN_TITLE: &str = "work_title";
pub const COLUMN_AUTHOR: &str = "composer";
pub const COLUMN_PERIOD: &str = "composer_period";
pub const COLUMN_X1: &str = "latent_map_x1";
pub const COLUMN_X2: &str = "latent_map_x2";
pub const COLUMN_KEY: &str = "_key";

const MUSICSHEET_TABLE_V_0: Table = Table {
    name: MUSICSHEET_TABLE_NAME,
    columns: &[
        sqlite_column!(COLUMN_ID, &SqlType::Integer, is_primary_key = true),
        sqlite_column!(COLUMN_TITLE, &SqlType::Text, non_null = true),
        sqlite_column!(COLUMN_AUTHOR, &SqlType::Text, non_null = true),
        sqlite_column!(COLUMN_PERIOD, &SqlType::Text, non_null = true),
        sqlite_column!(COLUMN_X1, &SqlType::Real, non_null = true),
        sqlite_column!(COLUMN_X2, &SqlType::Real, non_null = true),
        sqlite_column!(COLUMN_KEY, &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_musicsheet_period", COLUMN_PERIOD),
        ("idx_musicsheet_key", COLUMN_KEY),
        ("idx_musicsheet_x1", COLUMN_X1),
    ],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[MUSICSHEET_TABLE_V_0],
    migration: None,
}];

/// Stamps a catalog built by an external import (a `musicsheet` table with
/// `user_version` 0) with the first schema version, so that it goes through
/// regular validation. Any other database is left untouched.
pub fn adopt_unversioned_catalog(conn: &Connection) -> Result<()> {
    let user_version: i64 = conn.query_row("PRAGMA user_version;", [], |r| r.get(0))?;
    let has_table: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?1)",
        [MUSICSHEET_TABLE_NAME],
        |r| r.get(0),
    )?;
    if user_version != 0 || !has_table {
        return Ok(());
    }

    MUSICSHEET_TABLE_V_0
        .validate(conn)
        .context("Unversioned catalog does not have the musicsheet layout")?;
    conn.pragma_update(None, "user_version", BASE_DB_VERSION)?;
    info!("Adopted unversioned catalog at schema version 0");
    Ok(())
}
