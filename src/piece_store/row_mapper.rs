//! Conversion of raw `musicsheet` rows into [`Piece`] records.

use super::error::{PieceStoreError, PieceStoreResult};
use super::models::{Difficulty, Piece};
use super::schema::*;
use rusqlite::types::Value;
use std::collections::HashMap;

/// A row as returned by storage, one value per selected column.
pub type RawRow = Vec<Value>;

/// Maps every row to a [`Piece`], pairing values with `columns` by position.
pub fn map_rows(rows: &[RawRow], columns: &[String]) -> PieceStoreResult<Vec<Piece>> {
    rows.iter().map(|row| map_row(row, columns)).collect()
}

fn map_row(row: &RawRow, columns: &[String]) -> PieceStoreResult<Piece> {
    if row.len() != columns.len() {
        return Err(PieceStoreError::SchemaMismatch(format!(
            "row has {} values but {} columns were selected",
            row.len(),
            columns.len()
        )));
    }
    let by_name: HashMap<&str, &Value> = columns
        .iter()
        .map(String::as_str)
        .zip(row.iter())
        .collect();

    Ok(Piece {
        id: integer(&by_name, COLUMN_ID)?,
        title: text(&by_name, COLUMN_TITLE)?,
        author: text(&by_name, COLUMN_AUTHOR)?,
        period: text(&by_name, COLUMN_PERIOD)?,
        difficulty: Difficulty {
            x1: real(&by_name, COLUMN_X1)?,
            x2: real(&by_name, COLUMN_X2)?,
        },
        key: text(&by_name, COLUMN_KEY)?,
    })
}

fn column<'a>(row: &HashMap<&str, &'a Value>, name: &str) -> PieceStoreResult<&'a Value> {
    row.get(name)
        .copied()
        .ok_or_else(|| PieceStoreError::SchemaMismatch(format!("missing column {}", name)))
}

fn wrong_type(name: &str, value: &Value) -> PieceStoreError {
    PieceStoreError::SchemaMismatch(format!(
        "column {} has unexpected type {}",
        name,
        value.data_type()
    ))
}

fn integer(row: &HashMap<&str, &Value>, name: &str) -> PieceStoreResult<i64> {
    match column(row, name)? {
        Value::Integer(v) => Ok(*v),
        other => Err(wrong_type(name, other)),
    }
}

fn real(row: &HashMap<&str, &Value>, name: &str) -> PieceStoreResult<f64> {
    match column(row, name)? {
        Value::Real(v) if v.is_finite() => Ok(*v),
        Value::Integer(v) => Ok(*v as f64),
        other => Err(wrong_type(name, other)),
    }
}

fn text(row: &HashMap<&str, &Value>, name: &str) -> PieceStoreResult<String> {
    match column(row, name)? {
        Value::Text(v) => Ok(v.clone()),
        other => Err(wrong_type(name, other)),
    }
}
