//! Translation of [`PieceFilter`] into a SQL predicate over `musicsheet`.

use super::error::{PieceStoreError, PieceStoreResult};
use super::models::PieceFilter;
use super::pagination::{total_pages, PageWindow};
use super::schema::*;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

/// A WHERE clause with its positional parameters. An empty clause matches
/// every row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Predicate {
    pub where_clause: String,
    pub params: Vec<Value>,
}

impl Predicate {
    pub fn is_empty(&self) -> bool {
        self.where_clause.is_empty()
    }

    /// The clause ready to be appended after a FROM.
    pub fn sql(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_clause)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilteredPage {
    pub predicate: Predicate,
    pub total_pages: usize,
    pub window: PageWindow,
}

fn check_bound(name: &str, value: Option<f64>) -> PieceStoreResult<()> {
    match value {
        Some(v) if !v.is_finite() => Err(PieceStoreError::InvalidRange(format!(
            "{} must be a finite number, got {}",
            name, v
        ))),
        _ => Ok(()),
    }
}

/// ANDs together every filter that is set. Difficulty bounds apply to x1.
pub fn build_predicate(filter: &PieceFilter) -> PieceStoreResult<Predicate> {
    check_bound("min_difficulty", filter.min_difficulty)?;
    check_bound("max_difficulty", filter.max_difficulty)?;
    if let (Some(min), Some(max)) = (filter.min_difficulty, filter.max_difficulty) {
        if min > max {
            return Err(PieceStoreError::InvalidRange(format!(
                "min {} is greater than max {}",
                min, max
            )));
        }
    }

    let mut clauses: Vec<String> = vec![];
    let mut params: Vec<Value> = vec![];

    if let Some(key) = &filter.key {
        clauses.push(format!("{} = ?", COLUMN_KEY));
        params.push(Value::Text(key.clone()));
    }
    if let Some(period) = &filter.period {
        clauses.push(format!("{} = ?", COLUMN_PERIOD));
        params.push(Value::Text(period.clone()));
    }
    if let Some(min) = filter.min_difficulty {
        clauses.push(format!("{} >= ?", COLUMN_X1));
        params.push(Value::Real(min));
    }
    if let Some(max) = filter.max_difficulty {
        clauses.push(format!("{} <= ?", COLUMN_X1));
        params.push(Value::Real(max));
    }

    Ok(Predicate {
        where_clause: clauses.join(" AND "),
        params,
    })
}

/// Counts the rows matching `predicate`.
pub fn count_matching(conn: &Connection, predicate: &Predicate) -> PieceStoreResult<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}{}", MUSICSHEET_TABLE_NAME, predicate.sql());
    let count: i64 = conn.query_row(&sql, params_from_iter(predicate.params.iter()), |r| {
        r.get(0)
    })?;
    Ok(count as usize)
}

/// Builds the predicate for `filter`, counts its matches and picks the page
/// window. `page` is clamped into the available pages.
pub fn build_filtered_page(
    conn: &Connection,
    page: usize,
    page_size: usize,
    filter: &PieceFilter,
) -> PieceStoreResult<FilteredPage> {
    let predicate = build_predicate(filter)?;
    let count = count_matching(conn, &predicate)?;
    let total_pages = total_pages(count, page_size);
    let window = PageWindow::clamped(page, page_size, total_pages);
    debug!(
        "Filter {:?} matches {} rows, {} pages, serving page {}",
        filter, count, total_pages, window.page
    );

    Ok(FilteredPage {
        predicate,
        total_pages,
        window,
    })
}
