//! SQLite-backed implementation of [`PieceStore`].

use super::error::{PieceStoreError, PieceStoreResult};
use super::filter::{build_filtered_page, count_matching, Predicate};
use super::models::{Difficulty, Piece, PieceFilter, PiecePage};
use super::pagination::{total_pages, validate_page_size, PageWindow};
use super::row_mapper::{map_rows, RawRow};
use super::schema::*;
use super::trait_def::PieceStore;
use crate::sqlite_persistence::migrate_if_needed;
use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct PieceStoreConfig {
    /// Number of read-only connections served round-robin.
    pub read_pool_size: usize,
    /// Largest page (and neighbors) size a caller may ask for.
    pub max_page_size: usize,
}

impl Default for PieceStoreConfig {
    fn default() -> Self {
        PieceStoreConfig {
            read_pool_size: 4,
            max_page_size: 100,
        }
    }
}

#[derive(Clone)]
pub struct SqlitePieceStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    read_index: Arc<AtomicUsize>,
    config: PieceStoreConfig,
}

impl SqlitePieceStore {
    /// Opens the catalog at `db_path`, creating the schema on a new file.
    pub fn new<P: AsRef<Path>>(db_path: P, config: PieceStoreConfig) -> Result<Self> {
        let db_path = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open catalog database {:?}", db_path))?;
        adopt_unversioned_catalog(&write_conn)?;
        migrate_if_needed(&mut write_conn, CATALOG_VERSIONED_SCHEMAS)
            .context("Failed to prepare catalog schema")?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;
        drop(write_conn);

        let pool_size = config.read_pool_size.max(1);
        let mut read_pool = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let read_conn = Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .context("Failed to open catalog read connection")?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }
        info!(
            "Opened catalog {:?} with {} read connections",
            db_path, pool_size
        );

        Ok(SqlitePieceStore {
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
            config,
        })
    }

    /// Runs `f` holding one pooled connection; the connection goes back to
    /// the pool when `f` returns, whatever the outcome.
    fn with_read_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> PieceStoreResult<T>,
    ) -> PieceStoreResult<T> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        let conn = self.read_pool[index].lock().map_err(|_| {
            PieceStoreError::StorageUnavailable(format!("read connection {} is poisoned", index))
        })?;
        f(&conn)
    }

    fn query_pieces(conn: &Connection, sql: &str, params: &[Value]) -> PieceStoreResult<Vec<Piece>> {
        let mut stmt = conn.prepare_cached(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut raw_rows: Vec<RawRow> = vec![];
        while let Some(row) = rows.next()? {
            let raw = (0..column_count)
                .map(|i| row.get::<_, Value>(i))
                .collect::<Result<RawRow, _>>()?;
            raw_rows.push(raw);
        }
        map_rows(&raw_rows, &columns)
    }

    fn fetch_window(
        conn: &Connection,
        predicate: &Predicate,
        window: &PageWindow,
    ) -> PieceStoreResult<Vec<Piece>> {
        let sql = format!(
            "SELECT * FROM {}{} ORDER BY {} LIMIT ? OFFSET ?",
            MUSICSHEET_TABLE_NAME,
            predicate.sql(),
            COLUMN_ID
        );
        let mut params = predicate.params.clone();
        params.push(Value::Integer(window.limit as i64));
        params.push(Value::Integer(window.offset as i64));
        Self::query_pieces(conn, &sql, &params)
    }

    fn nearest(
        conn: &Connection,
        difficulty: &Difficulty,
        limit: usize,
        exclude_id: Option<i64>,
    ) -> PieceStoreResult<Vec<Piece>> {
        let sql = format!(
            "SELECT * FROM {table}
             WHERE (?1 IS NULL OR {id} != ?1)
             ORDER BY ({x1} - ?2) * ({x1} - ?2) + ({x2} - ?3) * ({x2} - ?3), {id}
             LIMIT ?4",
            table = MUSICSHEET_TABLE_NAME,
            id = COLUMN_ID,
            x1 = COLUMN_X1,
            x2 = COLUMN_X2,
        );
        let params = [
            exclude_id.map_or(Value::Null, Value::Integer),
            Value::Real(difficulty.x1),
            Value::Real(difficulty.x2),
            Value::Integer(limit as i64),
        ];
        Self::query_pieces(conn, &sql, &params)
    }

    fn piece_by_id(conn: &Connection, id: i64) -> PieceStoreResult<Piece> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?",
            MUSICSHEET_TABLE_NAME, COLUMN_ID
        );
        Self::query_pieces(conn, &sql, &[Value::Integer(id)])?
            .into_iter()
            .next()
            .ok_or(PieceStoreError::NotFound(id))
    }
}

impl PieceStore for SqlitePieceStore {
    fn list_pieces(
        &self,
        page: usize,
        page_size: usize,
        filter: &PieceFilter,
    ) -> PieceStoreResult<PiecePage> {
        validate_page_size(page_size, self.config.max_page_size)?;

        self.with_read_conn(|conn| {
            let (predicate, total_pages, window) = if filter.is_empty() {
                let predicate = Predicate::default();
                let total_pages = total_pages(count_matching(conn, &predicate)?, page_size);
                let window = PageWindow::clamped(page, page_size, total_pages);
                (predicate, total_pages, window)
            } else {
                let filtered = build_filtered_page(conn, page, page_size, filter)?;
                (filtered.predicate, filtered.total_pages, filtered.window)
            };

            let pieces = Self::fetch_window(conn, &predicate, &window)?;
            debug!(
                "Listed {} pieces on page {}/{} (requested page {})",
                pieces.len(),
                window.page,
                total_pages,
                page
            );
            Ok(PiecePage {
                pieces,
                total_pages,
                page: window.page,
            })
        })
    }

    fn get_piece_by_id(&self, id: i64) -> PieceStoreResult<Piece> {
        self.with_read_conn(|conn| Self::piece_by_id(conn, id))
    }

    fn get_piece_neighbors(&self, id: i64, size: usize) -> PieceStoreResult<Vec<Piece>> {
        validate_page_size(size, self.config.max_page_size)?;
        self.with_read_conn(|conn| {
            let piece = Self::piece_by_id(conn, id)?;
            Self::nearest(conn, &piece.difficulty, size, Some(id))
        })
    }

    fn get_nearest_pieces(
        &self,
        difficulty: &Difficulty,
        limit: usize,
    ) -> PieceStoreResult<Vec<Piece>> {
        validate_page_size(limit, self.config.max_page_size)?;
        self.with_read_conn(|conn| Self::nearest(conn, difficulty, limit, None))
    }

    fn count_pieces(&self) -> PieceStoreResult<usize> {
        self.with_read_conn(|conn| count_matching(conn, &Predicate::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use tempfile::TempDir;

    const PERIODS: [&str; 5] = ["Baroque", "Classical", "Romantic", "Modern", "Romantic"];
    const KEYS: [&str; 3] = ["C major", "A minor", "E-flat major"];

    /// 25 rows, 4 of them Baroque (ids 1, 6, 11, 16). Coordinates are exact
    /// binary fractions so distance ties are real ties.
    fn make_store() -> (TempDir, SqlitePieceStore) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("catalog.db");
        let store = SqlitePieceStore::new(&db_path, PieceStoreConfig::default()).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        for i in 1..=25i64 {
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
            )
            .unwrap();
        }
        (temp_dir, store)
    }

    fn ids(pieces: &[Piece]) -> Vec<i64> {
        pieces.iter().map(|p| p.id).collect()
    }

    #[test]
    fn unfiltered_pages_are_full_except_the_last() {
        let (_dir, store) = make_store();

        let first = store.list_pieces(1, 10, &PieceFilter::default()).unwrap();
        assert_eq!(first.total_pages, 3);
        assert_eq!(ids(&first.pieces), (1..=10).collect::<Vec<_>>());

        let second = store.list_pieces(2, 10, &PieceFilter::default()).unwrap();
        assert_eq!(ids(&second.pieces), (11..=20).collect::<Vec<_>>());

        let last = store.list_pieces(3, 10, &PieceFilter::default()).unwrap();
        assert_eq!(ids(&last.pieces), (21..=25).collect::<Vec<_>>());
    }

    #[test]
    fn page_past_the_end_clamps_to_last_page() {
        let (_dir, store) = make_store();

        let page = store.list_pieces(4, 10, &PieceFilter::default()).unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(ids(&page.pieces), (21..=25).collect::<Vec<_>>());
    }

    #[test]
    fn page_zero_clamps_to_first_page() {
        let (_dir, store) = make_store();

        let page = store.list_pieces(0, 10, &PieceFilter::default()).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.pieces[0].id, 1);
    }

    #[test]
    fn period_filter_scenario() {
        let (_dir, store) = make_store();
        let filter = PieceFilter {
            period: Some("Baroque".to_string()),
            ..Default::default()
        };

        let page = store.list_pieces(1, 10, &filter).unwrap();
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.pieces.len(), 4);
        assert!(page.pieces.iter().all(|p| p.period == "Baroque"));
        assert_eq!(ids(&page.pieces), vec![1, 6, 11, 16]);
    }

    #[test]
    fn every_returned_piece_satisfies_the_filter() {
        let (_dir, store) = make_store();
        let filters = [
            PieceFilter {
                key: Some("C major".to_string()),
                ..Default::default()
            },
            PieceFilter {
                key: Some("A minor".to_string()),
                period: Some("Romantic".to_string()),
                ..Default::default()
            },
            PieceFilter {
                min_difficulty: Some(0.5),
                max_difficulty: Some(1.5),
                ..Default::default()
            },
            PieceFilter {
                period: Some("Classical".to_string()),
                max_difficulty: Some(1.0),
                ..Default::default()
            },
        ];

        for filter in filters.iter() {
            let mut seen = 0;
            let first = store.list_pieces(1, 3, filter).unwrap();
            for page in 1..=first.total_pages {
                let result = store.list_pieces(page, 3, filter).unwrap();
                assert!(result.pieces.len() <= 3);
                assert!(
                    result.pieces.iter().all(|p| filter.matches(p)),
                    "filter {:?} returned {:?}",
                    filter,
                    result.pieces
                );
                seen += result.pieces.len();
            }
            let expected = store
                .list_pieces(1, 100, &PieceFilter::default())
                .unwrap()
                .pieces
                .iter()
                .filter(|p| filter.matches(p))
                .count();
            assert_eq!(seen, expected, "filter {:?}", filter);
        }
    }

    #[test]
    fn filtered_page_past_the_end_clamps_too() {
        let (_dir, store) = make_store();
        let filter = PieceFilter {
            key: Some("C major".to_string()),
            ..Default::default()
        };

        let page = store.list_pieces(50, 3, &filter).unwrap();
        assert_eq!(page.page, page.total_pages);
        assert!(!page.pieces.is_empty());
    }

    #[test]
    fn filter_without_matches_is_empty() {
        let (_dir, store) = make_store();
        let filter = PieceFilter {
            period: Some("Renaissance".to_string()),
            ..Default::default()
        };

        let page = store.list_pieces(1, 10, &filter).unwrap();
        assert_eq!(page.total_pages, 0);
        assert!(page.pieces.is_empty());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let (_dir, store) = make_store();
        let filter = PieceFilter {
            min_difficulty: Some(2.0),
            max_difficulty: Some(1.0),
            ..Default::default()
        };

        assert!(matches!(
            store.list_pieces(1, 10, &filter),
            Err(PieceStoreError::InvalidRange(_))
        ));
    }

    #[test]
    fn page_size_bounds_are_enforced() {
        let (_dir, store) = make_store();

        assert!(matches!(
            store.list_pieces(1, 0, &PieceFilter::default()),
            Err(PieceStoreError::InvalidPageSize(_))
        ));
        assert!(matches!(
            store.list_pieces(1, 101, &PieceFilter::default()),
            Err(PieceStoreError::InvalidPageSize(_))
        ));
    }

    #[test]
    fn listing_is_idempotent() {
        let (_dir, store) = make_store();
        let filter = PieceFilter {
            key: Some("E-flat major".to_string()),
            ..Default::default()
        };

        let a = store.list_pieces(2, 4, &filter).unwrap();
        let b = store.list_pieces(2, 4, &filter).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn listed_piece_equals_piece_by_id() {
        let (_dir, store) = make_store();

        let page = store.list_pieces(2, 10, &PieceFilter::default()).unwrap();
        for piece in page.pieces.iter() {
            assert_eq!(&store.get_piece_by_id(piece.id).unwrap(), piece);
        }
    }

    #[test]
    fn missing_id_is_not_found() {
        let (_dir, store) = make_store();

        assert!(matches!(
            store.get_piece_by_id(999),
            Err(PieceStoreError::NotFound(999))
        ));
    }

    #[test]
    fn empty_catalog_lists_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqlitePieceStore::new(
            temp_dir.path().join("catalog.db"),
            PieceStoreConfig::default(),
        )
        .unwrap();

        let page = store.list_pieces(3, 10, &PieceFilter::default()).unwrap();
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.page, 1);
        assert!(page.pieces.is_empty());
        assert_eq!(store.count_pieces().unwrap(), 0);
    }

    #[test]
    fn neighbors_are_sorted_by_distance_and_exclude_self() {
        let (_dir, store) = make_store();

        let neighbors = store.get_piece_neighbors(10, 4).unwrap();
        assert_eq!(ids(&neighbors), vec![9, 11, 8, 12]);

        let origin = store.get_piece_by_id(10).unwrap().difficulty;
        let distances: Vec<f64> = neighbors
            .iter()
            .map(|p| p.difficulty.squared_distance(&origin))
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn neighbors_of_missing_piece_is_not_found() {
        let (_dir, store) = make_store();

        assert!(matches!(
            store.get_piece_neighbors(1234, 3),
            Err(PieceStoreError::NotFound(1234))
        ));
    }

    #[test]
    fn nearest_pieces_to_a_difficulty() {
        let (_dir, store) = make_store();

        let nearest = store
            .get_nearest_pieces(&Difficulty { x1: 0.0, x2: 0.0 }, 2)
            .unwrap();
        assert_eq!(ids(&nearest), vec![1, 2]);
    }

    #[test]
    fn counts_pieces() {
        let (_dir, store) = make_store();
        assert_eq!(store.count_pieces().unwrap(), 25);
    }

    #[test]
    fn partial_select_is_schema_mismatch() {
        let (dir, _store) = make_store();
        let conn = Connection::open(dir.path().join("catalog.db")).unwrap();

        let err = SqlitePieceStore::query_pieces(
            &conn,
            "SELECT musicsheetid, work_title FROM musicsheet",
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, PieceStoreError::SchemaMismatch(_)));
    }

    #[test]
    fn failing_query_is_storage_unavailable_and_releases_connection() {
        let (dir, _) = make_store();
        let store = SqlitePieceStore::new(
            dir.path().join("catalog.db"),
            PieceStoreConfig {
                read_pool_size: 1,
                ..PieceStoreConfig::default()
            },
        )
        .unwrap();
        let writer = Connection::open(dir.path().join("catalog.db")).unwrap();

        writer
            .execute("ALTER TABLE musicsheet RENAME TO musicsheet_gone", [])
            .unwrap();
        assert!(matches!(
            store.list_pieces(1, 10, &PieceFilter::default()),
            Err(PieceStoreError::StorageUnavailable(_))
        ));
        assert!(matches!(
            store.list_pieces(
                1,
                10,
                &PieceFilter {
                    period: Some("Baroque".to_string()),
                    ..PieceFilter::default()
                }
            ),
            Err(PieceStoreError::StorageUnavailable(_))
        ));
        assert!(matches!(
            store.get_piece_by_id(1),
            Err(PieceStoreError::StorageUnavailable(_))
        ));

        writer
            .execute("ALTER TABLE musicsheet_gone RENAME TO musicsheet", [])
            .unwrap();
        // Same single connection, served again after the failures
        assert_eq!(store.count_pieces().unwrap(), 25);
        assert_eq!(store.get_piece_by_id(1).unwrap().id, 1);
        assert_eq!(
            store
                .list_pieces(1, 10, &PieceFilter::default())
                .unwrap()
                .pieces
                .len(),
            10
        );
    }

    #[tokio::test]
    async fn concurrent_reads_do_not_block() {
        let (_dir, store) = make_store();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                tokio::spawn({
                    let store = store.clone();
                    async move {
                        for _ in 0..20 {
                            let page = store
                                .list_pieces(i % 3 + 1, 10, &PieceFilter::default())
                                .unwrap();
                            assert_eq!(page.total_pages, 3);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
    }
}
