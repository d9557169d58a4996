use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use tracing::info;

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

/// Offset added to every schema version stored in `PRAGMA user_version`,
/// so that databases never touched by this server (user_version = 0) are
/// told apart from versioned ones.
pub const BASE_DB_VERSION: usize = 4200;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                is_unique: false,
                default_value: None,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub is_unique: bool,
    pub default_value: Option<&'static str>,
    pub foreign_key: Option<&'static ForeignKey>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indices: &'static [(&'static str, &'static str)],
}

impl Table {
    fn create_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let mut sql = format!("{} {}", column.name, column.sql_type.as_sql());
                if column.is_primary_key {
                    sql.push_str(" PRIMARY KEY");
                }
                if column.non_null {
                    sql.push_str(" NOT NULL");
                }
                if column.is_unique {
                    sql.push_str(" UNIQUE");
                }
                if let Some(default_value) = column.default_value {
                    sql.push_str(&format!(" DEFAULT {}", default_value));
                }
                if let Some(foreign_key) = column.foreign_key {
                    sql.push_str(&format!(
                        " REFERENCES {}({}) ON DELETE CASCADE",
                        foreign_key.foreign_table, foreign_key.foreign_column
                    ));
                }
                sql
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({});", self.name, columns)
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute(&self.create_sql(), params![])
            .with_context(|| format!("Failed to create table {}", self.name))?;
        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    /// Checks that the table exists with the expected column names, in order.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual: Vec<String> = stmt
            .query_map(params![], |row| row.get::<_, String>(1))?
            .collect::<Result<_, _>>()?;
        let expected: Vec<&str> = self.columns.iter().map(|c| c.name).collect();

        if actual.is_empty() {
            bail!("Table {} does not exist", self.name);
        }
        if actual != expected {
            bail!(
                "Table {} has columns [{}], expected [{}]",
                self.name,
                actual.join(", "),
                expected.join(", ")
            );
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.pragma_update(None, "user_version", BASE_DB_VERSION + self.version)?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

/// Brings the database behind `conn` to the latest of `schemas`.
///
/// A database without user tables gets the latest schema created directly.
/// Otherwise the stored version is validated and every later migration is
/// applied inside a single transaction.
pub fn migrate_if_needed(conn: &mut Connection, schemas: &[VersionedSchema]) -> Result<()> {
    let latest = schemas.last().context("No schema versions defined")?;

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;
    if table_count == 0 {
        info!("Creating db schema at version {}", latest.version);
        return latest.create(conn);
    }

    let db_version: i64 = conn
        .query_row("PRAGMA user_version;", [], |r| r.get(0))
        .context("Failed to read database version")?;
    let version = db_version - BASE_DB_VERSION as i64;
    if version < 0 {
        bail!(
            "Database version {} does not contain base db version {}",
            db_version,
            BASE_DB_VERSION
        );
    }
    let version = version as usize;
    let current = match schemas.get(version) {
        Some(schema) => schema,
        None => bail!("Database version {} is too new", version),
    };
    current.validate(conn)?;

    if version == latest.version {
        return Ok(());
    }

    let tx = conn.transaction()?;
    let mut latest_from = version;
    for schema in schemas.iter().skip(version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating db from version {} to {}",
                latest_from, schema.version
            );
            migration_fn(&tx)?;
        }
        latest_from = schema.version;
    }
    tx.pragma_update(None, "user_version", BASE_DB_VERSION + latest_from)?;
    tx.commit()?;
    Ok(())
}
