use crate::sqlite_column;
use crate::sqlite_persistence::{
    migrate_if_needed, Column, ForeignKey, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    path::Path,
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, SystemTime},
};
use tracing::debug;

use super::auth::{AuthToken, AuthTokenValue, CredentialsHasher, UsernamePasswordCredentials};
use super::user_store::{UserAuthCredentialsStore, UserAuthTokenStore, UserStore};

const USER_FOREIGN_KEY: ForeignKey = ForeignKey {
    foreign_table: "user",
    foreign_column: "id",
};

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_user_handle", "handle")],
};
const AUTH_TOKEN_TABLE_V_0: Table = Table {
    name: "auth_token",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FOREIGN_KEY)
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    indices: &[("idx_auth_token_value", "value")],
};
const USER_PASSWORD_CREDENTIALS_V_0: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&USER_FOREIGN_KEY)
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
};

pub const USER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USER_TABLE_V_0,
        AUTH_TOKEN_TABLE_V_0,
        USER_PASSWORD_CREDENTIALS_V_0,
    ],
    migration: None,
}];

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let db_path = db_path.as_ref();
        let mut conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open user database {:?}", db_path))?;
        migrate_if_needed(&mut conn, USER_VERSIONED_SCHEMAS)
            .context("Failed to prepare user schema")?;
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;

        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("User database connection is poisoned"))
    }
}

fn system_time_from_column_result(value: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(value.max(0) as u64)
}

fn auth_token_from_row(row: &rusqlite::Row) -> rusqlite::Result<AuthToken> {
    Ok(AuthToken {
        user_id: row.get(0)?,
        value: AuthTokenValue(row.get(1)?),
        created: system_time_from_column_result(row.get(2)?),
        last_used: row
            .get::<usize, Option<i64>>(3)?
            .map(system_time_from_column_result),
    })
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, user_handle: &str) -> Result<usize> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO user (handle) VALUES (?1)",
            params![user_handle],
        )
        .with_context(|| format!("Failed to create user {}", user_handle))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT handle FROM user WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id FROM user WHERE handle = ?1",
                params![user_handle],
                |row| row.get(0),
            )
            .optional()?)
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_user_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_token WHERE value = ?1",
                params![value.0],
                auth_token_from_row,
            )
            .optional()?)
    }

    fn delete_user_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let token = match self.get_user_auth_token(value)? {
            Some(token) => token,
            None => return Ok(None),
        };
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM auth_token WHERE value = ?1",
            params![token.value.0],
        )?;
        debug!("Deleted auth token of user {}", token.user_id);
        Ok(Some(token))
    }

    fn update_user_auth_token_last_used_timestamp(&self, value: &AuthTokenValue) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "UPDATE auth_token SET last_used = {} WHERE value = ?1",
                DEFAULT_TIMESTAMP
            ),
            params![value.0],
        )?;
        Ok(())
    }

    fn add_user_auth_token(&self, token: &AuthToken) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO auth_token (value, user_id) VALUES (?1, ?2)",
            params![token.value.0, token.user_id],
        )?;
        Ok(())
    }
}

impl UserAuthCredentialsStore for SqliteUserStore {
    fn get_password_credentials(
        &self,
        user_handle: &str,
    ) -> Result<Option<UsernamePasswordCredentials>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT c.user_id, c.salt, c.hash, c.hasher, c.created
                 FROM user_password_credentials c JOIN user u ON u.id = c.user_id
                 WHERE u.handle = ?1",
                params![user_handle],
                |row| {
                    Ok((
                        row.get::<usize, usize>(0)?,
                        row.get::<usize, String>(1)?,
                        row.get::<usize, String>(2)?,
                        row.get::<usize, String>(3)?,
                        row.get::<usize, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((user_id, salt, hash, hasher, created)) => {
                Ok(Some(UsernamePasswordCredentials {
                    user_id,
                    salt,
                    hash,
                    hasher: CredentialsHasher::from_str(&hasher)?,
                    created: system_time_from_column_result(created),
                }))
            }
        }
    }

    fn set_password_credentials(&self, credentials: &UsernamePasswordCredentials) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO user_password_credentials (user_id, salt, hash, hasher) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET salt = excluded.salt, hash = excluded.hash, hasher = excluded.hasher",
            params![
                credentials.user_id,
                credentials.salt,
                credentials.hash,
                credentials.hasher.to_string()
            ],
        )
        .with_context(|| format!("Failed to set password of user {}", credentials.user_id))?;
        Ok(())
    }
}
