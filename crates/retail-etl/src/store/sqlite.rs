//! SQLite-backed relational store.

use super::{RelationalStore, Row, SqlValue, StoreSession, Table};
use crate::error::{StoreError, StoreResult};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, ErrorCode, params_from_iter};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// How long a statement waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Store over a SQLite database file.
///
/// Every [`connect`](RelationalStore::connect) opens a fresh connection with
/// foreign keys enforced; the connection closes when the session drops.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

}

impl RelationalStore for SqliteStore {
    fn connect(&self) -> StoreResult<Box<dyn StoreSession + '_>> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("{}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(&self.path)
            .map_err(|e| StoreError::Connection(format!("{}: {}", self.path.display(), e)))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        debug!("Opened SQLite session on {}", self.path.display());
        Ok(Box::new(SqliteSession { conn }))
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}

struct SqliteSession {
    conn: Connection,
}

impl StoreSession for SqliteSession {
    fn ensure_schema(&mut self) -> StoreResult<()> {
        let ddl: Vec<String> = Table::ALL
            .iter()
            .map(|t| format!("{};", t.schema().create_sql()))
            .collect();
        self.conn.execute_batch(&ddl.join("\n")).map_err(|e| {
            match classify(None, e) {
                StoreError::Connection(msg) => StoreError::Connection(msg),
                other => StoreError::Schema(other.to_string()),
            }
        })
    }

    fn replace_rows(&mut self, clears: &[Table], table: Table, rows: &[Row]) -> StoreResult<usize> {
        // Dropping the transaction without commit rolls it back.
        let tx = self
            .conn
            .transaction()
            .map_err(|e| classify(Some(table), e))?;

        for clear in clears {
            tx.execute(&format!("DELETE FROM {}", clear.name()), [])
                .map_err(|e| classify(Some(*clear), e))?;
        }

        let mut inserted = 0;
        {
            let mut stmt = tx
                .prepare(&table.schema().insert_sql())
                .map_err(|e| classify(Some(table), e))?;
            for row in rows {
                inserted += stmt
                    .execute(params_from_iter(row.iter()))
                    .map_err(|e| classify(Some(table), e))?;
            }
        }

        tx.commit().map_err(|e| classify(Some(table), e))?;
        Ok(inserted)
    }

    fn count_rows(&mut self, table: Table) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table.name()), [], |r| {
                r.get(0)
            })
            .map_err(|e| classify(Some(table), e))?;
        Ok(count.max(0) as usize)
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Map a SQLite error onto the store taxonomy.
fn classify(table: Option<Table>, error: rusqlite::Error) -> StoreError {
    let table_name = table.map(|t| t.name().to_string()).unwrap_or_default();
    match &error {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::ConstraintViolation => StoreError::Constraint {
                table: table_name,
                message: error.to_string(),
            },
            ErrorCode::CannotOpen
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::NotADatabase
            | ErrorCode::DatabaseCorrupt
            | ErrorCode::SystemIoFailure
            | ErrorCode::PermissionDenied
            | ErrorCode::ReadOnly
            | ErrorCode::DiskFull => StoreError::Connection(error.to_string()),
            _ => StoreError::Data {
                table: table_name,
                message: error.to_string(),
            },
        },
        rusqlite::Error::InvalidPath(_) => StoreError::Connection(error.to_string()),
        _ => StoreError::Data {
            table: table_name,
            message: error.to_string(),
        },
    }
}
