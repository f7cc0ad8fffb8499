//! SQLite-backed persistence shared by every agent.
//!
//! One connection, guarded by a mutex. rusqlite's `Connection` is `Send` but
//! not `Sync`, and tool handlers live behind an `Arc`, so every query goes
//! through [`Ledger::with_conn`]. The lock is never held across an `.await`.

mod assistant;
mod finance;
mod migrations;

use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::Connection;
use tracing::info;

use crate::clock;
use crate::error::LedgerError;

pub use assistant::{Event, Task, TaskKind};

pub struct Ledger {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger").finish_non_exhaustive()
    }
}

impl Ledger {
    /// Open (or create) the database file and bring the schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let ledger = Self::init(conn)?;
        info!(path = %path.display(), "ledger opened");
        Ok(ledger)
    }

    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self, LedgerError> {
        migrations::apply(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, LedgerError> {
        let conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(f(&conn)?)
    }
}

/// Read a stored timestamp column.
fn ts_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    clock::from_storage(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_ts_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        clock::from_storage(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}
