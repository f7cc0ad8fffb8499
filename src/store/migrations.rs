//! Embedded schema migrations, applied once each and tracked in
//! `schema_version`.

use chrono::Local;
use rusqlite::{params, Connection};
use tracing::debug;

use crate::clock;
use crate::error::LedgerError;

struct Migration {
    id: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        id: "001_finance",
        sql: include_str!("../../migrations/001_finance.sql"),
    },
    Migration {
        id: "002_assistant",
        sql: include_str!("../../migrations/002_assistant.sql"),
    },
];

/// Apply every pending migration. Returns how many were applied.
pub fn apply(conn: &mut Connection) -> Result<usize, LedgerError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            migration_id TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
    )?;

    let mut applied = 0;
    for migration in MIGRATIONS {
        let done: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM schema_version WHERE migration_id = ?1)",
            [migration.id],
            |row| row.get(0),
        )?;
        if done {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)
            .map_err(|e| LedgerError::Migration {
                id: migration.id,
                message: e.to_string(),
            })?;
        tx.execute(
            "INSERT INTO schema_version (migration_id, applied_at) VALUES (?1, ?2)",
            params![migration.id, clock::to_storage(&Local::now().naive_local())],
        )?;
        tx.commit()?;

        debug!(migration = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}
