use std::fmt;

use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension};

use super::{opt_ts_column, ts_column, Ledger};
use crate::clock::to_storage;
use crate::error::LedgerError;

/// A calendar entry. Events without a time are kept as open reminders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub when: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Automation,
    Project,
}

impl TaskKind {
    fn as_str(self) -> &'static str {
        match self {
            TaskKind::Automation => "automacao",
            TaskKind::Project => "projeto",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub kind: TaskKind,
    pub description: String,
    pub created_at: NaiveDateTime,
}

impl Ledger {
    pub fn insert_event(
        &self,
        title: &str,
        when: Option<NaiveDateTime>,
        created_at: NaiveDateTime,
    ) -> Result<i64, LedgerError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO eventos (titulo, quando, criado_em) VALUES (?1, ?2, ?3)",
                params![title, when.as_ref().map(to_storage), to_storage(&created_at)],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Events at or after `now`, soonest first, followed by undated ones.
    pub fn upcoming_events(
        &self,
        now: NaiveDateTime,
        limit: usize,
    ) -> Result<Vec<Event>, LedgerError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, titulo, quando, criado_em FROM eventos
                 WHERE quando IS NULL OR quando >= ?1
                 ORDER BY quando IS NULL, quando, id
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![to_storage(&now), limit as i64], |row| {
                Ok(Event {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    when: opt_ts_column(row, 2)?,
                    created_at: ts_column(row, 3)?,
                })
            })?;
            rows.collect()
        })
    }

    pub fn insert_task(
        &self,
        kind: TaskKind,
        description: &str,
        created_at: NaiveDateTime,
    ) -> Result<i64, LedgerError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tarefas (tipo, descricao, criado_em) VALUES (?1, ?2, ?3)",
                params![kind.as_str(), description, to_storage(&created_at)],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Records a project task and, when given, its deadline event. Both rows
    /// are written or neither is.
    pub fn insert_project(
        &self,
        description: &str,
        deadline: Option<(&str, NaiveDateTime)>,
        created_at: NaiveDateTime,
    ) -> Result<i64, LedgerError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO tarefas (tipo, descricao, criado_em) VALUES (?1, ?2, ?3)",
                params![TaskKind::Project.as_str(), description, to_storage(&created_at)],
            )?;
            let id = tx.last_insert_rowid();
            if let Some((title, at)) = deadline {
                tx.execute(
                    "INSERT INTO eventos (titulo, quando, criado_em) VALUES (?1, ?2, ?3)",
                    params![title, to_storage(&at), to_storage(&created_at)],
                )?;
            }
            tx.commit()?;
            Ok(id)
        })
    }

    /// Most recent tasks of one kind, newest first.
    pub fn recent_tasks(&self, kind: TaskKind, limit: usize) -> Result<Vec<Task>, LedgerError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, descricao, criado_em FROM tarefas
                 WHERE tipo = ?1
                 ORDER BY criado_em DESC, id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![kind.as_str(), limit as i64], |row| {
                Ok(Task {
                    id: row.get(0)?,
                    kind,
                    description: row.get(1)?,
                    created_at: ts_column(row, 2)?,
                })
            })?;
            rows.collect()
        })
    }

    pub fn save_session(
        &self,
        id: &str,
        state_json: &str,
        updated_at: NaiveDateTime,
    ) -> Result<(), LedgerError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessoes (id, estado, atualizado_em) VALUES (?1, ?2, ?3)
                 ON CONFLICT (id) DO UPDATE SET
                    estado = excluded.estado,
                    atualizado_em = excluded.atualizado_em",
                params![id, state_json, to_storage(&updated_at)],
            )?;
            Ok(())
        })
    }

    pub fn load_session(&self, id: &str) -> Result<Option<String>, LedgerError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT estado FROM sessoes WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::from_storage;

    fn ts(s: &str) -> NaiveDateTime {
        from_storage(s).unwrap()
    }

    #[test]
    fn upcoming_events_skip_past_and_sort() {
        let ledger = Ledger::open_in_memory().unwrap();
        let created = ts("2024-05-01 08:00:00");
        ledger.insert_event("passado", Some(ts("2024-04-30 10:00:00")), created).unwrap();
        ledger.insert_event("sem data", None, created).unwrap();
        ledger.insert_event("depois", Some(ts("2024-05-03 10:00:00")), created).unwrap();
        ledger.insert_event("antes", Some(ts("2024-05-02 10:00:00")), created).unwrap();

        let events = ledger.upcoming_events(ts("2024-05-01 09:00:00"), 10).unwrap();
        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["antes", "depois", "sem data"]);
    }

    #[test]
    fn upcoming_events_respects_limit() {
        let ledger = Ledger::open_in_memory().unwrap();
        let created = ts("2024-05-01 08:00:00");
        for i in 0..5 {
            ledger.insert_event(&format!("evento {i}"), None, created).unwrap();
        }
        assert_eq!(ledger.upcoming_events(created, 3).unwrap().len(), 3);
    }

    #[test]
    fn tasks_filtered_by_kind() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger.insert_task(TaskKind::Automation, "backup semanal", ts("2024-05-01 08:00:00")).unwrap();
        ledger.insert_task(TaskKind::Project, "site novo", ts("2024-05-02 08:00:00")).unwrap();
        ledger.insert_task(TaskKind::Automation, "relatório", ts("2024-05-03 08:00:00")).unwrap();

        let tasks = ledger.recent_tasks(TaskKind::Automation, 10).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].description, "relatório");
        assert!(tasks.iter().all(|t| t.kind == TaskKind::Automation));
    }

    #[test]
    fn project_and_deadline_written_together() {
        let ledger = Ledger::open_in_memory().unwrap();
        let created = ts("2024-05-01 08:00:00");
        let id = ledger
            .insert_project("mudança", Some(("Prazo: mudança", ts("2024-06-01 00:00:00"))), created)
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(ledger.recent_tasks(TaskKind::Project, 10).unwrap().len(), 1);
        assert_eq!(ledger.upcoming_events(created, 10).unwrap()[0].title, "Prazo: mudança");
    }

    #[test]
    fn failed_deadline_rolls_back_project() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger.with_conn(|c| c.execute_batch("DROP TABLE eventos")).unwrap();

        let created = ts("2024-05-01 08:00:00");
        assert!(ledger
            .insert_project("mudança", Some(("Prazo", ts("2024-06-01 00:00:00"))), created)
            .is_err());
        assert!(ledger.recent_tasks(TaskKind::Project, 10).unwrap().is_empty());
    }

    #[test]
    fn session_save_overwrites() {
        let ledger = Ledger::open_in_memory().unwrap();
        assert!(ledger.load_session("s1").unwrap().is_none());
        ledger.save_session("s1", "{\"turn\":0}", ts("2024-05-01 08:00:00")).unwrap();
        ledger.save_session("s1", "{\"turn\":3}", ts("2024-05-01 08:05:00")).unwrap();
        assert_eq!(ledger.load_session("s1").unwrap().as_deref(), Some("{\"turn\":3}"));
    }
}
