use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension};

use crate::error::StoreError;
use crate::id::generate_id;
use crate::store::IssueStore;
use crate::types::{Field, FilterValue, Issue, IssueFields, IssueFilter, NewIssue};

/// SQLite-backed document store. One row per issue.
pub struct Db {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

fn parse_dt(s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

pub(crate) fn issue_from_row(row: &rusqlite::Row) -> Result<Issue, rusqlite::Error> {
    let created_on: String = row.get("created_on")?;
    let updated_on: String = row.get("updated_on")?;

    Ok(Issue {
        id: row.get("id")?,
        project: row.get("project")?,
        issue_title: row.get("issue_title")?,
        issue_text: row.get("issue_text")?,
        created_by: row.get("created_by")?,
        assigned_to: row.get("assigned_to")?,
        status_text: row.get("status_text")?,
        created_on: parse_dt(&created_on)?,
        updated_on: parse_dt(&updated_on)?,
        open: row.get("open")?,
    })
}

fn column(field: Field) -> &'static str {
    match field {
        Field::Id => "id",
        other => other.as_str(),
    }
}

impl Db {
    pub fn open(data_dir: &Path) -> Result<Db, StoreError> {
        fs::create_dir_all(data_dir).map_err(|e| {
            StoreError(format!(
                "failed to create data dir {}: {e}",
                data_dir.display()
            ))
        })?;

        let db_path = data_dir.join("issues.sqlite");
        let conn = Connection::open(&db_path)
            .map_err(|e| StoreError(format!("failed to open database: {e}")))?;

        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| StoreError(format!("failed to set busy_timeout: {e}")))?;

        Self::run_migrations(&conn)?;

        Ok(Db {
            conn: Mutex::new(conn),
            path: Some(db_path),
        })
    }

    pub fn open_in_memory() -> Result<Db, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError(format!("failed to open in-memory database: {e}")))?;
        Self::run_migrations(&conn)?;
        Ok(Db {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// On-disk location, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS issues (
                id          TEXT PRIMARY KEY,
                project     TEXT NOT NULL CHECK (project != ''),
                issue_title TEXT NOT NULL,
                issue_text  TEXT NOT NULL,
                created_by  TEXT NOT NULL,
                assigned_to TEXT NOT NULL DEFAULT '',
                status_text TEXT NOT NULL DEFAULT '',
                created_on  TEXT NOT NULL,
                updated_on  TEXT NOT NULL,
                open        INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS issues_project ON issues (project);",
        )
        .map_err(|e| StoreError(format!("migration failed: {e}")))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError("database lock poisoned".to_string()))
    }
}

impl IssueStore for Db {
    fn insert(&self, issue: &NewIssue) -> Result<Issue, StoreError> {
        let id = generate_id();
        let ts = now();
        let ts = format_dt(&ts);

        let conn = self.lock()?;
        conn.query_row(
            "INSERT INTO issues (id, project, issue_title, issue_text, created_by, assigned_to, status_text, created_on, updated_on, open)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1)
             RETURNING *",
            rusqlite::params![
                id,
                issue.project,
                issue.issue_title,
                issue.issue_text,
                issue.created_by,
                issue.assigned_to,
                issue.status_text,
                ts,
                ts,
            ],
            issue_from_row,
        )
        .map_err(|e| StoreError(format!("failed to create issue: {e}")))
    }

    fn find_many(&self, project: &str, filter: &IssueFilter) -> Result<Vec<Issue>, StoreError> {
        let mut where_clauses = vec!["project = ?".to_string()];
        let mut values: Vec<Value> = vec![Value::Text(project.to_string())];

        for (field, value) in filter.clauses() {
            let col = column(field);
            match value {
                FilterValue::Text(text) if field == Field::Id => {
                    where_clauses.push(format!("{col} = lower(?)"));
                    values.push(Value::Text(text.to_string()));
                }
                FilterValue::Text(text) => {
                    where_clauses.push(format!("{col} = ?"));
                    values.push(Value::Text(text.to_string()));
                }
                FilterValue::Bool(b) => {
                    where_clauses.push(format!("{col} = ?"));
                    values.push(Value::Integer(i64::from(b)));
                }
                FilterValue::Unmatchable => {
                    where_clauses.push(format!("{col} = ?"));
                    values.push(Value::Integer(-1));
                }
            }
        }

        let sql = format!(
            "SELECT * FROM issues WHERE {} ORDER BY rowid",
            where_clauses.join(" AND ")
        );

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError(format!("failed to prepare list query: {e}")))?;
        stmt.query_map(rusqlite::params_from_iter(values), issue_from_row)
            .map_err(|e| StoreError(format!("failed to query issues: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError(format!("failed to read issues: {e}")))
    }

    fn find_and_update(
        &self,
        id: &str,
        fields: &IssueFields,
    ) -> Result<Option<Issue>, StoreError> {
        let mut set_clauses = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        for (field, value) in fields.entries() {
            set_clauses.push(format!("{} = ?", column(field)));
            values.push(Value::Text(value.to_string()));
        }

        set_clauses.push("updated_on = ?".to_string());
        values.push(Value::Text(format_dt(&now())));

        values.push(Value::Text(id.to_string()));

        let sql = format!(
            "UPDATE issues SET {} WHERE id = lower(?) RETURNING *",
            set_clauses.join(", ")
        );

        let conn = self.lock()?;
        conn.query_row(&sql, rusqlite::params_from_iter(values), issue_from_row)
            .optional()
            .map_err(|e| StoreError(format!("failed to update issue: {e}")))
    }

    fn find_and_delete(&self, id: &str) -> Result<Option<Issue>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "DELETE FROM issues WHERE id = lower(?1) RETURNING *",
            rusqlite::params![id],
            issue_from_row,
        )
        .optional()
        .map_err(|e| StoreError(format!("failed to delete issue: {e}")))
    }
}

/// Current time at the precision timestamps are persisted with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn format_dt(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
