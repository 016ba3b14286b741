//! SQLite-hosted entity sets.

use super::open::{open_db, open_db_in_memory};
use super::DbError;
use crate::context::{ApplyReport, Change, ContextBackend, Row};
use crate::error::RepoResult;
use log::warn;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;

static SET_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid set name regex"));

/// Backend storing each entity set in its own table of JSON bodies.
///
/// Needs a database location, so it is never picked as the canonical,
/// zero-configuration context.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

fn validate_set_name(set: &str) -> Result<(), DbError> {
    if SET_NAME_RE.is_match(set) {
        Ok(())
    } else {
        Err(DbError::InvalidSetName(set.to_string()))
    }
}

fn table_exists(conn: &Connection, set: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [set],
        |row| row.get::<_, i64>(0),
    )
    .map(|exists| exists == 1)
}

fn create_table(conn: &Connection, set: &str) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS \"{set}\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            body TEXT NOT NULL
        );"
    ))
}

fn parse_body(set: &str, id: i64, body: &str) -> Result<Row, DbError> {
    serde_json::from_str(body).map_err(|err| DbError::CorruptRow {
        set: set.to_string(),
        id,
        message: err.to_string(),
    })
}

fn insert_row(tx: &Transaction<'_>, set: &str, body: &str) -> rusqlite::Result<i64> {
    tx.execute(&format!("INSERT INTO \"{set}\" (body) VALUES (?1);"), [body])?;
    Ok(tx.last_insert_rowid())
}

fn update_row(tx: &Transaction<'_>, set: &str, id: i64, body: &str) -> rusqlite::Result<bool> {
    let changed = tx.execute(
        &format!("UPDATE \"{set}\" SET body = ?1 WHERE id = ?2;"),
        params![body, id],
    )?;
    Ok(changed > 0)
}

impl ContextBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn has_set(&self, set: &str) -> bool {
        if validate_set_name(set).is_err() {
            return false;
        }
        match table_exists(&self.conn.lock(), set) {
            Ok(exists) => exists,
            Err(err) => {
                warn!("event=set_probe module=db status=error set={set} error={err}");
                false
            }
        }
    }

    fn ensure_set(&self, set: &str) -> RepoResult<()> {
        validate_set_name(set)?;
        create_table(&self.conn.lock(), set)?;
        Ok(())
    }

    fn load(&self, set: &str) -> RepoResult<Vec<(i64, Row)>> {
        validate_set_name(set)?;
        let conn = self.conn.lock();
        if !table_exists(&conn, set)? {
            return Ok(Vec::new());
        }

        let mut stmt = conn.prepare(&format!("SELECT id, body FROM \"{set}\" ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut loaded = Vec::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let body: String = row.get(1)?;
            loaded.push((id, parse_body(set, id, &body)?));
        }
        Ok(loaded)
    }

    fn load_one(&self, set: &str, id: i64) -> RepoResult<Option<Row>> {
        validate_set_name(set)?;
        let conn = self.conn.lock();
        if !table_exists(&conn, set)? {
            return Ok(None);
        }

        let body: Option<String> = conn
            .query_row(
                &format!("SELECT body FROM \"{set}\" WHERE id = ?1;"),
                [id],
                |row| row.get(0),
            )
            .optional()?;
        match body {
            Some(body) => Ok(Some(parse_body(set, id, &body)?)),
            None => Ok(None),
        }
    }

    fn apply(&self, set: &str, changes: Vec<Change>) -> RepoResult<ApplyReport> {
        validate_set_name(set)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        create_table(&tx, set)?;

        let mut report = ApplyReport::default();
        for change in changes {
            match change {
                Change::Insert(row) => {
                    let body = serde_json::to_string(&row)?;
                    report.inserted.push(insert_row(&tx, set, &body)?);
                }
                Change::Update { id, row } => {
                    let body = serde_json::to_string(&row)?;
                    if update_row(&tx, set, id, &body)? {
                        report.updated += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
                Change::Upsert { id, row } => {
                    let body = serde_json::to_string(&row)?;
                    if update_row(&tx, set, id, &body)? {
                        report.updated += 1;
                    } else {
                        report.inserted.push(insert_row(&tx, set, &body)?);
                    }
                }
                Change::Delete { id } => {
                    let changed =
                        tx.execute(&format!("DELETE FROM \"{set}\" WHERE id = ?1;"), [id])?;
                    if changed > 0 {
                        report.deleted += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
            }
        }

        tx.commit()?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_set_name, SqliteBackend};
    use crate::context::{Change, ContextBackend};
    use crate::db::DbError;
    use crate::error::RepoError;
    use serde_json::json;

    #[test]
    fn set_names_are_restricted_to_identifiers() {
        assert!(validate_set_name("AuditLog").is_ok());
        assert!(validate_set_name("_private_2").is_ok());
        assert!(matches!(
            validate_set_name("users\"; DROP TABLE x; --"),
            Err(DbError::InvalidSetName(_))
        ));
        assert!(validate_set_name("").is_err());
        assert!(validate_set_name("9lives").is_err());
    }

    #[test]
    fn applies_batches_and_reports_missing_rows() {
        let backend = SqliteBackend::open_in_memory().expect("open");
        assert!(!backend.has_set("Widget"));

        let report = backend
            .apply(
                "Widget",
                vec![
                    Change::Insert(json!({"name": "a"})),
                    Change::Insert(json!({"name": "b"})),
                    Change::Delete { id: 42 },
                ],
            )
            .expect("apply");
        assert_eq!(report.inserted, vec![1, 2]);
        assert_eq!(report.skipped, 1);
        assert!(backend.has_set("Widget"));

        let row = backend.load_one("Widget", 2).expect("load").expect("row");
        assert_eq!(row, json!({"name": "b"}));
        assert_eq!(backend.load("Widget").expect("load all").len(), 2);
    }

    #[test]
    fn rejects_invalid_set_name_on_write() {
        let backend = SqliteBackend::open_in_memory().expect("open");
        let err = backend
            .apply("bad name", vec![Change::Insert(json!({}))])
            .expect_err("invalid set must fail");
        assert!(matches!(err, RepoError::Db(DbError::InvalidSetName(_))));
    }
}
