//! sqlite-adapter: SQLite implementation of the counter ports.
//!
//! Purpose
//! - Provide a file-based database so counters survive restarts without any
//!   external service.
//! - Implements `CounterDatabase` and `CounterRepository` from the `domain`
//!   crate.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - One connection guarded by a mutex; a session holds the lock until it is
//!   dropped.
//! - Stores timestamps as seconds since UNIX_EPOCH.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use domain::{CoreError, Counter, CounterDatabase, CounterName, CounterRepository};
use rusqlite::{params, Connection, OptionalExtension};

/// Process-wide SQLite handle.
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

/// One acquired session; releases the connection on drop.
pub struct SqliteSession<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl SqliteDb {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(map_sqerr)?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(map_sqerr)?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open the database at `path`, creating its parent directory first.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| CoreError::Storage(format!("create {}: {e}", dir.display())))?;
        }
        Self::new(path)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Storage("mutex poisoned".into()))
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS counters (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            value INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )
    .map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Storage(format!("sqlite error: {e}"))
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn system_time_to_secs(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}

fn secs_to_system_time(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

fn row_to_counter(row: &rusqlite::Row) -> Result<Counter, CoreError> {
    let id: i64 = row.get(0).map_err(map_sqerr)?;
    let name: String = row.get(1).map_err(map_sqerr)?;
    let value: i64 = row.get(2).map_err(map_sqerr)?;
    let created_at: i64 = row.get(3).map_err(map_sqerr)?;
    let updated_at: i64 = row.get(4).map_err(map_sqerr)?;

    let name =
        CounterName::new(name).map_err(|e| CoreError::Storage(format!("bad name in db: {e}")))?;
    Ok(Counter {
        id,
        name,
        value,
        created_at: secs_to_system_time(created_at),
        updated_at: secs_to_system_time(updated_at),
    })
}

impl CounterRepository for SqliteSession<'_> {
    fn find(&self, name: &CounterName) -> Result<Option<Counter>, CoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, value, created_at, updated_at FROM counters WHERE name = ?1")
            .map_err(map_sqerr)?;
        let mut rows = stmt.query(params![name.as_str()]).map_err(map_sqerr)?;
        if let Some(row) = rows.next().map_err(map_sqerr)? {
            Ok(Some(row_to_counter(row)?))
        } else {
            Ok(None)
        }
    }

    fn insert(
        &self,
        name: &CounterName,
        value: i64,
        now: SystemTime,
    ) -> Result<Counter, CoreError> {
        let ts = system_time_to_secs(now);
        let res = self.conn.execute(
            "INSERT INTO counters(name, value, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![name.as_str(), value, ts],
        );
        match res {
            Ok(_) => Ok(Counter {
                id: self.conn.last_insert_rowid(),
                name: name.clone(),
                value,
                created_at: secs_to_system_time(ts),
                updated_at: secs_to_system_time(ts),
            }),
            Err(e) if is_unique_violation(&e) => Err(CoreError::AlreadyExists),
            Err(e) => Err(map_sqerr(e)),
        }
    }

    fn add(
        &self,
        name: &CounterName,
        delta: i64,
        now: SystemTime,
    ) -> Result<Option<i64>, CoreError> {
        // SQLite silently turns an overflowing integer sum into a REAL, so the
        // checked add happens here inside a write transaction.
        let tx = self.conn.unchecked_transaction().map_err(map_sqerr)?;
        let current: Option<i64> = tx
            .query_row(
                "SELECT value FROM counters WHERE name = ?1",
                params![name.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sqerr)?;
        let Some(current) = current else {
            return Ok(None);
        };
        let next = current.checked_add(delta).ok_or(CoreError::Overflow)?;
        tx.execute(
            "UPDATE counters SET value = ?1, updated_at = ?2 WHERE name = ?3",
            params![next, system_time_to_secs(now), name.as_str()],
        )
        .map_err(map_sqerr)?;
        tx.commit().map_err(map_sqerr)?;
        Ok(Some(next))
    }

    fn set(
        &self,
        name: &CounterName,
        value: i64,
        now: SystemTime,
    ) -> Result<Option<i64>, CoreError> {
        let changed = self
            .conn
            .execute(
                "UPDATE counters SET value = ?1, updated_at = ?2 WHERE name = ?3",
                params![value, system_time_to_secs(now), name.as_str()],
            )
            .map_err(map_sqerr)?;
        Ok((changed > 0).then_some(value))
    }
}

impl CounterDatabase for SqliteDb {
    type Session<'a> = SqliteSession<'a>;

    fn session(&self) -> Result<Self::Session<'_>, CoreError> {
        Ok(SqliteSession { conn: self.lock()? })
    }

    fn reset_all(&self) -> Result<(), CoreError> {
        let conn = self.lock()?;
        conn.execute_batch("DROP TABLE IF EXISTS counters;")
            .map_err(map_sqerr)?;
        init_schema(&conn)
    }
}
