use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use super::types::ScopeItem;
use super::ScopeError;

/// Read side of the system of record for course catalogues.
///
/// An empty result is a miss, never an error; errors mean the store
/// itself failed.
pub trait ScopeLookup: Send + Sync {
    /// Every course on the given provider's scope of registration.
    fn by_rto_code(&self, rto_code: &str) -> Result<Vec<ScopeItem>, ScopeError>;
    /// Records for the course with the given national code, across
    /// providers.
    fn by_course_code(&self, course_code: &str) -> Result<Vec<ScopeItem>, ScopeError>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS scope_cache (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    rto_code     TEXT NOT NULL,
    course_code  TEXT NOT NULL,
    course_title TEXT NOT NULL,
    anzsco_code  TEXT
);
CREATE INDEX IF NOT EXISTS idx_scope_cache_rto ON scope_cache(rto_code);
CREATE INDEX IF NOT EXISTS idx_scope_cache_course ON scope_cache(course_code);
";

/// SQLite-backed scope cache of previously fetched course records.
///
/// The connection sits behind a mutex so one adapter can serve
/// concurrent audit runs through `&dyn ScopeLookup`.
pub struct SqliteScopeLookup {
    conn: Mutex<Connection>,
}

impl SqliteScopeLookup {
    /// Open (creating if needed) a scope cache at the given path.
    pub fn open(path: &Path) -> Result<Self, ScopeError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory cache, used by tests and embedders without a disk path.
    pub fn open_in_memory() -> Result<Self, ScopeError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record one course under a provider.
    pub fn insert(&self, rto_code: &str, item: &ScopeItem) -> Result<(), ScopeError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO scope_cache (rto_code, course_code, course_title, anzsco_code)
             VALUES (?1, ?2, ?3, ?4)",
            params![rto_code, item.code, item.title, item.anzsco_code],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ScopeError> {
        self.conn
            .lock()
            .map_err(|_| ScopeError::Store("scope cache lock poisoned".to_string()))
    }

    fn query(&self, sql: &str, key: &str) -> Result<Vec<ScopeItem>, ScopeError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![key], |row| {
            Ok(ScopeItem {
                code: row.get(0)?,
                title: row.get(1)?,
                anzsco_code: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

impl ScopeLookup for SqliteScopeLookup {
    fn by_rto_code(&self, rto_code: &str) -> Result<Vec<ScopeItem>, ScopeError> {
        self.query(
            "SELECT course_code, course_title, anzsco_code
             FROM scope_cache WHERE rto_code = ?1 ORDER BY id",
            rto_code,
        )
    }

    fn by_course_code(&self, course_code: &str) -> Result<Vec<ScopeItem>, ScopeError> {
        self.query(
            "SELECT course_code, course_title, anzsco_code
             FROM scope_cache WHERE course_code = ?1 ORDER BY id",
            course_code,
        )
    }
}

/// Map-backed lookup for tests and embedders that have no SQLite store.
#[derive(Debug, Default)]
pub struct InMemoryScopeLookup {
    by_rto: HashMap<String, Vec<ScopeItem>>,
    by_course: HashMap<String, Vec<ScopeItem>>,
}

impl InMemoryScopeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider's full catalogue.
    pub fn with_rto(mut self, rto_code: &str, items: Vec<ScopeItem>) -> Self {
        for item in &items {
            self.by_course
                .entry(item.code.clone())
                .or_default()
                .push(item.clone());
        }
        self.by_rto.insert(rto_code.to_string(), items);
        self
    }
}

impl ScopeLookup for InMemoryScopeLookup {
    fn by_rto_code(&self, rto_code: &str) -> Result<Vec<ScopeItem>, ScopeError> {
        Ok(self.by_rto.get(rto_code).cloned().unwrap_or_default())
    }

    fn by_course_code(&self, course_code: &str) -> Result<Vec<ScopeItem>, ScopeError> {
        Ok(self.by_course.get(course_code).cloned().unwrap_or_default())
    }
}
