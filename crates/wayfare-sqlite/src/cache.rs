use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use wayfare_core::{CacheBackend, CacheEntry, CacheLookup, WayfareError};

const DEFAULT_TABLE: &str = "ai_cache";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for [`SqliteCacheBackend`].
#[derive(Debug, Clone)]
pub struct SqliteCacheConfig {
    /// Database file, or `:memory:`.
    pub path: PathBuf,
    /// Table holding cache rows. Defaults to `"ai_cache"`.
    pub table: String,
}

impl SqliteCacheConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: DEFAULT_TABLE.to_string(),
        }
    }

    /// A private in-memory database, discarded when the backend is dropped.
    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

/// SQL text for one table, built once at construction.
struct Statements {
    find_scoped: String,
    find_global: String,
    insert: String,
    delete_expired: String,
    delete_scoped: String,
    delete_global: String,
    count: String,
}

const COLUMNS: &str =
    "id, trip_id, query, query_type, result, model, tokens_used, created_at, expires_at";

impl Statements {
    fn for_table(table: &str) -> Self {
        // The global partition is matched with IS NULL; `trip_id = NULL` never matches.
        let find = |scope_predicate: &str| {
            format!(
                "SELECT {COLUMNS} FROM {table} \
                 WHERE {scope_predicate} AND query = :query AND query_type = :query_type \
                 AND expires_at > :now \
                 ORDER BY created_at DESC, rowid DESC LIMIT 1"
            )
        };
        Self {
            find_scoped: find("trip_id = :scope"),
            find_global: find("trip_id IS NULL"),
            insert: format!(
                "INSERT INTO {table} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            delete_expired: format!("DELETE FROM {table} WHERE expires_at <= ?1"),
            delete_scoped: format!("DELETE FROM {table} WHERE trip_id = ?1"),
            delete_global: format!("DELETE FROM {table} WHERE trip_id IS NULL"),
            count: format!("SELECT COUNT(*) FROM {table}"),
        }
    }
}

/// SQLite-backed cache storage.
///
/// Timestamps are stored as Unix nanoseconds and results as JSON text.
/// Duplicate rows for one key are allowed; lookups return the newest.
pub struct SqliteCacheBackend {
    conn: Arc<Mutex<Connection>>,
    sql: Arc<Statements>,
}

impl SqliteCacheBackend {
    /// Open (or create) the database and its table.
    pub fn new(config: SqliteCacheConfig) -> Result<Self, WayfareError> {
        validate_table_name(&config.table)?;

        let conn = Connection::open(&config.path)
            .map_err(|e| WayfareError::Storage(format!("SQLite open: {e}")))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| WayfareError::Storage(format!("SQLite busy_timeout: {e}")))?;

        let table = &config.table;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id          TEXT    PRIMARY KEY,
                trip_id     TEXT,
                query       TEXT    NOT NULL,
                query_type  TEXT    NOT NULL,
                result      TEXT    NOT NULL,
                model       TEXT,
                tokens_used INTEGER,
                created_at  INTEGER NOT NULL,
                expires_at  INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS {table}_lookup_idx ON {table} (query_type, query, trip_id);
            CREATE INDEX IF NOT EXISTS {table}_expiry_idx ON {table} (expires_at);"
        ))
        .map_err(|e| WayfareError::Storage(format!("SQLite create table: {e}")))?;

        tracing::debug!(path = %config.path.display(), table = %table, "opened sqlite ai cache");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            sql: Arc::new(Statements::for_table(table)),
        })
    }

    /// Shorthand for an in-memory backend with the default table.
    pub fn in_memory() -> Result<Self, WayfareError> {
        Self::new(SqliteCacheConfig::in_memory())
    }

    /// Number of stored rows, including expired rows not yet swept.
    pub async fn count(&self) -> Result<u64, WayfareError> {
        self.with_conn(|conn, sql| {
            let n: i64 = conn
                .query_row(&sql.count, [], |row| row.get(0))
                .map_err(|e| WayfareError::Storage(format!("SQLite COUNT: {e}")))?;
            Ok(n as u64)
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, WayfareError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &Statements) -> Result<T, WayfareError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let sql = Arc::clone(&self.sql);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| WayfareError::Storage(format!("Lock: {e}")))?;
            f(&conn, &sql)
        })
        .await
        .map_err(|e| WayfareError::Storage(format!("spawn_blocking: {e}")))?
    }
}

#[async_trait]
impl CacheBackend for SqliteCacheBackend {
    async fn find_valid(
        &self,
        lookup: &CacheLookup,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, WayfareError> {
        let lookup = lookup.clone();
        let now = now_nanos(now);

        let raw = self
            .with_conn(move |conn, sql| {
                let query_type = lookup.query_type.as_str();
                let row = match &lookup.scope {
                    Some(scope) => conn.query_row(
                        &sql.find_scoped,
                        rusqlite::named_params! {
                            ":scope": scope,
                            ":query": lookup.query,
                            ":query_type": query_type,
                            ":now": now,
                        },
                        RawRow::from_row,
                    ),
                    None => conn.query_row(
                        &sql.find_global,
                        rusqlite::named_params! {
                            ":query": lookup.query,
                            ":query_type": query_type,
                            ":now": now,
                        },
                        RawRow::from_row,
                    ),
                };
                row.optional()
                    .map_err(|e| WayfareError::Storage(format!("SQLite SELECT: {e}")))
            })
            .await?;

        raw.map(RawRow::into_entry).transpose()
    }

    async fn insert(&self, entry: &CacheEntry) -> Result<(), WayfareError> {
        let result = serde_json::to_string(&entry.result)
            .map_err(|e| WayfareError::Serialization(format!("cache result: {e}")))?;
        let created_at = to_nanos(entry.created_at, &entry.id)?;
        let expires_at = to_nanos(entry.expires_at, &entry.id)?;
        let entry = entry.clone();

        self.with_conn(move |conn, sql| {
            conn.execute(
                &sql.insert,
                params![
                    entry.id,
                    entry.scope,
                    entry.query,
                    entry.query_type.as_str(),
                    result,
                    entry.model,
                    entry.tokens_used.map(i64::from),
                    created_at,
                    expires_at,
                ],
            )
            .map_err(|e| WayfareError::Storage(format!("SQLite INSERT: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, WayfareError> {
        let now = now_nanos(now);
        self.with_conn(move |conn, sql| {
            let removed = conn
                .execute(&sql.delete_expired, params![now])
                .map_err(|e| WayfareError::Storage(format!("SQLite DELETE expired: {e}")))?;
            Ok(removed as u64)
        })
        .await
    }

    async fn delete_scope(&self, scope: Option<&str>) -> Result<u64, WayfareError> {
        let scope = scope.map(str::to_string);
        self.with_conn(move |conn, sql| {
            let removed = match scope {
                Some(scope) => conn.execute(&sql.delete_scoped, params![scope]),
                None => conn.execute(&sql.delete_global, []),
            }
            .map_err(|e| WayfareError::Storage(format!("SQLite DELETE scope: {e}")))?;
            Ok(removed as u64)
        })
        .await
    }
}

/// A row as read from SQLite, before type conversion.
struct RawRow {
    id: String,
    trip_id: Option<String>,
    query: String,
    query_type: String,
    result: String,
    model: Option<String>,
    tokens_used: Option<i64>,
    created_at: i64,
    expires_at: i64,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            trip_id: row.get(1)?,
            query: row.get(2)?,
            query_type: row.get(3)?,
            result: row.get(4)?,
            model: row.get(5)?,
            tokens_used: row.get(6)?,
            created_at: row.get(7)?,
            expires_at: row.get(8)?,
        })
    }

    fn into_entry(self) -> Result<CacheEntry, WayfareError> {
        let result = serde_json::from_str(&self.result)
            .map_err(|e| WayfareError::Serialization(format!("cache row {}: {e}", self.id)))?;
        let tokens_used = self
            .tokens_used
            .map(u32::try_from)
            .transpose()
            .map_err(|e| {
                WayfareError::Storage(format!("cache row {}: tokens_used: {e}", self.id))
            })?;

        Ok(CacheEntry {
            query_type: self.query_type.parse()?,
            created_at: DateTime::from_timestamp_nanos(self.created_at),
            expires_at: DateTime::from_timestamp_nanos(self.expires_at),
            id: self.id,
            scope: self.trip_id,
            query: self.query,
            result,
            model: self.model,
            tokens_used,
        })
    }
}

fn to_nanos(instant: DateTime<Utc>, id: &str) -> Result<i64, WayfareError> {
    instant.timestamp_nanos_opt().ok_or_else(|| {
        WayfareError::Validation(format!(
            "cache entry {id}: timestamp {instant} outside the storable range"
        ))
    })
}

/// Query-side instant. Saturates outside the i64 nanosecond range, which
/// orders it correctly against every storable row.
fn now_nanos(now: DateTime<Utc>) -> i64 {
    now.timestamp_nanos_opt().unwrap_or(if now.timestamp() < 0 {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn validate_table_name(table: &str) -> Result<(), WayfareError> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(WayfareError::Config(format!("invalid table name: '{table}'")))
    }
}
