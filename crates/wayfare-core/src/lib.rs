use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// QueryType
// ---------------------------------------------------------------------------

/// The category of AI operation a cached result belongs to.
///
/// Each category carries its own time-to-live policy, so the same query text
/// cached under two different types produces two independent cache lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// General destination research.
    Research,
    /// Side-by-side comparison of plan versions.
    Comparison,
    /// Cost-optimisation tips for the current plan.
    Optimization,
    /// Alternatives for a specific change request.
    PlanChange,
    /// General itinerary and packing suggestions.
    Suggestions,
}

impl QueryType {
    /// Every query type, in declaration order.
    pub const ALL: [QueryType; 5] = [
        QueryType::Research,
        QueryType::Comparison,
        QueryType::Optimization,
        QueryType::PlanChange,
        QueryType::Suggestions,
    ];

    /// The stable wire/storage name of this query type.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Research => "research",
            QueryType::Comparison => "comparison",
            QueryType::Optimization => "optimization",
            QueryType::PlanChange => "plan_change",
            QueryType::Suggestions => "suggestions",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = WayfareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryType::ALL
            .into_iter()
            .find(|qt| qt.as_str() == s)
            .ok_or_else(|| WayfareError::Validation(format!("unknown query type: '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// CacheEntry
// ---------------------------------------------------------------------------

/// A stored AI result.
///
/// `expires_at` is stamped once at write time from the query type's TTL and
/// is never recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: String,
    /// Trip the entry belongs to; `None` is the global partition.
    pub scope: Option<String>,
    /// Trimmed query text.
    pub query: String,
    pub query_type: QueryType,
    /// Opaque payload, never interpreted by the cache.
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// An entry is expired once `now` reaches `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether this entry answers the given lookup key (ignoring expiry).
    pub fn matches(&self, lookup: &CacheLookup) -> bool {
        self.query_type == lookup.query_type
            && self.query == lookup.query
            && self.scope.as_deref() == lookup.scope.as_deref()
    }
}

/// Compute `created_at + ttl`, failing if the sum leaves chrono's range.
pub fn expiry_after(
    created_at: DateTime<Utc>,
    ttl: Duration,
) -> Result<DateTime<Utc>, WayfareError> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| created_at.checked_add_signed(delta))
        .ok_or_else(|| WayfareError::Validation(format!("ttl out of range: {ttl:?}")))
}

// ---------------------------------------------------------------------------
// CacheLookup
// ---------------------------------------------------------------------------

/// The `(scope, query, query_type)` triple identifying a cache line.
///
/// The query is trimmed on construction; matching after that is exact and
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheLookup {
    pub scope: Option<String>,
    pub query: String,
    pub query_type: QueryType,
}

impl CacheLookup {
    pub fn new(scope: Option<&str>, query: &str, query_type: QueryType) -> Self {
        Self {
            scope: scope.map(str::to_string),
            query: query.trim().to_string(),
            query_type,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type for the Wayfare cache crates.
#[derive(Debug, Error)]
pub enum WayfareError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("config error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// CacheBackend
// ---------------------------------------------------------------------------

/// Storage behind the AI result cache.
///
/// Implementations only need row-level atomicity for single inserts and
/// deletes; callers never hold a lock across a lookup and the following
/// insert. A `None` scope must be matched with an explicit "is absent"
/// predicate so the global partition never sees trip-scoped rows.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Return a matching entry whose `expires_at` is strictly after `now`.
    ///
    /// When several rows share the key, the most recently created one wins.
    async fn find_valid(
        &self,
        lookup: &CacheLookup,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, WayfareError>;

    /// Append a new entry. Existing rows with the same key are left alone.
    async fn insert(&self, entry: &CacheEntry) -> Result<(), WayfareError>;

    /// Delete every entry with `expires_at <= now`, returning how many went.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, WayfareError>;

    /// Delete every entry in one scope partition, expired or not.
    async fn delete_scope(&self, scope: Option<&str>) -> Result<u64, WayfareError>;
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the current time for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = instant;
    }

    /// Move forward by `by`. Saturates at chrono's maximum instant.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = expiry_after(*now, by).unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    /// Move backward by `by`.
    pub fn rewind(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(earlier) = TimeDelta::from_std(by)
            .ok()
            .and_then(|delta| now.checked_sub_signed(delta))
        {
            *now = earlier;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
