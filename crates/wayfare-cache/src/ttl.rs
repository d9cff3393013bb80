use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wayfare_core::{QueryType, WayfareError};

const HOUR: u64 = 60 * 60;

/// Default time-to-live per query type.
///
/// Plan comparisons depend on mutable plan state and go stale fastest;
/// cost tips follow current costs; the rest change slowly.
pub const DEFAULT_TTLS: &[(QueryType, Duration)] = &[
    (QueryType::Research, Duration::from_secs(24 * HOUR)),
    (QueryType::Comparison, Duration::from_secs(HOUR)),
    (QueryType::Optimization, Duration::from_secs(6 * HOUR)),
    (QueryType::PlanChange, Duration::from_secs(24 * HOUR)),
    (QueryType::Suggestions, Duration::from_secs(24 * HOUR)),
];

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = HOUR;

// DEFAULT_TTLS has a row for every query type.
fn default_ttl(query_type: QueryType) -> Duration {
    DEFAULT_TTLS
        .iter()
        .find(|(qt, _)| *qt == query_type)
        .map_or(Duration::ZERO, |(_, ttl)| *ttl)
}

/// Per-query-type TTL table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    ttls: HashMap<QueryType, Duration>,
}

impl TtlPolicy {
    /// Build a policy from the default table plus validated per-type overrides.
    pub fn from_config(config: &CacheConfig) -> Result<Self, WayfareError> {
        let mut policy = Self::default();
        for (query_type, secs) in &config.ttl_overrides_secs {
            policy = policy.with_ttl(*query_type, Duration::from_secs(*secs))?;
        }
        Ok(policy)
    }

    /// Override the TTL of a single query type.
    pub fn with_ttl(mut self, query_type: QueryType, ttl: Duration) -> Result<Self, WayfareError> {
        if ttl.is_zero() {
            return Err(WayfareError::Config(format!(
                "ttl for '{query_type}' must be greater than zero"
            )));
        }
        self.ttls.insert(query_type, ttl);
        Ok(self)
    }

    /// Time-to-live applied when storing an entry of `query_type`.
    pub fn ttl(&self, query_type: QueryType) -> Duration {
        match self.ttls.get(&query_type) {
            Some(ttl) => *ttl,
            None => default_ttl(query_type),
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            ttls: DEFAULT_TTLS.iter().copied().collect(),
        }
    }
}

/// Cache configuration, loadable from any serde format.
///
/// Every field is optional when deserializing; missing fields take the
/// defaults from [`DEFAULT_TTLS`] and an hourly sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL overrides in seconds, keyed by query type name.
    pub ttl_overrides_secs: HashMap<QueryType, u64>,
    /// Seconds between background cleanup sweeps.
    pub sweep_interval_secs: u64,
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override one query type's TTL, in whole seconds.
    pub fn with_ttl_secs(mut self, query_type: QueryType, secs: u64) -> Self {
        self.ttl_overrides_secs.insert(query_type, secs);
        self
    }

    pub fn with_sweep_interval_secs(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = secs;
        self
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Check the whole configuration and return the TTL policy it describes.
    pub fn validate(&self) -> Result<TtlPolicy, WayfareError> {
        if self.sweep_interval_secs == 0 {
            return Err(WayfareError::Config(
                "sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        TtlPolicy::from_config(self)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_overrides_secs: HashMap::new(),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}
