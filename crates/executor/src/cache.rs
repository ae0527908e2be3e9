//! Result cache — keyed memoization of expensive command results.
//!
//! The key is a normalized signature over the command name and the
//! canonically ordered argument set, so two proposals that differ only in
//! argument order share one entry. At most one entry per signature,
//! overwritten only by a fresh execution. Session-private: the mission
//! log, not the cache, is the authority of record.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use overwatch_core::mission::Observation;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Normalized cache key: SHA-256 over name + ordered arg pairs.
pub fn signature(name: &str, args: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    for (k, v) in args {
        hasher.update([0u8]);
        hasher.update(k.as_bytes());
        hasher.update([0u8]);
        hasher.update(v.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// A stored filtered result.
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub observation: Observation,
    pub created_at: DateTime<Utc>,
}

/// In-memory memoization of filtered command output.
///
/// When disabled, every lookup is a miss and nothing is stored.
pub struct ResultCache {
    enabled: bool,
    entries: HashMap<String, CachedResult>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self { enabled: true, entries: HashMap::new() }
    }

    pub fn disabled() -> Self {
        Self { enabled: false, entries: HashMap::new() }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&self, sig: &str) -> Option<&CachedResult> {
        if !self.enabled {
            return None;
        }
        let hit = self.entries.get(sig);
        if hit.is_some() {
            debug!(signature = %sig, "Cache hit");
        }
        hit
    }

    pub fn put(&mut self, sig: String, observation: Observation) {
        if !self.enabled {
            return;
        }
        self.entries.insert(sig, CachedResult { observation, created_at: Utc::now() });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
