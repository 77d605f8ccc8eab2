use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ENTRIES: usize = 1000;
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Bounds for one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_entries: usize,
    pub ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }
}

impl CacheSettings {
    pub const fn new(max_entries: usize, ttl_seconds: u64) -> Self {
        Self {
            max_entries,
            ttl_seconds,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// `[cache]` section of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub modules: CacheSettings,
    pub class_metadata: CacheSettings,
    pub decompiler: CacheSettings,
}
