//! Bounded, time-expiring in-memory caches for resolved modules and the
//! per-class data derived from them.

pub mod bounded;
pub mod config;
pub mod manager;

pub use bounded::{BoundedCache, CacheStatsSnapshot};
pub use config::{CacheConfig, CacheSettings, DEFAULT_MAX_ENTRIES, DEFAULT_TTL_SECONDS};
pub use manager::{CacheManager, ClassMetadataKey};
