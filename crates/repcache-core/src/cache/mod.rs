//! In-memory entity caching.
//!
//! This module provides the `EntityCache` for holding server-fetched
//! entities for the lifetime of a session. Entries never expire on their own:
//! freshness is decided by the cache key, which embeds the revision counters
//! the entity depends on.
//!
//! One cache exists per entity family:
//! - Active routine
//! - Routine by id
//! - Aggregated statistics bundle

pub mod entity;
pub mod entry;

pub use entity::EntityCache;
pub use entry::CacheEntry;
