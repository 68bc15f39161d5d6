//! Core library for repcache.
//!
//! A client-side synchronization layer for a fitness tracking API. Entities
//! fetched from the server (active routine, routines by id, statistics
//! bundles) are cached per session and served without a network call until a
//! mutation elsewhere in the app bumps a revision counter they depend on.
//! Concurrent requests for the same entity at the same revision share one
//! fetch.
//!
//! - `revision`: mutation-domain counters with change notification
//! - `cache`: in-memory entity caches
//! - `sync`: fetch coordination and the per-login `SyncSession`
//! - `api`: REST client used as the fetch source
//! - `models`: routine and statistics types
//! - `config`: on-disk application configuration

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod revision;
pub mod sync;

pub use error::SyncError;
pub use sync::{FetchCoordinator, ResolveOptions, SyncSession};
