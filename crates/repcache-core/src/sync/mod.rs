//! Fetch coordination between screens, the entity caches and the API.
//!
//! - `FetchKey`: logical id plus the revision values it depends on
//! - `FetchCoordinator`: cache-first resolve with per-key request coalescing
//! - `SyncSession`: one coordinator per entity family, scoped to a login
//!
//! Staleness is defined purely by key inequality. A mutation bumps a
//! revision counter, which changes every dependent key, which turns the next
//! resolve into a cache miss. Nothing here looks at wall-clock age.

pub mod coordinator;
pub mod key;
pub mod session;

pub use coordinator::{FetchCoordinator, ResolveOptions};
pub use key::FetchKey;
pub use session::{SessionResult, SyncSession, ACTIVE_ROUTINE_ID};
