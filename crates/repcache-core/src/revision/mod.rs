//! Revision counters for mutation domains.
//!
//! This module provides the `RevisionStore`, a process-wide bank of
//! monotonically increasing counters. Mutation sites bump a counter after a
//! successful write; cache keys embed the counters they depend on, so a bump
//! is all it takes to invalidate every dependent cached entity.
//!
//! Well-known domains:
//! - `WORKOUT_COMPLETIONS`: a workout day was completed
//! - `ROUTINE_EDITS`: a routine was edited or activated

pub mod store;

pub use store::{RevisionStore, Subscription, ROUTINE_EDITS, WORKOUT_COMPLETIONS};
