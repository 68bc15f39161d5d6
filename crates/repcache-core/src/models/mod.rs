//! Data models for fitness entities.
//!
//! This module contains the structures exchanged with the API:
//!
//! - `Routine`, `RoutineDay`, `Exercise`: training plans and their progress
//! - `WorkoutLog`: payload for completing a workout day
//! - `StatisticsBundle`, `StatsRange`: aggregated training statistics

pub mod routine;
pub mod statistics;

pub use routine::{ActiveRoutineResponse, Exercise, Routine, RoutineDay, WorkoutLog};
pub use statistics::{PersonalRecord, StatisticsBundle, StatsRange, WeeklySummary};
