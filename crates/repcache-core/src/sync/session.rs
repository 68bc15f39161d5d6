use tracing::info;

use super::{FetchCoordinator, ResolveOptions};
use crate::api::{ApiClient, ApiError};
use crate::error::SyncError;
use crate::models::{Routine, StatisticsBundle, StatsRange, WorkoutLog};
use crate::revision::{RevisionStore, ROUTINE_EDITS, WORKOUT_COMPLETIONS};

/// Logical id of the user's active routine.
pub const ACTIVE_ROUTINE_ID: &str = "routine:active";

/// Routine progress moves on completions, structure on edits.
const ROUTINE_REVISIONS: &[&str] = &[ROUTINE_EDITS, WORKOUT_COMPLETIONS];

const STATISTICS_REVISIONS: &[&str] = &[WORKOUT_COMPLETIONS];

pub type SessionResult<T> = Result<T, SyncError<ApiError>>;

/// Per-login owner of the revision counters and entity caches.
///
/// Screens read through `active_routine`, `routine` and `statistics`; the
/// mutation methods write through the API and bump the matching revision
/// only once the server has accepted the write.
pub struct SyncSession {
    api: ApiClient,
    revisions: RevisionStore,
    active_routine: FetchCoordinator<Option<Routine>, ApiError>,
    routines: FetchCoordinator<Routine, ApiError>,
    statistics: FetchCoordinator<StatisticsBundle, ApiError>,
}

impl SyncSession {
    pub fn new(api: ApiClient) -> Self {
        let revisions = RevisionStore::new();
        Self {
            api,
            active_routine: FetchCoordinator::new("active_routine", revisions.clone()),
            routines: FetchCoordinator::new("routine", revisions.clone()),
            statistics: FetchCoordinator::new("statistics", revisions.clone()),
            revisions,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Counters for mutation sites outside this session's own write methods.
    pub fn revisions(&self) -> &RevisionStore {
        &self.revisions
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn active_routine(&self, options: ResolveOptions) -> SessionResult<Option<Routine>> {
        let api = self.api.clone();
        self.active_routine
            .resolve(
                ACTIVE_ROUTINE_ID,
                ROUTINE_REVISIONS,
                move || async move { api.fetch_active_routine().await },
                options,
            )
            .await
    }

    pub async fn routine(&self, routine_id: i64, options: ResolveOptions) -> SessionResult<Routine> {
        let api = self.api.clone();
        self.routines
            .resolve(
                &routine_logical_id(routine_id),
                ROUTINE_REVISIONS,
                move || async move { api.fetch_routine(routine_id).await },
                options,
            )
            .await
    }

    pub async fn statistics(
        &self,
        range: StatsRange,
        options: ResolveOptions,
    ) -> SessionResult<StatisticsBundle> {
        let api = self.api.clone();
        self.statistics
            .resolve(
                &statistics_logical_id(range),
                STATISTICS_REVISIONS,
                move || async move { api.fetch_statistics(range).await },
                options,
            )
            .await
    }

    /// "Last updated" label for the active routine, if it is cached at the current revision.
    pub fn active_routine_age(&self) -> Option<String> {
        self.active_routine
            .cached(ACTIVE_ROUTINE_ID, ROUTINE_REVISIONS)
            .ok()
            .flatten()
            .map(|entry| entry.age_display())
    }

    pub fn statistics_age(&self, range: StatsRange) -> Option<String> {
        self.statistics
            .cached(&statistics_logical_id(range), STATISTICS_REVISIONS)
            .ok()
            .flatten()
            .map(|entry| entry.age_display())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub async fn complete_workout_day(
        &self,
        routine_id: i64,
        day_id: i64,
        log: &WorkoutLog,
    ) -> Result<(), ApiError> {
        self.api.complete_workout_day(routine_id, day_id, log).await?;
        let revision = self.revisions.bump(WORKOUT_COMPLETIONS);
        info!(routine_id, day_id, revision, "Workout day completed");
        Ok(())
    }

    pub async fn activate_routine(&self, routine_id: i64) -> Result<(), ApiError> {
        self.api.activate_routine(routine_id).await?;
        let revision = self.revisions.bump(ROUTINE_EDITS);
        info!(routine_id, revision, "Routine activated");
        Ok(())
    }

    pub async fn update_routine(&self, routine: &Routine) -> Result<Routine, ApiError> {
        let updated = self.api.update_routine(routine).await?;
        let revision = self.revisions.bump(ROUTINE_EDITS);
        info!(routine_id = routine.id, revision, "Routine updated");
        Ok(updated)
    }

    /// Forget everything this session has cached and zero its counters (logout).
    ///
    /// Subscribers of every counter that moved are told it is 0 again, once
    /// the caches are already empty.
    pub fn reset(&self) {
        // Counters first: a fetch keyed before this point is then rejected by
        // the cache generation check instead of landing under a reusable key
        self.revisions.reset(|| {
            self.active_routine.invalidate_all();
            self.routines.invalidate_all();
            self.statistics.invalidate_all();
        });
        info!("Sync session reset");
    }
}

fn routine_logical_id(routine_id: i64) -> String {
    format!("routine:{}", routine_id)
}

fn statistics_logical_id(range: StatsRange) -> String {
    format!("statistics:{}", range.as_str())
}

// ============================================================================
// Tests
// ============================================================================
