//! API client for the fitness tracking REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests to fetch routines and statistics and to record workouts.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::models::{ActiveRoutineResponse, Routine, StatisticsBundle, StatsRange, WorkoutLog};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the fitness backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    initial_backoff: Duration,
}

impl ApiClient {
    /// Create a new API client for `base_url` (no trailing slash needed)
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let base_url: String = base_url.into();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            token: Some(token),
            ..self.clone()
        }
    }

    /// Override the first 429 backoff delay; it doubles on each retry.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request, retrying with exponential backoff while rate limited.
    /// `build` is called once per attempt.
    async fn execute<F>(&self, url: &str, build: F) -> Result<Response, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let response = build().send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status.as_u16() == 429 {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(url = url, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                tokio::time::sleep(backoff).await;
                backoff *= 2; // Exponential backoff
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
    }

    async fn parse<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self.execute(&url, || self.request(Method::GET, &url)).await?;
        Self::parse(&url, response).await
    }

    // ===== Data Fetching Methods =====

    /// Fetch the user's active routine; `None` when no routine is active.
    pub async fn fetch_active_routine(&self) -> Result<Option<Routine>, ApiError> {
        match self.get::<ActiveRoutineResponse>("/routines/active").await {
            Ok(response) => Ok(response.routine),
            Err(ApiError::NotFound(_)) => {
                debug!("No active routine");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn fetch_routine(&self, routine_id: i64) -> Result<Routine, ApiError> {
        self.get(&format!("/routines/{}", routine_id))
            .await
            .map_err(|e| e.or_missing(ApiError::RoutineNotFound(routine_id)))
    }

    pub async fn fetch_statistics(&self, range: StatsRange) -> Result<StatisticsBundle, ApiError> {
        self.get(&format!("/statistics?range={}", range.as_str())).await
    }

    // ===== Mutations =====

    /// Mark one day of a routine as done.
    pub async fn complete_workout_day(
        &self,
        routine_id: i64,
        day_id: i64,
        log: &WorkoutLog,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/routines/{}/days/{}/complete", routine_id, day_id));
        self.execute(&url, || self.request(Method::POST, &url).json(log))
            .await
            .map_err(|e| e.or_missing(ApiError::DayNotFound { routine_id, day_id }))?;
        Ok(())
    }

    pub async fn activate_routine(&self, routine_id: i64) -> Result<(), ApiError> {
        let url = self.url(&format!("/routines/{}/activate", routine_id));
        self.execute(&url, || self.request(Method::POST, &url))
            .await
            .map_err(|e| e.or_missing(ApiError::RoutineNotFound(routine_id)))?;
        Ok(())
    }

    /// Replace a routine and return the server's copy.
    pub async fn update_routine(&self, routine: &Routine) -> Result<Routine, ApiError> {
        let url = self.url(&format!("/routines/{}", routine.id));
        let response = self
            .execute(&url, || self.request(Method::PUT, &url).json(routine))
            .await
            .map_err(|e| e.or_missing(ApiError::RoutineNotFound(routine.id)))?;
        Self::parse(&url, response).await
    }
}

// ============================================================================
// Tests
// ============================================================================
