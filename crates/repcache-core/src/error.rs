use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced by [`FetchCoordinator`](crate::sync::FetchCoordinator).
///
/// Cloning is cheap: every waiter coalesced onto one fetch receives a clone
/// of the same outcome, and `Fetch` shares the original error through an `Arc`.
#[derive(Error, Debug)]
pub enum SyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error("Invalid fetch key: {0}")]
    InvalidKey(String),

    #[error("Fetch failed: {0}")]
    Fetch(#[source] Arc<E>),

    #[error("Fetch task aborted: {0}")]
    Aborted(String),

    /// `resolve` needs a fetch but was called outside a tokio runtime.
    #[error("No async runtime to run the fetch on: {0}")]
    NoRuntime(String),
}

impl<E> SyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// The error returned by the fetch function, if that is what failed.
    pub fn fetch_error(&self) -> Option<&E> {
        match self {
            SyncError::Fetch(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl<E> Clone for SyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        match self {
            SyncError::InvalidKey(msg) => SyncError::InvalidKey(msg.clone()),
            SyncError::Fetch(e) => SyncError::Fetch(Arc::clone(e)),
            SyncError::Aborted(msg) => SyncError::Aborted(msg.clone()),
            SyncError::NoRuntime(msg) => SyncError::NoRuntime(msg.clone()),
        }
    }
}
