//! REST API client module for the fitness backend.
//!
//! This module provides the `ApiClient` for fetching routines and statistics
//! and for recording workout completions and routine edits.
//!
//! Requests carry a bearer token obtained elsewhere; this crate does not
//! handle login.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
