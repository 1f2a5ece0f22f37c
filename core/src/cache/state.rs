//! Observable state of cached queries and mutations.
//!
//! Data is held behind `Arc` so that a warm read hands out the very same
//! value the fetch produced, and cloning a state snapshot is cheap.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Pending,
    Success,
    Error,
}

/// Snapshot of one cache entry.
pub struct QueryState<T> {
    pub data: Option<Arc<T>>,
    pub status: QueryStatus,
    pub error: Option<ApiError>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// A fetch for this entry is in flight.
    pub is_fetching: bool,
    /// Invalidated or abandoned since the last successful fetch.
    pub is_stale: bool,
}

impl<T> QueryState<T> {
    pub(crate) fn pending() -> Self {
        Self {
            data: None,
            status: QueryStatus::Pending,
            error: None,
            last_fetched_at: None,
            is_fetching: false,
            is_stale: false,
        }
    }

    /// Nothing to show yet and a fetch is running.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Pending && self.is_fetching
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_deref()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    /// Data is present, successful and not invalidated.
    pub(crate) fn is_fresh(&self) -> bool {
        self.status == QueryStatus::Success && !self.is_stale
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            status: self.status,
            error: self.error.clone(),
            last_fetched_at: self.last_fetched_at,
            is_fetching: self.is_fetching,
            is_stale: self.is_stale,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for QueryState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryState")
            .field("data", &self.data)
            .field("status", &self.status)
            .field("error", &self.error)
            .field("last_fetched_at", &self.last_fetched_at)
            .field("is_fetching", &self.is_fetching)
            .field("is_stale", &self.is_stale)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    Idle,
    Pending,
    Success,
    Error,
}

/// State of the most recent call on a `Mutation`.
pub struct MutationState<T> {
    pub status: MutationStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<ApiError>,
}

impl<T> MutationState<T> {
    pub(crate) fn idle() -> Self {
        Self {
            status: MutationStatus::Idle,
            data: None,
            error: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == MutationStatus::Idle
    }

    pub fn is_pending(&self) -> bool {
        self.status == MutationStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status == MutationStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == MutationStatus::Error
    }
}

impl<T> Clone for MutationState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for MutationState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationState")
            .field("status", &self.status)
            .field("data", &self.data)
            .field("error", &self.error)
            .finish()
    }
}
