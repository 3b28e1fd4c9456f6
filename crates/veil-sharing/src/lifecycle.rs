//! Lazy time and view-count expiry.
//!
//! Nothing sweeps expired records. A read evaluates the record, soft-deletes
//! it if it is spent, and only consumes a view once content is about to be
//! released.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::store::{SharingRepository, ViewConsumption};
use crate::types::{RecordId, SharingRecord};

/// Where a record stands at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// Readable.
    Active,
    /// Past `expires_at`.
    ExpiredByTime,
    /// Remaining-view counter is zero.
    ExpiredByViews,
}

impl ViewState {
    /// Classifies a record. Time expiry is checked first.
    #[must_use]
    pub fn of(record: &SharingRecord, now: DateTime<Utc>) -> Self {
        if record.is_expired_at(now) {
            Self::ExpiredByTime
        } else if record.expires_after_views == Some(0) {
            Self::ExpiredByViews
        } else {
            Self::Active
        }
    }

    const fn denial(self) -> Option<&'static str> {
        match self {
            Self::Active => None,
            Self::ExpiredByTime => Some("Access denied: Secret has expired by lifetime"),
            Self::ExpiredByViews => Some("Access denied: Secret has expired by view count"),
        }
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::ExpiredByTime => write!(f, "expired_by_time"),
            Self::ExpiredByViews => write!(f, "expired_by_views"),
        }
    }
}

/// Drives expiry transitions against the record store.
#[derive(Clone)]
pub struct ViewLifecycle {
    repository: Arc<dyn SharingRepository>,
}

impl ViewLifecycle {
    /// Creates a lifecycle bound to a repository.
    #[must_use]
    pub fn new(repository: Arc<dyn SharingRepository>) -> Self {
        Self { repository }
    }

    /// Classifies a record without side effects.
    #[must_use]
    pub fn evaluate(&self, record: &SharingRecord, now: DateTime<Utc>) -> ViewState {
        ViewState::of(record, now)
    }

    /// Denies access to a spent record, soft-deleting it first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] if the record is expired by time or views.
    pub fn enforce(&self, record: &SharingRecord, now: DateTime<Utc>) -> Result<()> {
        match self.evaluate(record, now) {
            ViewState::Active => Ok(()),
            state => Err(self.expire(record.id, state)),
        }
    }

    /// Takes one view after content has been cleared for release.
    ///
    /// Returns the remaining view count, if the record is view-limited.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] if a concurrent reader took the last view
    /// and [`Error::NotFound`] if the record vanished.
    pub fn record_view(&self, id: RecordId, now: DateTime<Utc>) -> Result<Option<u32>> {
        match self.repository.consume_view(id, now)? {
            ViewConsumption::Consumed { remaining_views } => Ok(remaining_views),
            ViewConsumption::Exhausted => Err(self.expire(id, ViewState::ExpiredByViews)),
            ViewConsumption::Missing => Err(Error::not_found("shared secret")),
        }
    }

    fn expire(&self, id: RecordId, state: ViewState) -> Error {
        match self.repository.soft_delete(id) {
            Ok(true) => info!(record_id = %id, %state, "record expired"),
            Ok(false) => {}
            Err(err) => warn!(record_id = %id, %state, error = %err, "failed to soft-delete expired record"),
        }
        Error::forbidden(state.denial().unwrap_or("Access denied"))
    }
}

impl fmt::Debug for ViewLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewLifecycle").finish_non_exhaustive()
    }
}
