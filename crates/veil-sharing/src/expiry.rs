//! Expiry policy for newly written records.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::SharingConfig;
use crate::error::{Error, Result};

/// Validates requested expiry timestamps against the lifetime window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    min_lifetime: Duration,
    max_lifetime: Duration,
}

impl ExpiryPolicy {
    /// Creates a policy with an explicit lifetime window.
    #[must_use]
    pub const fn new(min_lifetime: Duration, max_lifetime: Duration) -> Self {
        Self {
            min_lifetime,
            max_lifetime,
        }
    }

    /// Creates a policy from engine configuration.
    #[must_use]
    pub const fn from_config(config: &SharingConfig) -> Self {
        Self::new(config.min_lifetime, config.max_lifetime)
    }

    /// Validates `expires_at` against the current time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] if the timestamp is outside the window.
    pub fn validate(&self, expires_at: DateTime<Utc>) -> Result<()> {
        self.validate_at(expires_at, Utc::now())
    }

    /// Validates `expires_at` against an explicit `now`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] if the timestamp is in the past, beyond
    /// the maximum lifetime, or closer than the minimum lifetime.
    pub fn validate_at(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
        if expires_at < now {
            return Err(Error::bad_request("Expiration date cannot be in the past"));
        }

        let ahead = (expires_at - now).to_std().unwrap_or_default();

        if ahead > self.max_lifetime {
            return Err(Error::bad_request(format!(
                "Expiration date cannot be more than {} days",
                self.max_lifetime.as_secs() / 86_400
            )));
        }

        if ahead < self.min_lifetime {
            return Err(Error::bad_request(format!(
                "Expiration time cannot be less than {} mins",
                self.min_lifetime.as_secs() / 60
            )));
        }

        Ok(())
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::from_config(&SharingConfig::default())
    }
}
