//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for the sharing engine and request workflow.
///
/// Passed explicitly at construction; nothing in the crate reads
/// process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharingConfig {
    /// Public base URL of the web application, used to build links in mail.
    pub site_url: String,
    /// Maximum plaintext size in bytes (inclusive).
    pub max_secret_len: usize,
    /// Shortest allowed lifetime of a record.
    pub min_lifetime: Duration,
    /// Longest allowed lifetime of a record.
    pub max_lifetime: Duration,
}

impl SharingConfig {
    /// Default plaintext cap.
    pub const DEFAULT_MAX_SECRET_LEN: usize = 10_000;

    /// Default minimum lifetime (5 minutes).
    pub const DEFAULT_MIN_LIFETIME: Duration = Duration::from_secs(5 * 60);

    /// Default maximum lifetime (30 days).
    pub const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(30 * 24 * 60 * 60);

    /// Creates a configuration with the given site URL and default limits.
    #[must_use]
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            ..Self::default()
        }
    }

    /// Sets the plaintext size cap.
    #[must_use]
    pub const fn with_max_secret_len(mut self, len: usize) -> Self {
        self.max_secret_len = len;
        self
    }

    /// Sets the lifetime window.
    #[must_use]
    pub const fn with_lifetime_window(mut self, min: Duration, max: Duration) -> Self {
        self.min_lifetime = min;
        self.max_lifetime = max;
        self
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the site URL is empty, the size cap is zero, or the
    /// lifetime window is empty.
    pub fn validate(&self) -> Result<()> {
        if self.site_url.trim().is_empty() {
            return Err(Error::bad_request("site_url cannot be empty"));
        }
        if self.max_secret_len == 0 {
            return Err(Error::bad_request("max_secret_len must be positive"));
        }
        if self.min_lifetime >= self.max_lifetime {
            return Err(Error::bad_request(
                "min_lifetime must be shorter than max_lifetime",
            ));
        }
        Ok(())
    }

    /// Link to the requester's request inbox.
    #[must_use]
    pub fn request_inbox_url(&self) -> String {
        format!(
            "{}/organization/secret-sharing?selectedTab=request-secret",
            self.site_url.trim_end_matches('/')
        )
    }
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost:8080".to_string(),
            max_secret_len: Self::DEFAULT_MAX_SECRET_LEN,
            min_lifetime: Self::DEFAULT_MIN_LIFETIME,
            max_lifetime: Self::DEFAULT_MAX_LIFETIME,
        }
    }
}
