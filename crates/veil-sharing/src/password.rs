//! Optional password gate on Share records.
//!
//! Passwords are stored as Argon2id PHC strings. The verify path returns a
//! three-way outcome so the engine can tell "no password needed" apart from
//! "password needed but not supplied" without treating the latter as an error.

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::rngs::OsRng;

use crate::error::{Error, Result};

/// Argon2id memory cost in KiB.
pub const MEMORY_COST_KIB: u32 = 19_456;

/// Argon2id iteration count.
pub const TIME_COST: u32 = 2;

/// Argon2id lane count.
pub const PARALLELISM: u32 = 1;

/// Result of presenting (or not presenting) a password to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordChallenge {
    /// The record carries no password.
    Open,
    /// The record is protected and no password was supplied.
    Withheld,
    /// The supplied password matched.
    Verified,
}

impl PasswordChallenge {
    /// Returns true if content may be revealed.
    #[must_use]
    pub const fn grants_access(self) -> bool {
        matches!(self, Self::Open | Self::Verified)
    }
}

/// Hashes and verifies share passwords.
#[derive(Clone)]
pub struct PasswordGate {
    hasher: Argon2<'static>,
}

impl PasswordGate {
    /// Creates a gate with the default Argon2id cost parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are rejected.
    pub fn new() -> Result<Self> {
        Self::with_params(MEMORY_COST_KIB, TIME_COST, PARALLELISM)
    }

    /// Creates a gate with explicit Argon2id cost parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are rejected.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None).map_err(|e| {
            Error::PasswordHashError {
                reason: format!("invalid argon2 parameters: {e}"),
            }
        })?;
        Ok(Self {
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hashes a password for storage.
    ///
    /// Absent and empty passwords both mean "no password".
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails.
    pub fn hash_password(&self, password: Option<&str>) -> Result<Option<String>> {
        let Some(password) = password.filter(|p| !p.is_empty()) else {
            return Ok(None);
        };

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::PasswordHashError {
                reason: format!("hashing failed: {e}"),
            })?;
        Ok(Some(hash.to_string()))
    }

    /// Checks a supplied password against a stored hash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] on mismatch, or
    /// [`Error::PasswordHashError`] if the stored hash cannot be parsed.
    pub fn challenge(
        &self,
        password_hash: Option<&str>,
        supplied: Option<&str>,
    ) -> Result<PasswordChallenge> {
        let Some(stored) = password_hash else {
            return Ok(PasswordChallenge::Open);
        };
        let Some(supplied) = supplied.filter(|p| !p.is_empty()) else {
            return Ok(PasswordChallenge::Withheld);
        };

        let parsed = PasswordHash::new(stored).map_err(|e| Error::PasswordHashError {
            reason: format!("stored hash is malformed: {e}"),
        })?;

        match self.hasher.verify_password(supplied.as_bytes(), &parsed) {
            Ok(()) => Ok(PasswordChallenge::Verified),
            Err(argon2::password_hash::Error::Password) => {
                Err(Error::unauthorized("Invalid credentials"))
            }
            Err(e) => Err(Error::PasswordHashError {
                reason: format!("verification failed: {e}"),
            }),
        }
    }
}

impl std::fmt::Debug for PasswordGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordGate").finish_non_exhaustive()
    }
}
