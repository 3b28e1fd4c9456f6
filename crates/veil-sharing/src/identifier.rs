//! Share identifiers and lookup-key decoding.
//!
//! A Share record is addressed by 32 random bytes. The store keys it by the
//! hex form of those bytes; links carry the unpadded base64url form. Callers
//! may also hand in an internal UUID, so [`LookupKey::parse`] classifies the
//! input before any lookup happens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::RecordId;

/// Size of a share identifier in bytes.
pub const IDENTIFIER_SIZE: usize = 32;

/// The 32 random bytes identifying a Share record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareIdentifier([u8; IDENTIFIER_SIZE]);

impl ShareIdentifier {
    /// Generates a new identifier from the operating system's CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; IDENTIFIER_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Creates an identifier from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; IDENTIFIER_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parses the hex storage form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not 64 hex characters.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str).map_err(|_| Error::not_found("shared secret"))?;
        Self::from_slice(&bytes)
    }

    /// Parses the base64url link form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input does not decode to exactly 32 bytes.
    pub fn from_token(token: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim_end_matches('='))
            .map_err(|_| Error::not_found("shared secret"))?;
        Self::from_slice(&bytes)
    }

    fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; IDENTIFIER_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::not_found("shared secret"))?;
        Ok(Self(array))
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; IDENTIFIER_SIZE] {
        &self.0
    }

    /// Returns the hex storage key.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the unpadded base64url token embedded in share links.
    #[must_use]
    pub fn to_token(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }
}

impl fmt::Debug for ShareIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The full value is a bearer credential.
        let hex = self.to_hex();
        write!(f, "ShareIdentifier({}..)", &hex[..8])
    }
}

impl TryFrom<String> for ShareIdentifier {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<ShareIdentifier> for String {
    fn from(id: ShareIdentifier) -> Self {
        id.to_hex()
    }
}

/// Re-encodes a hex storage key as the external link token.
///
/// # Errors
///
/// Returns an error if `raw_hex` is not a 32-byte hex string.
pub fn encode_external(raw_hex: &str) -> Result<String> {
    ShareIdentifier::from_hex(raw_hex).map(|id| id.to_token())
}

/// How a record is to be located in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey {
    /// The caller addressed the record by its internal id.
    ByInternalId(RecordId),
    /// The caller presented an external share token.
    ByToken(ShareIdentifier),
}

impl LookupKey {
    /// Classifies caller input as an internal UUIDv4 or an external token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the input is neither.
    pub fn parse(input: &str) -> Result<Self> {
        if let Ok(uuid) = Uuid::parse_str(input) {
            if uuid.get_version_num() == 4 {
                return Ok(Self::ByInternalId(RecordId::from_uuid(uuid)));
            }
        }
        ShareIdentifier::from_token(input).map(Self::ByToken)
    }
}
