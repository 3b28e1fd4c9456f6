//! Core types for the secret sharing engine.
//!
//! This module defines the data model shared by every component:
//! - [`RecordId`]: Internal primary key of a sharing record
//! - [`Actor`]: The authenticated caller of an operation
//! - [`SharingRecord`]: A Share or Request record as held by the store
//! - [`RecordMetadata`]: The caller-visible projection of a record
//! - [`SecretValue`]: Decrypted plaintext that zeroizes on drop

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};
use crate::identifier::ShareIdentifier;

/// Internal identifier of a sharing record.
///
/// Assigned by the store at creation and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a new random record identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Creates a new user identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An organization identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgId(String);

impl OrgId {
    /// Creates a new organization identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the caller authenticated, as reported by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthMethod(String);

impl AuthMethod {
    /// Creates a new auth method label.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self(method.into())
    }

    /// Returns the label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What kind of principal is calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// A human user.
    User,
    /// A machine identity.
    Identity,
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Identity => write!(f, "identity"),
        }
    }
}

/// An authenticated caller.
///
/// `org_id` is the organization context of the current session, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// What kind of principal this is.
    pub kind: ActorKind,
    /// The principal's identifier.
    pub user_id: UserId,
    /// How the principal authenticated.
    pub auth_method: AuthMethod,
    /// The organization context of the session.
    pub org_id: Option<OrgId>,
}

impl Actor {
    /// Creates an actor without an organization context.
    #[must_use]
    pub const fn new(kind: ActorKind, user_id: UserId, auth_method: AuthMethod) -> Self {
        Self {
            kind,
            user_id,
            auth_method,
            org_id: None,
        }
    }

    /// Creates a user actor without an organization context.
    #[must_use]
    pub const fn user(user_id: UserId, auth_method: AuthMethod) -> Self {
        Self::new(ActorKind::User, user_id, auth_method)
    }

    /// Creates a machine-identity actor without an organization context.
    #[must_use]
    pub const fn identity(identity_id: UserId, auth_method: AuthMethod) -> Self {
        Self::new(ActorKind::Identity, identity_id, auth_method)
    }

    /// Sets the organization context.
    #[must_use]
    pub fn in_org(mut self, org_id: OrgId) -> Self {
        self.org_id = Some(org_id);
        self
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.user_id)
    }
}

/// The flow a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharingKind {
    /// The holder created the secret; a recipient fetches it.
    Share,
    /// The holder asked for a secret; a responder supplies it once.
    Request,
}

impl fmt::Display for SharingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Share => write!(f, "share"),
            Self::Request => write!(f, "request"),
        }
    }
}

/// Who may open a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Anyone holding the link.
    Public,
    /// Members of the owning organization only.
    Organization,
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Organization => write!(f, "organization"),
        }
    }
}

/// Decrypted secret plaintext that securely zeroizes memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretValue {
    value: String,
}

impl SecretValue {
    /// Wraps a plaintext string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Builds a value from decrypted bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid UTF-8.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        String::from_utf8(bytes)
            .map(|value| Self { value })
            .map_err(|e| {
                let mut bytes = e.into_bytes();
                bytes.zeroize();
                Error::EncryptionError {
                    reason: "decrypted secret is not valid UTF-8".to_string(),
                }
            })
    }

    /// Returns the plaintext.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Returns the plaintext bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_bytes()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("len", &self.value.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl PartialEq for SecretValue {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.value.as_bytes().ct_eq(other.value.as_bytes()).into()
    }
}

impl Eq for SecretValue {}

/// A Share or Request record as persisted by the store.
#[derive(Clone)]
pub struct SharingRecord {
    /// Internal primary key.
    pub id: RecordId,
    /// Which flow the record belongs to.
    pub kind: SharingKind,
    /// Optional display name.
    pub name: Option<String>,
    /// External identifier; present on Share records only.
    pub identifier: Option<ShareIdentifier>,
    /// Legacy secondary lookup key for reads by internal id.
    pub hashed_hex: Option<String>,
    /// Ciphertext produced by the root key cipher.
    pub encrypted_secret: Option<Vec<u8>>,
    /// PHC-format password hash, if the record is password protected.
    pub password_hash: Option<String>,
    /// Absolute expiry time.
    pub expires_at: DateTime<Utc>,
    /// Remaining views; `None` means unlimited until time expiry.
    pub expires_after_views: Option<u32>,
    /// Who may open the record.
    pub access_type: AccessType,
    /// The owning user.
    pub owner_user_id: Option<UserId>,
    /// The owning organization.
    pub owner_org_id: Option<OrgId>,
    /// When content was last revealed.
    pub last_viewed_at: Option<DateTime<Utc>>,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl SharingRecord {
    /// Returns true if a password gates this record.
    #[must_use]
    pub fn is_password_protected(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Returns true if a ciphertext has been stored.
    #[must_use]
    pub fn has_secret(&self) -> bool {
        self.encrypted_secret.is_some()
    }

    /// Returns true if the record's lifetime ended before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Projects the record into its caller-visible metadata.
    #[must_use]
    pub fn metadata(&self) -> RecordMetadata {
        RecordMetadata {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            expires_at: self.expires_at,
            expires_after_views: self.expires_after_views,
            access_type: self.access_type,
            owner_user_id: self.owner_user_id.clone(),
            owner_org_id: self.owner_org_id.clone(),
            is_password_protected: self.is_password_protected(),
            last_viewed_at: self.last_viewed_at,
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for SharingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharingRecord")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("identifier", &self.identifier)
            .field("encrypted_secret", &self.encrypted_secret.as_ref().map(|_| "[REDACTED]"))
            .field("password_hash", &self.password_hash.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .field("expires_after_views", &self.expires_after_views)
            .field("access_type", &self.access_type)
            .field("owner_user_id", &self.owner_user_id)
            .field("owner_org_id", &self.owner_org_id)
            .field("last_viewed_at", &self.last_viewed_at)
            .field("is_deleted", &self.is_deleted)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// The fields a caller supplies when creating a record.
///
/// The store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewSharingRecord {
    /// Which flow the record belongs to.
    pub kind: SharingKind,
    /// Optional display name.
    pub name: Option<String>,
    /// External identifier for Share records.
    pub identifier: Option<ShareIdentifier>,
    /// Legacy secondary lookup key.
    pub hashed_hex: Option<String>,
    /// Ciphertext, if known at creation.
    pub encrypted_secret: Option<Vec<u8>>,
    /// Password hash, if protected.
    pub password_hash: Option<String>,
    /// Absolute expiry time.
    pub expires_at: DateTime<Utc>,
    /// View budget.
    pub expires_after_views: Option<u32>,
    /// Who may open the record.
    pub access_type: AccessType,
    /// The owning user.
    pub owner_user_id: Option<UserId>,
    /// The owning organization.
    pub owner_org_id: Option<OrgId>,
}

/// Caller-visible view of a record; never carries ciphertext or hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    /// Internal identifier.
    pub id: RecordId,
    /// Which flow the record belongs to.
    pub kind: SharingKind,
    /// Optional display name.
    pub name: Option<String>,
    /// Absolute expiry time.
    pub expires_at: DateTime<Utc>,
    /// Remaining views at the time of the snapshot.
    pub expires_after_views: Option<u32>,
    /// Who may open the record.
    pub access_type: AccessType,
    /// The owning user.
    pub owner_user_id: Option<UserId>,
    /// The owning organization.
    pub owner_org_id: Option<OrgId>,
    /// Whether a password gates the record.
    pub is_password_protected: bool,
    /// When content was last revealed.
    pub last_viewed_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Offset/limit pagination for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Number of records to skip.
    pub offset: usize,
    /// Maximum number of records to return.
    pub limit: usize,
}

impl Pagination {
    /// Default page size.
    pub const DEFAULT_LIMIT: usize = 25;

    /// Creates a pagination window.
    #[must_use]
    pub const fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_LIMIT)
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// The records on this page.
    pub items: Vec<T>,
    /// Total number of matching records.
    pub total_count: usize,
}
