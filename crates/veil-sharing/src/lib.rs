//! # Veil Sharing
//!
//! An ephemeral secret-sharing engine that provides:
//!
//! - **Shares**: a holder encrypts a secret and hands out an unguessable link
//!   that stops working after a deadline or a number of views
//! - **Requests**: a requester asks for a secret, a responder supplies it
//!   exactly once, and the requester reveals it later
//! - **Password gating**: optional Argon2id-protected passwords on shares
//! - **Organization scoping**: records restricted to members of one organization
//!
//! Expiry is enforced lazily when a record is accessed. Storage, permissions,
//! key management, directories and mail are injected collaborators (see
//! [`SharingContext`]); [`MemoryRepository`] and [`LocalRootKey`] are
//! self-contained implementations of the store and the cipher.
//!
//! ## Example
//!
//! ```rust
//! use veil_sharing::{LookupKey, ShareIdentifier};
//!
//! // Links carry the base64url form of 32 random bytes.
//! let identifier = ShareIdentifier::generate();
//! let token = identifier.to_token();
//!
//! let key = LookupKey::parse(&token).expect("valid token");
//! assert_eq!(key, LookupKey::ByToken(identifier));
//! ```
//!
//! ## Security Considerations
//!
//! - Plaintext only leaves the crate as [`SecretValue`], which zeroizes on drop
//! - Records, keys and secrets redact ciphertext, hashes and plaintext in `Debug`
//! - View consumption and one-time value writes are single atomic store operations

pub mod access;
pub mod config;
pub mod context;
pub mod directory;
pub mod encryption;
pub mod error;
pub mod expiry;
pub mod identifier;
pub mod lifecycle;
pub mod notify;
pub mod password;
pub mod request;
pub mod share;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{Error, ErrorKind, Result};
pub use types::{
    AccessType, Actor, ActorKind, AuthMethod, OrgId, Page, Pagination, RecordId, RecordMetadata,
    SecretValue, SharingKind, SharingRecord, UserId,
};

pub use config::SharingConfig;
pub use context::SharingContext;

pub use identifier::{encode_external, LookupKey, ShareIdentifier};

pub use encryption::{EncryptionBoundary, LocalRootKey, RootKeyCipher};

pub use password::{PasswordChallenge, PasswordGate};

pub use access::{AccessGate, OrgPermission, PermissionService};

pub use lifecycle::{ViewLifecycle, ViewState};

pub use store::{MemoryRepository, SharingRepository};

pub use directory::{OrgDirectory, Organization, User, UserDirectory};

pub use notify::{Mail, MailTemplate, Mailer};

pub use share::{CreateShare, CreatedShare, ReadShare, RevealedShare, SecretSharingEngine, SharedSecretView};

pub use request::{CreateRequest, RequestDescription, RevealedRequest, SecretRequestWorkflow};
