//! The Share flow: create, read, delete and list shared secrets.

use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::access::AccessGate;
use crate::config::SharingConfig;
use crate::context::SharingContext;
use crate::encryption::EncryptionBoundary;
use crate::error::{Error, Result};
use crate::expiry::ExpiryPolicy;
use crate::identifier::{LookupKey, ShareIdentifier};
use crate::lifecycle::ViewLifecycle;
use crate::password::{PasswordChallenge, PasswordGate};
use crate::store::OwnedRecordsQuery;
use crate::types::{
    AccessType, Actor, NewSharingRecord, OrgId, Page, Pagination, RecordId, RecordMetadata,
    SecretValue, SharingKind, SharingRecord,
};

/// Input for [`SecretSharingEngine::create_share`].
#[derive(Debug, Clone)]
pub struct CreateShare {
    /// The plaintext to share.
    pub secret_value: SecretValue,
    /// Optional display name.
    pub name: Option<String>,
    /// Absolute expiry time.
    pub expires_at: DateTime<Utc>,
    /// View budget; `None` means unlimited until time expiry.
    pub expires_after_views: Option<u32>,
    /// Optional access password.
    pub password: Option<SecretValue>,
    /// Who may open the share.
    pub access_type: AccessType,
}

impl CreateShare {
    /// Creates a public, unlimited-view share request.
    #[must_use]
    pub fn new(secret_value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret_value: SecretValue::new(secret_value),
            name: None,
            expires_at,
            expires_after_views: None,
            password: None,
            access_type: AccessType::Public,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Limits the number of reads.
    #[must_use]
    pub const fn with_view_limit(mut self, views: u32) -> Self {
        self.expires_after_views = Some(views);
        self
    }

    /// Protects the share with a password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretValue::new(password));
        self
    }

    /// Sets the access type.
    #[must_use]
    pub const fn with_access(mut self, access_type: AccessType) -> Self {
        self.access_type = access_type;
        self
    }
}

/// The result of creating a share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedShare {
    /// Internal id of the new record.
    pub id: RecordId,
    /// Unpadded base64url token for the share link.
    pub token: String,
}

/// Input for [`SecretSharingEngine::read_share`].
#[derive(Debug, Clone)]
pub struct ReadShare {
    /// An external token or an internal id.
    pub locator: String,
    /// Legacy secondary key, required for reads by internal id.
    pub hashed_hex: Option<String>,
    /// The password, if the share is protected.
    pub password: Option<SecretValue>,
    /// The reader's organization context.
    pub caller_org_id: Option<OrgId>,
}

impl ReadShare {
    /// Creates an anonymous read of `locator`.
    #[must_use]
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            hashed_hex: None,
            password: None,
            caller_org_id: None,
        }
    }

    /// Supplies the share password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretValue::new(password));
        self
    }

    /// Supplies the legacy secondary key.
    #[must_use]
    pub fn with_hashed_hex(mut self, hashed_hex: impl Into<String>) -> Self {
        self.hashed_hex = Some(hashed_hex.into());
        self
    }

    /// Reads from within an organization.
    #[must_use]
    pub fn in_org(mut self, org_id: OrgId) -> Self {
        self.caller_org_id = Some(org_id);
        self
    }
}

/// What a reader gets back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedSecretView {
    /// Whether a password gates the share.
    pub is_password_protected: bool,
    /// Content; `None` when a password is required but was not supplied.
    pub secret: Option<RevealedShare>,
}

/// Released share content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealedShare {
    /// The record after this read was counted.
    pub metadata: RecordMetadata,
    /// The decrypted plaintext, if the record carries one.
    pub secret_value: Option<SecretValue>,
    /// The owning organization's name, for readers inside that organization.
    pub org_name: Option<String>,
}

/// Orchestrates the Share flow.
pub struct SecretSharingEngine {
    context: SharingContext,
    expiry: ExpiryPolicy,
    encryption: EncryptionBoundary,
    passwords: PasswordGate,
    access: AccessGate,
    lifecycle: ViewLifecycle,
}

impl SecretSharingEngine {
    /// Builds an engine from its collaborators and configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(context: SharingContext, config: &SharingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            expiry: ExpiryPolicy::from_config(config),
            encryption: EncryptionBoundary::new(context.cipher.clone(), config.max_secret_len),
            passwords: PasswordGate::new()?,
            access: AccessGate::new(context.permissions.clone()),
            lifecycle: ViewLifecycle::new(context.repository.clone()),
            context,
        })
    }

    /// Replaces the password gate, e.g. to tune Argon2 costs.
    #[must_use]
    pub fn with_password_gate(mut self, passwords: PasswordGate) -> Self {
        self.passwords = passwords;
        self
    }

    /// Creates a share and returns its link token.
    ///
    /// With an `owner`, the share belongs to the owner's session organization
    /// and the owner must be a member of it. Without one, the share is
    /// anonymous and must be Public.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] if the owner is not a member of their
    /// organization and [`Error::BadRequest`] for an invalid expiry, view
    /// limit, access type or oversize value.
    pub fn create_share(&self, input: CreateShare, owner: Option<&Actor>) -> Result<CreatedShare> {
        let owner_org_id = match owner {
            Some(owner) => {
                let Some(org_id) = owner.org_id.as_ref() else {
                    return Err(Error::forbidden("Organization context required"));
                };
                self.access.require_membership(owner, org_id)?;
                Some(org_id.clone())
            }
            None => None,
        };

        if input.access_type == AccessType::Organization && owner_org_id.is_none() {
            return Err(Error::bad_request(
                "Organization access requires an owning organization",
            ));
        }

        self.expiry.validate(input.expires_at)?;

        if input.expires_after_views == Some(0) {
            return Err(Error::bad_request("View limit must be at least 1"));
        }

        let encrypted_secret = self.encryption.seal(&input.secret_value)?;
        let password_hash = self
            .passwords
            .hash_password(input.password.as_ref().map(SecretValue::expose))?;
        let identifier = ShareIdentifier::generate();

        let record = self.context.repository.create(NewSharingRecord {
            kind: SharingKind::Share,
            name: input.name,
            identifier: Some(identifier),
            hashed_hex: None,
            encrypted_secret: Some(encrypted_secret),
            password_hash,
            expires_at: input.expires_at,
            expires_after_views: input.expires_after_views,
            access_type: input.access_type,
            owner_user_id: owner.map(|o| o.user_id.clone()),
            owner_org_id,
        })?;

        info!(
            record_id = %record.id,
            access_type = %record.access_type,
            views = ?record.expires_after_views,
            password_protected = record.is_password_protected(),
            anonymous = owner.is_none(),
            "share created"
        );

        Ok(CreatedShare {
            id: record.id,
            token: identifier.to_token(),
        })
    }

    /// Reads a share, consuming one view if content is released.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown locator,
    /// [`Error::Unauthorized`] for a missing org context or wrong password,
    /// and [`Error::Forbidden`] for an expired share or foreign organization.
    pub fn read_share(&self, input: &ReadShare) -> Result<SharedSecretView> {
        let now = Utc::now();
        let key = LookupKey::parse(&input.locator)?;
        let record = self.find_share(&key)?;

        if matches!(key, LookupKey::ByInternalId(_))
            && !secondary_key_matches(&record, input.hashed_hex.as_deref())
        {
            return Err(Error::not_found("shared secret"));
        }

        self.access
            .check_read_scope(&record, input.caller_org_id.as_ref())?;
        self.lifecycle.enforce(&record, now)?;

        let challenge = self.passwords.challenge(
            record.password_hash.as_deref(),
            input.password.as_ref().map(SecretValue::expose),
        )?;
        if challenge == PasswordChallenge::Withheld {
            debug!(record_id = %record.id, "password required, content withheld");
            return Ok(SharedSecretView {
                is_password_protected: true,
                secret: None,
            });
        }

        let secret_value = record
            .encrypted_secret
            .as_deref()
            .map(|ciphertext| self.encryption.open(ciphertext))
            .transpose()?;
        let org_name = self.org_name_for(&record, input.caller_org_id.as_ref())?;

        // Taking the view must be the last fallible step.
        let remaining_views = self.lifecycle.record_view(record.id, now)?;
        debug!(record_id = %record.id, views_remaining = ?remaining_views, "share viewed");

        let mut metadata = record.metadata();
        metadata.expires_after_views = remaining_views;
        metadata.last_viewed_at = Some(now);

        Ok(SharedSecretView {
            is_password_protected: record.is_password_protected(),
            secret: Some(RevealedShare {
                metadata,
                secret_value,
                org_name,
            }),
        })
    }

    /// Deletes a share owned by `caller` and returns its last state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown locator and
    /// [`Error::Forbidden`] if the caller does not own the share.
    pub fn delete_share(&self, locator: &str, caller: &Actor) -> Result<RecordMetadata> {
        let record = self.find_share(&LookupKey::parse(locator)?)?;
        self.access.require_owner(&record, caller)?;

        let deleted = self
            .context
            .repository
            .delete(record.id)?
            .ok_or_else(|| Error::not_found("shared secret"))?;

        info!(record_id = %deleted.id, actor = %caller, "share deleted");
        Ok(deleted.metadata())
    }

    /// Lists the caller's records in their session organization.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] if the caller has no org context or is
    /// not a member of it.
    pub fn list_shares(
        &self,
        caller: &Actor,
        kind: Option<SharingKind>,
        pagination: Pagination,
    ) -> Result<Page<RecordMetadata>> {
        let Some(org_id) = caller.org_id.as_ref() else {
            return Err(Error::forbidden("Organization context required"));
        };
        self.access.require_membership(caller, org_id)?;

        let query = OwnedRecordsQuery {
            owner: caller.user_id.clone(),
            org: org_id.clone(),
            kind,
        };
        let page = self.context.repository.list_owned(&query, pagination)?;
        Ok(Page {
            items: page.items.iter().map(SharingRecord::metadata).collect(),
            total_count: page.total_count,
        })
    }

    fn find_share(&self, key: &LookupKey) -> Result<SharingRecord> {
        self.context
            .repository
            .find(SharingKind::Share, key)?
            .ok_or_else(|| Error::not_found("shared secret"))
    }

    fn org_name_for(&self, record: &SharingRecord, caller_org: Option<&OrgId>) -> Result<Option<String>> {
        if record.access_type != AccessType::Organization {
            return Ok(None);
        }
        match (record.owner_org_id.as_ref(), caller_org) {
            (Some(record_org), Some(caller_org)) if record_org == caller_org => Ok(self
                .context
                .orgs
                .find_org_by_id(record_org)?
                .map(|org| org.name)),
            _ => Ok(None),
        }
    }
}

impl std::fmt::Debug for SecretSharingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretSharingEngine")
            .field("expiry", &self.expiry)
            .field("encryption", &self.encryption)
            .finish_non_exhaustive()
    }
}

/// Both keys must be present and equal.
fn secondary_key_matches(record: &SharingRecord, supplied: Option<&str>) -> bool {
    match (record.hashed_hex.as_deref(), supplied) {
        (Some(stored), Some(supplied)) => stored.as_bytes().ct_eq(supplied.as_bytes()).into(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{OrgPermission, PermissionService};
    use crate::directory::{OrgDirectory, Organization, User, UserDirectory};
    use crate::encryption::LocalRootKey;
    use crate::notify::{Mail, Mailer};
    use crate::store::{MemoryRepository, SharingRepository};
    use crate::types::{AuthMethod, UserId};
    use chrono::Duration;
    use std::sync::Arc;
    use test_case::test_case;

    struct Everyone;

    impl PermissionService for Everyone {
        fn org_permission(&self, _: &Actor, org: &OrgId) -> Result<Option<OrgPermission>> {
            Ok(Some(OrgPermission::new(org.clone(), "member")))
        }
    }

    struct Nobody;

    impl PermissionService for Nobody {
        fn org_permission(&self, _: &Actor, _: &OrgId) -> Result<Option<OrgPermission>> {
            Ok(None)
        }
    }

    struct Directory;

    impl OrgDirectory for Directory {
        fn find_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>> {
            Ok(Some(Organization {
                id: id.clone(),
                name: "Acme".to_string(),
            }))
        }
    }

    impl UserDirectory for Directory {
        fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
            Ok(Some(User {
                id: id.clone(),
                username: format!("{id}@example.com"),
            }))
        }
    }

    struct UnreachableDirectory;

    impl OrgDirectory for UnreachableDirectory {
        fn find_org_by_id(&self, _: &OrgId) -> Result<Option<Organization>> {
            Err(Error::UpstreamError {
                service: "org directory",
                reason: "connection refused".to_string(),
            })
        }
    }

    struct NullMailer;

    impl Mailer for NullMailer {
        fn send_mail(&self, _: &Mail) -> Result<()> {
            Ok(())
        }
    }

    fn engine_with(permissions: Arc<dyn PermissionService>) -> (SecretSharingEngine, Arc<MemoryRepository>) {
        engine_with_orgs(permissions, Arc::new(Directory))
    }

    fn engine_with_orgs(
        permissions: Arc<dyn PermissionService>,
        orgs: Arc<dyn OrgDirectory>,
    ) -> (SecretSharingEngine, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        let context = SharingContext {
            repository: repo.clone(),
            permissions,
            cipher: Arc::new(LocalRootKey::generate()),
            orgs,
            users: Arc::new(Directory),
            mailer: Arc::new(NullMailer),
        };
        let engine = SecretSharingEngine::new(context, &SharingConfig::default())
            .expect("engine")
            .with_password_gate(PasswordGate::with_params(8, 1, 1).expect("params"));
        (engine, repo)
    }

    fn engine() -> (SecretSharingEngine, Arc<MemoryRepository>) {
        engine_with(Arc::new(Everyone))
    }

    fn alice() -> Actor {
        Actor::user(UserId::new("alice"), AuthMethod::new("email")).in_org(OrgId::new("acme"))
    }

    fn in_an_hour() -> DateTime<Utc> {
        Utc::now() + Duration::hours(1)
    }

    fn revealed(view: SharedSecretView) -> RevealedShare {
        view.secret.expect("content released")
    }

    #[test]
    fn create_and_read_public_share() {
        let (engine, _) = engine();
        let created = engine
            .create_share(CreateShare::new("hello", in_an_hour()), None)
            .expect("create");

        let view = engine.read_share(&ReadShare::new(&created.token)).expect("read");
        assert!(!view.is_password_protected);
        let secret = revealed(view);
        assert_eq!(secret.secret_value.expect("value").expose(), "hello");
        assert_eq!(secret.metadata.id, created.id);
        assert!(secret.metadata.last_viewed_at.is_some());
        assert_eq!(secret.org_name, None);
    }

    #[test]
    fn token_is_not_the_stored_identifier() {
        let (engine, repo) = engine();
        let created = engine
            .create_share(CreateShare::new("hello", in_an_hour()), None)
            .expect("create");
        let stored = repo.snapshot(created.id).expect("stored");
        let identifier = stored.identifier.expect("identifier");
        assert_eq!(identifier.to_token(), created.token);
        assert_ne!(identifier.to_hex(), created.token);
        assert_ne!(stored.encrypted_secret.as_deref(), Some(b"hello".as_slice()));
    }

    #[test]
    fn create_rejects_zero_views() {
        let (engine, _) = engine();
        let err = engine
            .create_share(CreateShare::new("x", in_an_hour()).with_view_limit(0), None)
            .expect_err("zero views");
        assert!(matches!(err, Error::BadRequest { .. }));
    }

    #[test]
    fn create_rejects_bad_expiry_before_encrypting() {
        let (engine, repo) = engine();
        let err = engine
            .create_share(CreateShare::new("x", Utc::now() - Duration::minutes(1)), None)
            .expect_err("past expiry");
        assert!(matches!(err, Error::BadRequest { .. }));
        assert!(repo.is_empty());
    }

    #[test]
    fn create_rejects_oversize_value() {
        let (engine, repo) = engine();
        let err = engine
            .create_share(CreateShare::new("x".repeat(10_001), in_an_hour()), None)
            .expect_err("oversize");
        assert!(matches!(err, Error::BadRequest { ref reason } if reason == "Shared secret value too long"));
        assert!(repo.is_empty());
    }

    #[test]
    fn anonymous_organization_share_is_rejected() {
        let (engine, _) = engine();
        let err = engine
            .create_share(
                CreateShare::new("x", in_an_hour()).with_access(AccessType::Organization),
                None,
            )
            .expect_err("no org");
        assert!(matches!(err, Error::BadRequest { .. }));
    }

    #[test]
    fn owned_share_requires_membership() {
        let (engine, repo) = engine_with(Arc::new(Nobody));
        let err = engine
            .create_share(CreateShare::new("x", in_an_hour()), Some(&alice()))
            .expect_err("not a member");
        assert!(matches!(err, Error::Forbidden { .. }));
        assert!(repo.is_empty());
    }

    #[test]
    fn owned_share_records_owner_and_org() {
        let (engine, repo) = engine();
        let created = engine
            .create_share(CreateShare::new("x", in_an_hour()).with_name("db"), Some(&alice()))
            .expect("create");
        let stored = repo.snapshot(created.id).expect("stored");
        assert_eq!(stored.owner_user_id, Some(UserId::new("alice")));
        assert_eq!(stored.owner_org_id, Some(OrgId::new("acme")));
        assert_eq!(stored.name.as_deref(), Some("db"));
    }

    #[test]
    fn organization_share_reports_org_name_to_members() {
        let (engine, _) = engine();
        let created = engine
            .create_share(
                CreateShare::new("x", in_an_hour()).with_access(AccessType::Organization),
                Some(&alice()),
            )
            .expect("create");

        let err = engine
            .read_share(&ReadShare::new(&created.token))
            .expect_err("no org context");
        assert!(matches!(err, Error::Unauthorized { .. }));

        let err = engine
            .read_share(&ReadShare::new(&created.token).in_org(OrgId::new("other")))
            .expect_err("foreign org");
        assert!(matches!(err, Error::Forbidden { .. }));

        let secret = revealed(
            engine
                .read_share(&ReadShare::new(&created.token).in_org(OrgId::new("acme")))
                .expect("read"),
        );
        assert_eq!(secret.org_name.as_deref(), Some("Acme"));
    }

    #[test]
    fn read_unknown_token_is_not_found() {
        let (engine, _) = engine();
        let token = ShareIdentifier::generate().to_token();
        assert!(matches!(
            engine.read_share(&ReadShare::new(token)),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn read_by_internal_id_requires_secondary_key() {
        let (engine, repo) = engine();
        let record = repo
            .create(NewSharingRecord {
                kind: SharingKind::Share,
                name: None,
                identifier: None,
                hashed_hex: Some("abc123".to_string()),
                encrypted_secret: None,
                password_hash: None,
                expires_at: in_an_hour(),
                expires_after_views: None,
                access_type: AccessType::Public,
                owner_user_id: None,
                owner_org_id: None,
            })
            .expect("create");
        let locator = record.id.to_string();

        assert!(matches!(
            engine.read_share(&ReadShare::new(&locator)),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            engine.read_share(&ReadShare::new(&locator).with_hashed_hex("abc124")),
            Err(Error::NotFound { .. })
        ));

        let secret = revealed(
            engine
                .read_share(&ReadShare::new(&locator).with_hashed_hex("abc123"))
                .expect("read"),
        );
        assert_eq!(secret.secret_value, None);
    }

    #[test]
    fn correct_password_decrements_exactly_one_view() {
        let (engine, repo) = engine();
        let created = engine
            .create_share(
                CreateShare::new("pw-protected", in_an_hour())
                    .with_password("pw")
                    .with_view_limit(3),
                None,
            )
            .expect("create");

        let secret = revealed(
            engine
                .read_share(&ReadShare::new(&created.token).with_password("pw"))
                .expect("read"),
        );
        assert_eq!(secret.secret_value.expect("value").expose(), "pw-protected");
        assert_eq!(secret.metadata.expires_after_views, Some(2));
        assert!(secret.metadata.is_password_protected);
        assert_eq!(repo.snapshot(created.id).expect("stored").expires_after_views, Some(2));
    }

    #[test]
    fn empty_password_creates_unprotected_share() {
        let (engine, _) = engine();
        let created = engine
            .create_share(CreateShare::new("x", in_an_hour()).with_password(""), None)
            .expect("create");
        let view = engine.read_share(&ReadShare::new(&created.token)).expect("read");
        assert!(!view.is_password_protected);
        assert!(view.secret.is_some());
    }

    #[test]
    fn time_expired_share_is_forbidden_and_soft_deleted() {
        let (engine, repo) = engine();
        let created = engine
            .create_share(CreateShare::new("x", in_an_hour()), None)
            .expect("create");
        // Age the record past its lifetime.
        let mut stored = repo.snapshot(created.id).expect("stored");
        repo.delete(created.id).expect("delete");
        stored.expires_at = Utc::now() - Duration::seconds(1);
        let aged = repo
            .create(NewSharingRecord {
                kind: stored.kind,
                name: stored.name,
                identifier: stored.identifier,
                hashed_hex: None,
                encrypted_secret: stored.encrypted_secret,
                password_hash: None,
                expires_at: stored.expires_at,
                expires_after_views: None,
                access_type: stored.access_type,
                owner_user_id: None,
                owner_org_id: None,
            })
            .expect("recreate");

        let err = engine
            .read_share(&ReadShare::new(&created.token))
            .expect_err("expired");
        assert!(matches!(err, Error::Forbidden { ref reason } if reason.contains("lifetime")));
        assert!(repo.snapshot(aged.id).expect("stored").is_deleted);
        assert!(matches!(
            engine.read_share(&ReadShare::new(&created.token)),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn failed_org_lookup_keeps_the_view() {
        let (engine, repo) = engine_with_orgs(Arc::new(Everyone), Arc::new(UnreachableDirectory));
        let created = engine
            .create_share(
                CreateShare::new("x", in_an_hour())
                    .with_access(AccessType::Organization)
                    .with_view_limit(1),
                Some(&alice()),
            )
            .expect("create");
        let read = ReadShare::new(&created.token).in_org(OrgId::new("acme"));

        for _ in 0..2 {
            let err = engine.read_share(&read).expect_err("directory down");
            assert!(matches!(err, Error::UpstreamError { .. }));
            let stored = repo.snapshot(created.id).expect("stored");
            assert_eq!(stored.expires_after_views, Some(1));
            assert_eq!(stored.last_viewed_at, None);
        }
    }

    /// Stores a password-protected share that expired an hour ago.
    fn stale_protected_share(engine: &SecretSharingEngine, repo: &MemoryRepository) -> (RecordId, String) {
        let identifier = ShareIdentifier::generate();
        let password_hash = engine.passwords.hash_password(Some("pw")).expect("hash");
        let record = repo
            .create(NewSharingRecord {
                kind: SharingKind::Share,
                name: None,
                identifier: Some(identifier),
                hashed_hex: None,
                encrypted_secret: Some(engine.encryption.seal(&SecretValue::new("x")).expect("seal")),
                password_hash,
                expires_at: Utc::now() - Duration::hours(1),
                expires_after_views: Some(3),
                access_type: AccessType::Public,
                owner_user_id: None,
                owner_org_id: None,
            })
            .expect("create");
        (record.id, identifier.to_token())
    }

    #[test_case(None ; "without password")]
    #[test_case(Some("pw") ; "with correct password")]
    #[test_case(Some("nope") ; "with wrong password")]
    fn time_expired_protected_share_is_forbidden_before_password_check(password: Option<&str>) {
        let (engine, repo) = engine();
        let (id, token) = stale_protected_share(&engine, &repo);

        let mut read = ReadShare::new(&token);
        if let Some(password) = password {
            read = read.with_password(password);
        }
        let err = engine.read_share(&read).expect_err("expired");
        assert!(matches!(err, Error::Forbidden { ref reason } if reason.contains("lifetime")));
        let stored = repo.snapshot(id).expect("stored");
        assert!(stored.is_deleted);
        assert_eq!(stored.expires_after_views, Some(3));
    }

    #[test_case(None ; "without password")]
    #[test_case(Some("pw") ; "with correct password")]
    #[test_case(Some("nope") ; "with wrong password")]
    fn view_exhausted_protected_share_is_forbidden_before_password_check(password: Option<&str>) {
        let (engine, repo) = engine();
        let created = engine
            .create_share(
                CreateShare::new("x", in_an_hour())
                    .with_password("pw")
                    .with_view_limit(1),
                None,
            )
            .expect("create");
        engine
            .read_share(&ReadShare::new(&created.token).with_password("pw"))
            .expect("last view");

        let mut read = ReadShare::new(&created.token);
        if let Some(password) = password {
            read = read.with_password(password);
        }
        let err = engine.read_share(&read).expect_err("spent");
        assert!(matches!(err, Error::Forbidden { ref reason } if reason.contains("view count")));
        assert!(repo.snapshot(created.id).expect("stored").is_deleted);
    }

    #[test]
    fn identity_owns_and_deletes_share() {
        let (engine, repo) = engine();
        let bot = Actor::identity(UserId::new("ci-bot"), AuthMethod::new("universal-auth"))
            .in_org(OrgId::new("acme"));
        let created = engine
            .create_share(CreateShare::new("x", in_an_hour()), Some(&bot))
            .expect("create");
        assert_eq!(
            repo.snapshot(created.id).expect("stored").owner_user_id,
            Some(UserId::new("ci-bot"))
        );
        assert!(matches!(
            engine.delete_share(&created.token, &alice()),
            Err(Error::Forbidden { .. })
        ));
        engine.delete_share(&created.token, &bot).expect("delete");
    }

    #[test]
    fn delete_share_by_owner() {
        let (engine, repo) = engine();
        let created = engine
            .create_share(CreateShare::new("x", in_an_hour()), Some(&alice()))
            .expect("create");

        let bob = Actor::user(UserId::new("bob"), AuthMethod::new("email")).in_org(OrgId::new("acme"));
        assert!(matches!(
            engine.delete_share(&created.token, &bob),
            Err(Error::Forbidden { .. })
        ));

        let deleted = engine.delete_share(&created.token, &alice()).expect("delete");
        assert_eq!(deleted.id, created.id);
        assert!(repo.snapshot(created.id).is_none());
        assert!(matches!(
            engine.delete_share(&created.token, &alice()),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn delete_anonymous_share_is_forbidden() {
        let (engine, _) = engine();
        let created = engine
            .create_share(CreateShare::new("x", in_an_hour()), None)
            .expect("create");
        assert!(matches!(
            engine.delete_share(&created.token, &alice()),
            Err(Error::Forbidden { .. })
        ));
    }

    #[test]
    fn delete_by_internal_id() {
        let (engine, _) = engine();
        let created = engine
            .create_share(CreateShare::new("x", in_an_hour()), Some(&alice()))
            .expect("create");
        let deleted = engine
            .delete_share(&created.id.to_string(), &alice())
            .expect("delete");
        assert_eq!(deleted.id, created.id);
    }

    #[test]
    fn list_shares_requires_org_context() {
        let (engine, _) = engine();
        let loner = Actor::user(UserId::new("alice"), AuthMethod::new("email"));
        assert!(matches!(
            engine.list_shares(&loner, None, Pagination::default()),
            Err(Error::Forbidden { .. })
        ));
    }

    #[test]
    fn list_shares_returns_own_records() {
        let (engine, _) = engine();
        for _ in 0..3 {
            engine
                .create_share(CreateShare::new("x", in_an_hour()), Some(&alice()))
                .expect("create");
        }
        engine
            .create_share(CreateShare::new("x", in_an_hour()), None)
            .expect("anonymous");

        let page = engine
            .list_shares(&alice(), Some(SharingKind::Share), Pagination::new(0, 2))
            .expect("list");
        assert_eq!(page.total_count, 3);
        assert_eq!(page.items.len(), 2);
    }
}
