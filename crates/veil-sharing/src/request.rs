//! The Request flow.
//!
//! A requester opens a request, a responder supplies the value exactly once,
//! and the requester reveals it as often as they like. Setting the value and
//! notifying the requester commit together.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::access::AccessGate;
use crate::config::SharingConfig;
use crate::context::SharingContext;
use crate::encryption::EncryptionBoundary;
use crate::error::{Error, Result};
use crate::expiry::ExpiryPolicy;
use crate::identifier::LookupKey;
use crate::notify::{Mail, MailTemplate};
use crate::store::SetSecretOutcome;
use crate::types::{
    AccessType, Actor, NewSharingRecord, RecordId, RecordMetadata, SecretValue, SharingKind,
    SharingRecord,
};

/// Input for [`SecretRequestWorkflow::create_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// Optional display name, shown to the responder and in mail.
    pub name: Option<String>,
    /// Absolute expiry time.
    pub expires_at: DateTime<Utc>,
    /// Who may answer the request.
    pub access_type: AccessType,
}

/// A request as seen by a prospective responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescription {
    /// The request's metadata.
    pub metadata: RecordMetadata,
    /// Whether a value has already been supplied.
    pub is_secret_value_set: bool,
}

/// A request together with its decrypted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealedRequest {
    /// The request's metadata.
    pub metadata: RecordMetadata,
    /// The supplied value.
    pub secret_value: SecretValue,
}

/// Orchestrates the Request flow.
pub struct SecretRequestWorkflow {
    context: SharingContext,
    inbox_url: String,
    expiry: ExpiryPolicy,
    encryption: EncryptionBoundary,
    access: AccessGate,
}

impl SecretRequestWorkflow {
    /// Builds a workflow from its collaborators and configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(context: SharingContext, config: &SharingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inbox_url: config.request_inbox_url(),
            expiry: ExpiryPolicy::from_config(config),
            encryption: EncryptionBoundary::new(context.cipher.clone(), config.max_secret_len),
            access: AccessGate::new(context.permissions.clone()),
            context,
        })
    }

    /// Opens a request owned by `owner` in their session organization.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] if the owner has no org context or is not
    /// a member of it, and [`Error::BadRequest`] for an invalid expiry.
    pub fn create_request(&self, input: CreateRequest, owner: &Actor) -> Result<RecordId> {
        let Some(org_id) = owner.org_id.as_ref() else {
            return Err(Error::forbidden("Organization context required"));
        };
        self.access.require_membership(owner, org_id)?;
        self.expiry.validate(input.expires_at)?;

        let record = self.context.repository.create(NewSharingRecord {
            kind: SharingKind::Request,
            name: input.name,
            identifier: None,
            hashed_hex: None,
            encrypted_secret: None,
            password_hash: None,
            expires_at: input.expires_at,
            expires_after_views: None,
            access_type: input.access_type,
            owner_user_id: Some(owner.user_id.clone()),
            owner_org_id: Some(org_id.clone()),
        })?;

        info!(record_id = %record.id, access_type = %record.access_type, "secret request created");
        Ok(record.id)
    }

    /// Supplies the value for a request and notifies the requester.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown request,
    /// [`Error::BadRequest`] if a value is already set or the value is too
    /// long, [`Error::Forbidden`] if the request has expired or the responder
    /// is outside its organization, and [`Error::Unauthorized`] if an
    /// Organization request is answered without an org context. If the mailer
    /// rejects the notification the value is not stored.
    pub fn fulfill(
        &self,
        id: RecordId,
        secret_value: &SecretValue,
        responder: Option<&Actor>,
    ) -> Result<RecordMetadata> {
        let now = Utc::now();
        let record = self.find_request(id)?;

        let respondent_username = if record.access_type == AccessType::Organization {
            self.access.require_org_scope(&record, responder)?;
            let responder = responder.ok_or_else(|| Error::unauthorized("Organization context required"))?;
            let user = self
                .context
                .users
                .find_user_by_id(&responder.user_id)?
                .ok_or_else(|| Error::not_found(format!("user {}", responder.user_id)))?;
            Some(user.username)
        } else {
            None
        };

        if record.has_secret() {
            return Err(Error::bad_request("Secret request already has a value set"));
        }
        self.encryption.check_size(secret_value.expose())?;
        if record.is_expired_at(now) {
            return Err(Error::forbidden("Access denied: Secret request has expired"));
        }

        let ciphertext = self.encryption.seal(secret_value)?;
        let mail = self.completion_mail(&record, respondent_username)?;

        let notify = |_: &SharingRecord| self.context.mailer.send_mail(&mail);
        let outcome = self
            .context
            .repository
            .set_secret_once(record.id, ciphertext, &notify)?;

        match outcome {
            SetSecretOutcome::Set(updated) => {
                info!(record_id = %updated.id, "secret request fulfilled");
                Ok(updated.metadata())
            }
            SetSecretOutcome::AlreadySet => {
                debug!(record_id = %record.id, "lost race to fulfill secret request");
                Err(Error::bad_request("Secret request already has a value set"))
            }
            SetSecretOutcome::Missing => Err(Error::not_found("secret request")),
        }
    }

    /// Describes a request without revealing its value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown request, the org-scope
    /// errors of [`AccessGate::require_org_scope`], and [`Error::Forbidden`]
    /// if the request has expired.
    pub fn describe(&self, id: RecordId, caller: Option<&Actor>) -> Result<RequestDescription> {
        let record = self.find_request(id)?;
        self.access.require_org_scope(&record, caller)?;

        if record.is_expired_at(Utc::now()) {
            return Err(Error::forbidden("Access denied: Secret request has expired"));
        }

        Ok(RequestDescription {
            is_secret_value_set: record.has_secret(),
            metadata: record.metadata(),
        })
    }

    /// Reveals the supplied value to the requester.
    ///
    /// Revealing does not consume or expire the request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown request,
    /// [`Error::Forbidden`] if the caller is not the requester, and
    /// [`Error::BadRequest`] if no value has been supplied yet.
    pub fn reveal(&self, id: RecordId, caller: &Actor) -> Result<RevealedRequest> {
        let record = self.find_request(id)?;
        self.access.require_owner(&record, caller)?;

        let Some(ciphertext) = record.encrypted_secret.as_deref() else {
            return Err(Error::bad_request("Secret request has no value set"));
        };
        let secret_value = self.encryption.open(ciphertext)?;

        debug!(record_id = %record.id, actor = %caller, "secret request revealed");
        Ok(RevealedRequest {
            metadata: record.metadata(),
            secret_value,
        })
    }

    /// Deletes a request owned by `caller` and returns its last state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown request and
    /// [`Error::Forbidden`] if the caller is not the requester.
    pub fn delete_request(&self, id: RecordId, caller: &Actor) -> Result<RecordMetadata> {
        let record = self.find_request(id)?;
        self.access.require_owner(&record, caller)?;

        let deleted = self
            .context
            .repository
            .delete(record.id)?
            .ok_or_else(|| Error::not_found("secret request"))?;

        info!(record_id = %deleted.id, actor = %caller, "secret request deleted");
        Ok(deleted.metadata())
    }

    fn find_request(&self, id: RecordId) -> Result<SharingRecord> {
        self.context
            .repository
            .find(SharingKind::Request, &LookupKey::ByInternalId(id))?
            .ok_or_else(|| Error::not_found("secret request"))
    }

    fn completion_mail(&self, record: &SharingRecord, respondent_username: Option<String>) -> Result<Mail> {
        let requester_id = record
            .owner_user_id
            .as_ref()
            .ok_or_else(|| Error::not_found("requester"))?;
        let requester = self
            .context
            .users
            .find_user_by_id(requester_id)?
            .ok_or_else(|| Error::not_found(format!("user {requester_id}")))?;

        let mail = Mail::new(MailTemplate::SecretRequestCompleted)
            .to(requester.username)
            .with("name", record.name.clone().unwrap_or_default())
            .with("secretRequestUrl", self.inbox_url.clone());

        Ok(match respondent_username {
            Some(username) => mail.with("respondentUsername", username),
            None => mail,
        })
    }
}

impl std::fmt::Debug for SecretRequestWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRequestWorkflow")
            .field("inbox_url", &self.inbox_url)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}
