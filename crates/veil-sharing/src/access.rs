//! Access control for sharing records.
//!
//! Organization membership is decided by an external [`PermissionService`];
//! this module only turns its answers, together with record ownership, into
//! allow/deny decisions.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{AccessType, Actor, OrgId, SharingRecord};

/// A permission granted to an actor within an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgPermission {
    /// The organization the permission applies to.
    pub org_id: OrgId,
    /// The actor's role in that organization.
    pub role: String,
}

impl OrgPermission {
    /// Creates a permission for `org_id` with the given role.
    #[must_use]
    pub fn new(org_id: OrgId, role: impl Into<String>) -> Self {
        Self {
            org_id,
            role: role.into(),
        }
    }
}

/// The external organization permission collaborator.
pub trait PermissionService: Send + Sync {
    /// Looks up the actor's permission in `target_org`.
    ///
    /// The actor carries its id, auth method and session org. Returns
    /// `Ok(None)` if the actor is not a member.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails.
    fn org_permission(&self, actor: &Actor, target_org: &OrgId) -> Result<Option<OrgPermission>>;
}

/// Turns membership and ownership facts into access decisions.
#[derive(Clone)]
pub struct AccessGate {
    permissions: Arc<dyn PermissionService>,
}

impl AccessGate {
    /// Creates a gate backed by the given permission service.
    #[must_use]
    pub fn new(permissions: Arc<dyn PermissionService>) -> Self {
        Self { permissions }
    }

    /// Requires the actor to be a member of `org_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] if the actor is not a member.
    pub fn require_membership(&self, actor: &Actor, org_id: &OrgId) -> Result<OrgPermission> {
        match self.permissions.org_permission(actor, org_id)? {
            Some(permission) => {
                debug!(actor = %actor, org_id = %org_id, role = %permission.role, "membership granted");
                Ok(permission)
            }
            None => {
                debug!(actor = %actor, org_id = %org_id, "membership denied");
                Err(Error::forbidden("User is not a part of the specified organization"))
            }
        }
    }

    /// Enforces the record's access type for an actor-bearing call.
    ///
    /// Public records pass unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] if an Organization record has no org,
    /// [`Error::Unauthorized`] if the caller has no org context, and
    /// [`Error::Forbidden`] if the caller is not a member of the record's org.
    pub fn require_org_scope(&self, record: &SharingRecord, caller: Option<&Actor>) -> Result<()> {
        if record.access_type == AccessType::Public {
            return Ok(());
        }

        let Some(record_org) = record.owner_org_id.as_ref() else {
            return Err(Error::bad_request("No organization ID present"));
        };
        let Some(caller) = caller.filter(|c| c.org_id.is_some()) else {
            return Err(Error::unauthorized("Organization context required"));
        };

        self.require_membership(caller, record_org).map(|_| ())
    }

    /// Requires the caller to own the record.
    ///
    /// A caller with a session org must be a member of it. The record's
    /// owning user must be the caller, and if the record has an owning org it
    /// must be the caller's session org.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] on any mismatch.
    pub fn require_owner(&self, record: &SharingRecord, caller: &Actor) -> Result<()> {
        if let Some(session_org) = caller.org_id.as_ref() {
            self.require_membership(caller, session_org)?;
        }

        if record.owner_user_id.as_ref() != Some(&caller.user_id) {
            debug!(record_id = %record.id, actor = %caller, "ownership denied");
            return Err(Error::forbidden(format!(
                "User does not have permission to access this {}",
                record.kind
            )));
        }

        if let Some(record_org) = record.owner_org_id.as_ref() {
            if caller.org_id.as_ref() != Some(record_org) {
                debug!(record_id = %record.id, actor = %caller, "owning organization mismatch");
                return Err(Error::forbidden(format!(
                    "User does not have permission to access this {}",
                    record.kind
                )));
            }
        }

        Ok(())
    }

    /// Enforces the access type for a bearer read that carries only an org id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if an Organization record is read
    /// without an org context and [`Error::Forbidden`] if the org differs.
    pub fn check_read_scope(&self, record: &SharingRecord, caller_org: Option<&OrgId>) -> Result<()> {
        if record.access_type == AccessType::Public {
            return Ok(());
        }
        let Some(caller_org) = caller_org else {
            return Err(Error::unauthorized("Organization context required"));
        };
        if record.owner_org_id.as_ref() != Some(caller_org) {
            debug!(record_id = %record.id, caller_org = %caller_org, "organization mismatch on read");
            return Err(Error::forbidden("Secret belongs to another organization"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate").finish_non_exhaustive()
    }
}
