//! Organization and user lookups.

use crate::error::Result;
use crate::types::{OrgId, UserId};

/// An organization as seen by the sharing engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    /// Organization id.
    pub id: OrgId,
    /// Display name.
    pub name: String,
}

/// A user as seen by the sharing engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// User id.
    pub id: UserId,
    /// Display name, also the mail address the directory delivers to.
    pub username: String,
}

/// Resolves organizations by id.
pub trait OrgDirectory: Send + Sync {
    /// Finds an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn find_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>>;
}

/// Resolves users by id.
pub trait UserDirectory: Send + Sync {
    /// Finds a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>>;
}
