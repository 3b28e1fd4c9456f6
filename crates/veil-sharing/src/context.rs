//! Collaborator wiring.

use std::sync::Arc;

use crate::access::PermissionService;
use crate::directory::{OrgDirectory, UserDirectory};
use crate::encryption::RootKeyCipher;
use crate::notify::Mailer;
use crate::store::SharingRepository;

/// The external collaborators the engine and workflow are built from.
///
/// Cloning is cheap; every field is shared.
#[derive(Clone)]
pub struct SharingContext {
    /// Record store.
    pub repository: Arc<dyn SharingRepository>,
    /// Organization permission service.
    pub permissions: Arc<dyn PermissionService>,
    /// Root-key encrypt/decrypt capability.
    pub cipher: Arc<dyn RootKeyCipher>,
    /// Organization lookup.
    pub orgs: Arc<dyn OrgDirectory>,
    /// User lookup.
    pub users: Arc<dyn UserDirectory>,
    /// Outbound mail.
    pub mailer: Arc<dyn Mailer>,
}

impl std::fmt::Debug for SharingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharingContext").finish_non_exhaustive()
    }
}
