//! Shared fakes for the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use veil_sharing::{
    Actor, AuthMethod, Error, LocalRootKey, Mail, Mailer, MemoryRepository, OrgDirectory, OrgId,
    OrgPermission, Organization, PasswordGate, PermissionService, Result, SecretRequestWorkflow,
    SecretSharingEngine, SharingConfig, SharingContext, User, UserDirectory, UserId,
};

/// Grants membership to a fixed set of `(user, org)` pairs.
#[derive(Default)]
pub struct StaticPermissions(HashSet<(String, String)>);

impl StaticPermissions {
    pub fn with_member(mut self, user: &str, org: &str) -> Self {
        self.0.insert((user.to_string(), org.to_string()));
        self
    }
}

impl PermissionService for StaticPermissions {
    fn org_permission(&self, actor: &Actor, target_org: &OrgId) -> Result<Option<OrgPermission>> {
        let key = (actor.user_id.as_str().to_string(), target_org.as_str().to_string());
        Ok(self
            .0
            .contains(&key)
            .then(|| OrgPermission::new(target_org.clone(), "member")))
    }
}

/// Every organization is "Acme"; every user's username is `<id>@example.com`.
pub struct StaticDirectory;

impl OrgDirectory for StaticDirectory {
    fn find_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>> {
        Ok(Some(Organization {
            id: id.clone(),
            name: "Acme".to_string(),
        }))
    }
}

impl UserDirectory for StaticDirectory {
    fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
        Ok(Some(User {
            id: id.clone(),
            username: format!("{id}@example.com"),
        }))
    }
}

/// Keeps every mail it is given.
#[derive(Default)]
pub struct RecordingMailer(Mutex<Vec<Mail>>);

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Mail> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Mailer for RecordingMailer {
    fn send_mail(&self, mail: &Mail) -> Result<()> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(mail.clone());
        Ok(())
    }
}

/// Rejects every mail.
pub struct FailingMailer;

impl Mailer for FailingMailer {
    fn send_mail(&self, _: &Mail) -> Result<()> {
        Err(Error::NotificationError {
            reason: "smtp unavailable".to_string(),
        })
    }
}

/// Announces each delivery, then holds it until released or until a
/// five-second deadline passes.
pub struct GatedMailer {
    started: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl GatedMailer {
    /// Returns the mailer, a receiver signalled when a delivery starts, and
    /// a sender that lets the delivery finish.
    pub fn new() -> (Self, Receiver<()>, Sender<()>) {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let mailer = Self {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        };
        (mailer, started_rx, release_tx)
    }
}

impl Mailer for GatedMailer {
    fn send_mail(&self, _: &Mail) -> Result<()> {
        let _ = self
            .started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(());
        let _ = self
            .release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv_timeout(Duration::from_secs(5));
        Ok(())
    }
}

pub struct Fixture {
    pub engine: SecretSharingEngine,
    pub workflow: SecretRequestWorkflow,
    pub repo: Arc<MemoryRepository>,
    pub mailer: Arc<RecordingMailer>,
}

/// Alice and Bob are members of acme; Mallory is a member of nothing.
pub fn permissions() -> StaticPermissions {
    StaticPermissions::default()
        .with_member("alice", "acme")
        .with_member("bob", "acme")
}

pub fn context(repo: Arc<MemoryRepository>, mailer: Arc<dyn Mailer>) -> SharingContext {
    SharingContext {
        repository: repo,
        permissions: Arc::new(permissions()),
        cipher: Arc::new(LocalRootKey::generate()),
        orgs: Arc::new(StaticDirectory),
        users: Arc::new(StaticDirectory),
        mailer,
    }
}

pub fn config() -> SharingConfig {
    SharingConfig::new("https://vault.example.com")
}

pub fn engine(context: SharingContext) -> SecretSharingEngine {
    SecretSharingEngine::new(context, &config())
        .expect("engine")
        .with_password_gate(PasswordGate::with_params(8, 1, 1).expect("params"))
}

pub fn fixture() -> Fixture {
    let repo = Arc::new(MemoryRepository::new());
    let mailer = Arc::new(RecordingMailer::default());
    let context = context(repo.clone(), mailer.clone());

    Fixture {
        engine: engine(context.clone()),
        workflow: SecretRequestWorkflow::new(context, &config()).expect("workflow"),
        repo,
        mailer,
    }
}

pub fn member(user: &str) -> Actor {
    Actor::user(UserId::new(user), AuthMethod::new("email")).in_org(OrgId::new("acme"))
}
