//! Outbound mail.
//!
//! The workflow builds a [`Mail`] and hands it to a [`Mailer`]; delivery and
//! retries belong to the mailer.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Templates the engine can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MailTemplate {
    /// Tells a requester their secret request has been answered.
    SecretRequestCompleted,
}

impl MailTemplate {
    /// Default subject line for the template.
    #[must_use]
    pub const fn subject(self) -> &'static str {
        match self {
            Self::SecretRequestCompleted => "Secret Request Completed",
        }
    }
}

impl fmt::Display for MailTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SecretRequestCompleted => write!(f, "secretRequestCompleted"),
        }
    }
}

/// A templated message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mail {
    /// Which template to render.
    pub template: MailTemplate,
    /// Subject line.
    pub subject: String,
    /// Recipient addresses.
    pub recipients: Vec<String>,
    /// Template variables.
    pub substitutions: BTreeMap<String, String>,
}

impl Mail {
    /// Creates a message using the template's default subject.
    #[must_use]
    pub fn new(template: MailTemplate) -> Self {
        Self {
            template,
            subject: template.subject().to_string(),
            recipients: Vec::new(),
            substitutions: BTreeMap::new(),
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.recipients.push(recipient.into());
        self
    }

    /// Sets a template variable.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.substitutions.insert(key.into(), value.into());
        self
    }
}

/// Delivers templated mail.
pub trait Mailer: Send + Sync {
    /// Accepts a message for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotificationError`] if the message is rejected.
    fn send_mail(&self, mail: &Mail) -> Result<()>;
}
