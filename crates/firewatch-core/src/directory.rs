//! Recipient directory
//!
//! Maps stable identities (phone numbers) to gateway recipient ids. Built
//! once at startup by [`RecipientDirectory::resolve_all`] and then shared
//! read-only across incidents.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::gateway::{NotificationGateway, RecipientId};

/// A resolved directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub identity: String,
    pub recipient: RecipientId,
}

/// An identity that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    pub identity: String,
    pub error: GatewayError,
}

/// Cached identity → recipient mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientDirectory {
    entries: Vec<DirectoryEntry>,
}

impl RecipientDirectory {
    /// Create a new empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Returns `false` if the recipient is already present.
    pub fn insert(&mut self, identity: impl Into<String>, recipient: RecipientId) -> bool {
        if self.contains(&recipient) {
            return false;
        }
        self.entries.push(DirectoryEntry {
            identity: identity.into(),
            recipient,
        });
        true
    }

    pub fn contains(&self, recipient: &RecipientId) -> bool {
        self.entries.iter().any(|e| &e.recipient == recipient)
    }

    /// Look up the recipient for an identity
    pub fn get(&self, identity: &str) -> Option<&RecipientId> {
        let identity = normalize_phone(identity);
        self.entries
            .iter()
            .find(|e| e.identity == identity)
            .map(|e| &e.recipient)
    }

    /// All resolved recipients, in insertion order
    pub fn recipients(&self) -> Vec<RecipientId> {
        self.entries.iter().map(|e| e.recipient.clone()).collect()
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve every identity through the gateway.
    ///
    /// A failure for one identity is recorded and the rest still resolve.
    pub async fn resolve_all<I, S>(
        gateway: &dyn NotificationGateway,
        identities: I,
    ) -> (Self, Vec<ResolutionFailure>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut directory = Self::new();
        let mut failures = Vec::new();

        for identity in identities {
            let identity = normalize_phone(identity.as_ref());
            if identity.is_empty() {
                continue;
            }

            match gateway.resolve_recipient(&identity).await {
                Ok(recipient) => {
                    if directory.insert(identity.clone(), recipient.clone()) {
                        info!(identity = %identity, recipient = %recipient, "Recipient resolved");
                    }
                }
                Err(error) => {
                    warn!(identity = %identity, error = %error, "Recipient resolution failed");
                    failures.push(ResolutionFailure { identity, error });
                }
            }
        }

        info!(
            resolved = directory.len(),
            failed = failures.len(),
            "Recipient directory loaded"
        );
        (directory, failures)
    }
}

/// Normalize a phone number to a leading `+` form
pub fn normalize_phone(phone: &str) -> String {
    let phone: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    if phone.is_empty() || phone.starts_with('+') {
        phone
    } else {
        format!("+{}", phone)
    }
}
