//! Error types for firewatch-core

use thiserror::Error;

use crate::config::ConfigError;
use crate::incident::{IncidentId, IncidentState, Tier};

/// Result type alias for firewatch operations
pub type Result<T> = std::result::Result<T, FirewatchError>;

/// Main error type for firewatch operations
#[derive(Error, Debug)]
pub enum FirewatchError {
    /// Incident lifecycle errors
    #[error("Incident error: {0}")]
    Incident(#[from] IncidentError),

    /// Notification gateway errors
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Incident task was aborted or panicked
    #[error("Incident task aborted: {0}")]
    Aborted(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Errors that end an incident's lifecycle
#[derive(Error, Debug)]
pub enum IncidentError {
    /// Incident was created with an empty recipient set
    #[error("Incident {0} has no recipients")]
    NoRecipients(IncidentId),

    /// The initial alert could not be sent
    #[error("Incident {id}: initial dispatch failed: {source}")]
    DispatchFailed {
        id: IncidentId,
        #[source]
        source: GatewayError,
    },

    /// Invalid state transition
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: IncidentState,
        to: IncidentState,
    },

    /// Tier raise that skips, reverses, or repeats an escalation
    #[error("Invalid tier raise from {from} to {to}")]
    InvalidTierRaise { from: Tier, to: Tier },

    /// A trigger arrived inside the cooldown window
    #[error("Trigger rejected, cooling down for another {remaining_secs}s")]
    CoolingDown { remaining_secs: u64 },
}

/// Errors reported by a notification gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Identity could not be resolved to an addressable recipient
    #[error("Recipient not found: {0}")]
    NotFound(String),

    /// Alert could not be sent
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Media upload failed
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Urgency tier could not be raised
    #[error("Escalation failed: {0}")]
    EscalationFailed(String),

    /// Transport or platform hiccup; the call may succeed if repeated
    #[error("Transient error: {0}")]
    Transient(String),

    /// Credentials rejected or token unavailable
    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl GatewayError {
    /// Whether the error is worth retrying on the next poll interval
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
