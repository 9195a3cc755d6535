//! Firewatch Core - tiered alert escalation for physical-safety events
//!
//! This crate provides the core of the firewatch alarm system:
//!
//! - **Incident**: one escalation lifecycle with its state machine
//!   (Initial→Dispatched→Waiting→Confirmed | Escalating→TerminalEscalated, or Failed)
//! - **Gateway**: the [`NotificationGateway`] contract any chat platform implements
//! - **Directory**: phone number → recipient id cache, resolved once at startup
//! - **Escalation**: the controller and its bounded, cancellable confirmation poller
//! - **Dispatch**: concurrent incidents with stand-down and trigger cooldown
//! - **Config**: timing, tiers, wording, delivery target
//!
//! # Escalation
//!
//! ```text
//! send (tier n) → poll every 5s for 180s → acknowledged? → stand down
//!                                        → timed out?    → raise to tier n+1
//! ```
//!
//! Tiers only move forward (NORMAL → URGENT_SMS → URGENT_PHONE), one step per
//! incident at most.

pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod escalation;
pub mod gateway;
pub mod incident;

pub use config::{
    AlertConfig, ConfigError, DirectoryConfig, DispatchConfig, EscalationConfig, FirewatchConfig,
    TargetConfig, TargetMode,
};
pub use directory::{DirectoryEntry, RecipientDirectory, ResolutionFailure};
pub use dispatch::{IncidentDispatcher, IncidentHandle};
pub use error::{FirewatchError, GatewayError, IncidentError, Result};
pub use escalation::{
    Acknowledgment, Addressing, ConfirmationPoller, EscalationController, EscalationPolicy,
    IncidentReport, PollOutcome, PollReport,
};
pub use gateway::{
    is_acknowledgment, Alert, ConversationContext, DispatchHandle, ImageKey, NotificationGateway,
    RecipientId, SentMessage, Target,
};
pub use incident::{AlertPayload, Incident, IncidentId, IncidentState, IncidentStatus, Tier};
