//! Notification gateway contract
//!
//! The escalation core never talks to a chat platform directly. Everything it
//! needs (directory lookup, media upload, sending, raising urgency, and
//! checking for replies) goes through [`NotificationGateway`]. Addressing is
//! polymorphic over [`Target`] so group and per-person delivery share one
//! implementation.

mod ack;
mod types;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::GatewayError;
use crate::incident::Tier;

pub use ack::{is_acknowledgment, ACK_TOKENS};
pub use types::{
    Alert, ConversationContext, DispatchHandle, ImageKey, RecipientId, SentMessage, Target,
};

/// A chat/notification platform the escalation core drives
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Map a stable identity (phone number) to an addressable recipient.
    ///
    /// Returns [`GatewayError::NotFound`] when the platform has no match.
    async fn resolve_recipient(&self, identity: &str) -> Result<RecipientId, GatewayError>;

    /// Upload an image so it can be embedded in an alert
    async fn upload_image(&self, path: &Path) -> Result<ImageKey, GatewayError>;

    /// Send an alert at `alert.tier`.
    ///
    /// Any error is a definitive send failure for the incident.
    async fn send_alert(&self, target: &Target, alert: &Alert)
        -> Result<DispatchHandle, GatewayError>;

    /// Raise urgency of an already sent alert for the given recipients
    async fn raise_urgency(
        &self,
        handle: &DispatchHandle,
        recipients: &[RecipientId],
        tier: Tier,
    ) -> Result<(), GatewayError>;

    /// Whether any human replied with an acknowledgment token since `since`.
    ///
    /// `Ok(false)` is a clean "no"; transport problems come back as
    /// [`GatewayError::Transient`].
    async fn has_acknowledgment(
        &self,
        conversation: &ConversationContext,
        since: DateTime<Utc>,
    ) -> Result<bool, GatewayError>;
}
