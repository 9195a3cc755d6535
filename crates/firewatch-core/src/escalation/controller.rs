//! Escalation controller
//!
//! Drives one incident through send → poll → decide → escalate:
//!
//! 1. Fail fast if there is nobody to alert.
//! 2. Upload the snapshot (optional; failure degrades to text-only).
//! 3. Send the first alert at the incident's tier. Failure ends the incident.
//! 4. Poll for an acknowledgment within the budget.
//! 5. Acknowledged: stand down (and optionally tell everyone).
//!    Timed out: raise urgency on the same alert by exactly one tier.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::poller::{ConfirmationPoller, PollOutcome, PollReport};
use crate::config::{EscalationConfig, TargetConfig, TargetMode};
use crate::error::{GatewayError, IncidentError};
use crate::gateway::{Alert, DispatchHandle, NotificationGateway, RecipientId, Target};
use crate::incident::{Incident, IncidentId, IncidentState, Tier};

/// How the controller addresses alerts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressing {
    /// Direct message to every recipient
    Individuals,
    /// One message in a group chat
    Group { chat_id: String },
}

impl Addressing {
    /// Build the delivery target for a recipient set
    pub fn target_for(&self, recipients: &[RecipientId]) -> Target {
        match self {
            Addressing::Individuals => Target::Individuals {
                recipients: recipients.to_vec(),
            },
            Addressing::Group { chat_id } => Target::Group {
                chat_id: chat_id.clone(),
                members: recipients.to_vec(),
            },
        }
    }
}

impl From<&TargetConfig> for Addressing {
    fn from(config: &TargetConfig) -> Self {
        match (config.mode, &config.chat_id) {
            (TargetMode::Group, Some(chat_id)) => Addressing::Group {
                chat_id: chat_id.clone(),
            },
            _ => Addressing::Individuals,
        }
    }
}

/// Timing and stand-down behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationPolicy {
    pub budget: Duration,
    pub interval: Duration,
    pub notify_stand_down: bool,
    pub stand_down_title: String,
    pub stand_down_body: String,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::from(&EscalationConfig::default())
    }
}

impl From<&EscalationConfig> for EscalationPolicy {
    fn from(config: &EscalationConfig) -> Self {
        Self {
            budget: config.budget(),
            interval: config.interval(),
            notify_stand_down: config.notify_stand_down,
            stand_down_title: config.stand_down_title.clone(),
            stand_down_body: config.stand_down_body.clone(),
        }
    }
}

/// Who or what ended the waiting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acknowledgment {
    /// A recipient replied with an acknowledgment token
    Reply,
    /// An operator stood the incident down from outside
    StandDown,
}

/// Final account of an incident that got past dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentReport {
    pub id: IncidentId,
    pub state: IncidentState,
    pub tier: Tier,
    pub checks: u32,
    pub transient_failures: u32,
    pub acknowledgment: Option<Acknowledgment>,
    /// Set when the tier raise was attempted and the gateway refused it
    pub escalation_error: Option<GatewayError>,
}

/// Runs incidents against a gateway
pub struct EscalationController {
    gateway: Arc<dyn NotificationGateway>,
    policy: EscalationPolicy,
    addressing: Addressing,
}

impl EscalationController {
    pub fn new(
        gateway: Arc<dyn NotificationGateway>,
        policy: EscalationPolicy,
        addressing: Addressing,
    ) -> Self {
        Self {
            gateway,
            policy,
            addressing,
        }
    }

    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    pub fn addressing(&self) -> &Addressing {
        &self.addressing
    }

    pub fn gateway(&self) -> &Arc<dyn NotificationGateway> {
        &self.gateway
    }

    /// Run an incident to a terminal state with no external stand-down
    pub async fn run_escalation(
        &self,
        incident: &mut Incident,
    ) -> Result<IncidentReport, IncidentError> {
        self.run_escalation_with_cancel(incident, &CancellationToken::new())
            .await
    }

    /// Run an incident to a terminal state.
    ///
    /// Cancelling `stand_down` while waiting ends the incident as confirmed.
    pub async fn run_escalation_with_cancel(
        &self,
        incident: &mut Incident,
        stand_down: &CancellationToken,
    ) -> Result<IncidentReport, IncidentError> {
        let id = incident.id();

        if incident.recipients().is_empty() {
            error!(incident = %id, "No recipients to alert, aborting");
            incident.transition_to(IncidentState::Failed)?;
            return Err(IncidentError::NoRecipients(id));
        }

        let target = self.addressing.target_for(incident.recipients());
        let handle = match self.dispatch(incident, &target).await {
            Ok(handle) => handle,
            Err(source) => {
                error!(incident = %id, error = %source, "Initial alert could not be sent");
                incident.transition_to(IncidentState::Failed)?;
                return Err(IncidentError::DispatchFailed { id, source });
            }
        };
        incident.set_dispatch_handle(handle.clone());
        incident.transition_to(IncidentState::Dispatched)?;

        incident.transition_to(IncidentState::Waiting)?;
        let poll = self.wait_for_acknowledgment(incident, &handle, stand_down).await;

        match poll.outcome {
            PollOutcome::Confirmed | PollOutcome::StoodDown => {
                let acknowledgment = if poll.outcome == PollOutcome::Confirmed {
                    Acknowledgment::Reply
                } else {
                    Acknowledgment::StandDown
                };
                incident.transition_to(IncidentState::Confirmed)?;
                info!(
                    incident = %id,
                    checks = poll.checks,
                    ?acknowledgment,
                    "Alert acknowledged, standing down"
                );

                if self.policy.notify_stand_down {
                    self.notify_stand_down(id, &target).await;
                }

                Ok(self.report(incident, poll, Some(acknowledgment), None))
            }
            PollOutcome::TimedOut => {
                incident.transition_to(IncidentState::Escalating)?;
                warn!(
                    incident = %id,
                    checks = poll.checks,
                    "No acknowledgment within budget, escalating"
                );

                let escalation_error = self.escalate(incident, &handle).await;
                incident.transition_to(IncidentState::TerminalEscalated)?;

                Ok(self.report(incident, poll, None, escalation_error))
            }
        }
    }

    /// Upload the snapshot if any, then send the first alert
    async fn dispatch(
        &self,
        incident: &Incident,
        target: &Target,
    ) -> Result<DispatchHandle, GatewayError> {
        let id = incident.id();
        let payload = incident.payload();

        let image = match &payload.image {
            Some(path) => match self.gateway.upload_image(path).await {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!(
                        incident = %id,
                        error = %e,
                        "Image upload failed, sending text-only alert"
                    );
                    None
                }
            },
            None => None,
        };

        let alert = Alert {
            title: payload.title.clone(),
            body: payload.description.clone(),
            image,
            tier: incident.tier(),
        };

        info!(
            incident = %id,
            tier = %alert.tier,
            recipients = incident.recipients().len(),
            "Sending alert"
        );
        self.gateway.send_alert(target, &alert).await
    }

    async fn wait_for_acknowledgment(
        &self,
        incident: &Incident,
        handle: &DispatchHandle,
        stand_down: &CancellationToken,
    ) -> PollReport {
        let conversation = handle.conversation();
        if conversation.is_empty() {
            warn!(
                incident = %incident.id(),
                "Alert has no reply conversation, waiting out the budget"
            );
        }

        let poller = ConfirmationPoller::new(self.policy.budget, self.policy.interval);
        info!(
            incident = %incident.id(),
            budget_secs = poller.budget().as_secs(),
            interval_secs = poller.interval().as_secs(),
            "Waiting for acknowledgment"
        );

        let gateway = self.gateway.as_ref();
        let conversation = &conversation;
        let since = incident.created_at();
        poller
            .run(stand_down, move || gateway.has_acknowledgment(conversation, since))
            .await
    }

    /// Raise the alert one tier. Returns the gateway error if the raise failed.
    async fn escalate(
        &self,
        incident: &mut Incident,
        handle: &DispatchHandle,
    ) -> Option<GatewayError> {
        let id = incident.id();
        let Some(next) = incident.tier().next() else {
            warn!(
                incident = %id,
                tier = %incident.tier(),
                "Already at the highest tier, nothing to raise"
            );
            return None;
        };

        info!(incident = %id, from = %incident.tier(), to = %next, "Raising urgency");
        match self
            .gateway
            .raise_urgency(handle, incident.recipients(), next)
            .await
        {
            Ok(()) => {
                if let Err(e) = incident.raise_tier(next) {
                    error!(incident = %id, error = %e, "Tier bookkeeping rejected the raise");
                }
                None
            }
            Err(e) => {
                error!(
                    incident = %id,
                    to = %next,
                    error = %e,
                    "Urgency raise failed, operator attention needed"
                );
                Some(e)
            }
        }
    }

    async fn notify_stand_down(&self, id: IncidentId, target: &Target) {
        let alert = Alert {
            title: self.policy.stand_down_title.clone(),
            body: self.policy.stand_down_body.clone(),
            image: None,
            tier: Tier::Normal,
        };
        if let Err(e) = self.gateway.send_alert(target, &alert).await {
            warn!(incident = %id, error = %e, "Stand-down notice could not be sent");
        }
    }

    fn report(
        &self,
        incident: &Incident,
        poll: PollReport,
        acknowledgment: Option<Acknowledgment>,
        escalation_error: Option<GatewayError>,
    ) -> IncidentReport {
        IncidentReport {
            id: incident.id(),
            state: incident.state(),
            tier: incident.tier(),
            checks: poll.checks,
            transient_failures: poll.failures,
            acknowledgment,
            escalation_error,
        }
    }
}
