//! Incident struct and related types

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use super::{IncidentState, Tier};
use crate::error::IncidentError;
use crate::gateway::{DispatchHandle, RecipientId};

/// Unique identifier for an incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentId(pub Uuid);

impl IncidentId {
    /// Create a new random incident ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an incident ID from a string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for IncidentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IncidentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the humans are told about the event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    /// Short headline, e.g. "Lab fire alarm"
    pub title: String,
    /// Detail text shown under the headline
    pub description: String,
    /// Snapshot of the scene, if the detector produced one
    pub image: Option<PathBuf>,
}

impl AlertPayload {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<PathBuf>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// A recorded state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: IncidentState,
    pub to: IncidentState,
    pub at: DateTime<Utc>,
}

/// Observable snapshot of an incident, published on every change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentStatus {
    pub id: IncidentId,
    pub title: String,
    pub state: IncidentState,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One escalation lifecycle for a single detected event
///
/// Only the owning controller mutates an incident. `created_at`, the payload
/// and the recipient set are fixed at construction.
#[derive(Debug)]
pub struct Incident {
    id: IncidentId,
    created_at: DateTime<Utc>,
    payload: AlertPayload,
    recipients: Vec<RecipientId>,
    tier: Tier,
    state: IncidentState,
    escalations: u32,
    dispatch_handle: Option<DispatchHandle>,
    transitions: Vec<Transition>,
    status_tx: watch::Sender<IncidentStatus>,
}

impl Incident {
    /// Create an incident starting now at the given tier
    pub fn new(payload: AlertPayload, recipients: Vec<RecipientId>, tier: Tier) -> Self {
        Self::with_created_at(payload, recipients, tier, Utc::now())
    }

    /// Create an incident with an explicit window start
    pub fn with_created_at(
        payload: AlertPayload,
        mut recipients: Vec<RecipientId>,
        tier: Tier,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut seen = std::collections::HashSet::new();
        recipients.retain(|r| seen.insert(r.clone()));

        let id = IncidentId::new();
        let (status_tx, _) = watch::channel(IncidentStatus {
            id,
            title: payload.title.clone(),
            state: IncidentState::Initial,
            tier,
            created_at,
            updated_at: created_at,
        });

        Self {
            id,
            created_at,
            payload,
            recipients,
            tier,
            state: IncidentState::Initial,
            escalations: 0,
            dispatch_handle: None,
            transitions: Vec::new(),
            status_tx,
        }
    }

    pub fn id(&self) -> IncidentId {
        self.id
    }

    /// Start of the confirmation window
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn payload(&self) -> &AlertPayload {
        &self.payload
    }

    pub fn recipients(&self) -> &[RecipientId] {
        &self.recipients
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn state(&self) -> IncidentState {
        self.state
    }

    pub fn dispatch_handle(&self) -> Option<&DispatchHandle> {
        self.dispatch_handle.as_ref()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Number of tier raises performed so far (zero or one)
    pub fn escalations(&self) -> u32 {
        self.escalations
    }

    /// Current observable status
    pub fn status(&self) -> IncidentStatus {
        self.status_tx.borrow().clone()
    }

    /// Follow status changes without owning the incident
    pub fn subscribe(&self) -> watch::Receiver<IncidentStatus> {
        self.status_tx.subscribe()
    }

    /// Move to `to`, recording the transition
    pub(crate) fn transition_to(&mut self, to: IncidentState) -> Result<(), IncidentError> {
        if !self.state.can_transition_to(&to) {
            return Err(IncidentError::InvalidStateTransition {
                from: self.state,
                to,
            });
        }

        let at = Utc::now();
        self.transitions.push(Transition {
            from: self.state,
            to,
            at,
        });
        self.state = to;
        self.publish(at);
        Ok(())
    }

    pub(crate) fn set_dispatch_handle(&mut self, handle: DispatchHandle) {
        self.dispatch_handle = Some(handle);
    }

    /// Record a one-step tier raise. Refuses to skip, reverse, or raise twice.
    pub(crate) fn raise_tier(&mut self, to: Tier) -> Result<(), IncidentError> {
        if self.escalations > 0 || self.tier.next() != Some(to) {
            return Err(IncidentError::InvalidTierRaise {
                from: self.tier,
                to,
            });
        }
        self.tier = to;
        self.escalations += 1;
        self.publish(Utc::now());
        Ok(())
    }

    fn publish(&self, at: DateTime<Utc>) {
        self.status_tx.send_modify(|status| {
            status.state = self.state;
            status.tier = self.tier;
            status.updated_at = at;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(tier: Tier) -> Incident {
        Incident::new(
            AlertPayload::new("Lab fire alarm", "Open flame detected"),
            vec![RecipientId::new("ou_1")],
            tier,
        )
    }

    #[test]
    fn test_duplicate_recipients_are_dropped() {
        let incident = Incident::new(
            AlertPayload::new("t", "d"),
            vec![
                RecipientId::new("ou_1"),
                RecipientId::new("ou_2"),
                RecipientId::new("ou_1"),
            ],
            Tier::Normal,
        );
        assert_eq!(incident.recipients().len(), 2);
    }

    #[test]
    fn test_transition_is_recorded_and_published() {
        let mut incident = incident(Tier::Normal);
        let rx = incident.subscribe();

        incident.transition_to(IncidentState::Dispatched).unwrap();

        assert_eq!(incident.state(), IncidentState::Dispatched);
        assert_eq!(incident.transitions().len(), 1);
        assert_eq!(incident.transitions()[0].from, IncidentState::Initial);
        assert_eq!(rx.borrow().state, IncidentState::Dispatched);
    }

    #[test]
    fn test_invalid_transition_is_rejected() {
        let mut incident = incident(Tier::Normal);
        let err = incident.transition_to(IncidentState::Confirmed).unwrap_err();
        assert!(matches!(err, IncidentError::InvalidStateTransition { .. }));
        assert_eq!(incident.state(), IncidentState::Initial);
        assert!(incident.transitions().is_empty());
    }

    #[test]
    fn test_tier_raises_once_and_one_step() {
        let mut incident = incident(Tier::Normal);

        assert!(incident.raise_tier(Tier::UrgentPhone).is_err());
        incident.raise_tier(Tier::UrgentSms).unwrap();
        assert_eq!(incident.tier(), Tier::UrgentSms);

        assert!(incident.raise_tier(Tier::UrgentPhone).is_err());
        assert_eq!(incident.tier(), Tier::UrgentSms);
        assert_eq!(incident.escalations(), 1);
    }
}
