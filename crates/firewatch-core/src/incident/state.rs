//! Incident state machine
//!
//! State transitions:
//! ```text
//! Initial → Dispatched → Waiting → Escalating → TerminalEscalated
//!    ↓                      ↓
//!  Failed               Confirmed
//! ```

use serde::{Deserialize, Serialize};

/// The state of an incident's escalation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentState {
    /// Created, nothing sent yet
    Initial,
    /// First alert delivered to the gateway
    Dispatched,
    /// Polling for an acknowledgment
    Waiting,
    /// Confirmation window expired, raising urgency
    Escalating,
    /// A recipient acknowledged the alert
    Confirmed,
    /// Urgency raised (or attempted); nothing further happens
    TerminalEscalated,
    /// Aborted before the waiting period
    Failed,
}

impl IncidentState {
    /// Check if a state transition is valid
    pub fn can_transition_to(&self, target: &IncidentState) -> bool {
        match (self, target) {
            (IncidentState::Initial, IncidentState::Dispatched) => true,
            (IncidentState::Initial, IncidentState::Failed) => true,

            (IncidentState::Dispatched, IncidentState::Waiting) => true,

            (IncidentState::Waiting, IncidentState::Confirmed) => true,
            (IncidentState::Waiting, IncidentState::Escalating) => true,

            (IncidentState::Escalating, IncidentState::TerminalEscalated) => true,

            _ => false,
        }
    }

    /// Get valid next states from current state
    pub fn valid_transitions(&self) -> Vec<IncidentState> {
        match self {
            IncidentState::Initial => vec![IncidentState::Dispatched, IncidentState::Failed],
            IncidentState::Dispatched => vec![IncidentState::Waiting],
            IncidentState::Waiting => vec![IncidentState::Confirmed, IncidentState::Escalating],
            IncidentState::Escalating => vec![IncidentState::TerminalEscalated],
            IncidentState::Confirmed
            | IncidentState::TerminalEscalated
            | IncidentState::Failed => vec![],
        }
    }

    /// Check if the incident has finished
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IncidentState::Confirmed | IncidentState::TerminalEscalated | IncidentState::Failed
        )
    }

    /// Get a human-readable description of the state
    pub fn description(&self) -> &'static str {
        match self {
            IncidentState::Initial => "Created, alert not yet sent",
            IncidentState::Dispatched => "Alert sent",
            IncidentState::Waiting => "Waiting for acknowledgment",
            IncidentState::Escalating => "No acknowledgment, raising urgency",
            IncidentState::Confirmed => "Acknowledged by a recipient",
            IncidentState::TerminalEscalated => "Escalated without acknowledgment",
            IncidentState::Failed => "Aborted",
        }
    }
}

impl Default for IncidentState {
    fn default() -> Self {
        IncidentState::Initial
    }
}

impl std::fmt::Display for IncidentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentState::Initial => write!(f, "INITIAL"),
            IncidentState::Dispatched => write!(f, "DISPATCHED"),
            IncidentState::Waiting => write!(f, "WAITING"),
            IncidentState::Escalating => write!(f, "ESCALATING"),
            IncidentState::Confirmed => write!(f, "CONFIRMED"),
            IncidentState::TerminalEscalated => write!(f, "TERMINAL_ESCALATED"),
            IncidentState::Failed => write!(f, "FAILED"),
        }
    }
}
