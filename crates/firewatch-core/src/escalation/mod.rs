//! Alert escalation
//!
//! The [`EscalationController`] owns an incident from first alert to terminal
//! state. It hands the waiting period to a [`ConfirmationPoller`], then either
//! stands down or raises urgency by one tier on the original alert.

mod controller;
mod poller;

pub use controller::{
    Acknowledgment, Addressing, EscalationController, EscalationPolicy, IncidentReport,
};
pub use poller::{ConfirmationPoller, PollOutcome, PollReport};
