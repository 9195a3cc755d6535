//! Incident model
//!
//! An incident is one escalation lifecycle: it starts when a detector fires
//! and ends when a human acknowledges, when urgency has been raised, or when
//! the first alert could not be sent.

mod incident;
mod state;
mod tier;

pub use incident::{AlertPayload, Incident, IncidentId, IncidentStatus, Transition};
pub use state::IncidentState;
pub use tier::Tier;
