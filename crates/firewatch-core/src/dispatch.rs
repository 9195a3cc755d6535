//! Incident dispatcher
//!
//! Turns triggers into independently running incidents. Each incident gets
//! its own task, stand-down token and status channel, so a slow gateway call
//! in one incident never holds up another or the caller.
//!
//! Finished incidents leave the live registry; their final status moves into
//! a bounded history so recent outcomes stay queryable.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

use crate::directory::RecipientDirectory;
use crate::error::{FirewatchError, IncidentError};
use crate::escalation::{EscalationController, IncidentReport};
use crate::incident::{AlertPayload, Incident, IncidentId, IncidentState, IncidentStatus, Tier};

/// Finished incidents remembered when no limit is configured
pub const DEFAULT_HISTORY_LIMIT: usize = 64;

struct TrackedIncident {
    status: watch::Receiver<IncidentStatus>,
    stand_down: CancellationToken,
    abort: AbortHandle,
}

/// Caller-side handle to a running incident
pub struct IncidentHandle {
    id: IncidentId,
    status: watch::Receiver<IncidentStatus>,
    stand_down: CancellationToken,
    task: JoinHandle<Result<IncidentReport, IncidentError>>,
}

impl IncidentHandle {
    pub fn id(&self) -> IncidentId {
        self.id
    }

    /// Latest published status
    pub fn status(&self) -> IncidentStatus {
        self.status.borrow().clone()
    }

    /// Receiver that wakes on every status change
    pub fn watch(&self) -> watch::Receiver<IncidentStatus> {
        self.status.clone()
    }

    /// Acknowledge from outside; ends a waiting incident as confirmed
    pub fn stand_down(&self) {
        self.stand_down.cancel();
    }

    /// Tear the incident down immediately, wherever it is
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the incident to finish
    pub async fn wait(self) -> Result<IncidentReport, FirewatchError> {
        match self.task.await {
            Ok(result) => Ok(result?),
            Err(e) => Err(FirewatchError::Aborted(e.to_string())),
        }
    }
}

/// Spawns and tracks incidents
pub struct IncidentDispatcher {
    controller: Arc<EscalationController>,
    directory: Arc<RecipientDirectory>,
    initial_tier: Tier,
    cooldown: Duration,
    last_accepted: Mutex<Option<Instant>>,
    incidents: RwLock<HashMap<IncidentId, TrackedIncident>>,
    history: Mutex<VecDeque<IncidentStatus>>,
    history_limit: usize,
}

impl IncidentDispatcher {
    pub fn new(
        controller: Arc<EscalationController>,
        directory: Arc<RecipientDirectory>,
        initial_tier: Tier,
    ) -> Self {
        Self {
            controller,
            directory,
            initial_tier,
            cooldown: Duration::ZERO,
            last_accepted: Mutex::new(None),
            incidents: RwLock::new(HashMap::new()),
            history: Mutex::new(VecDeque::new()),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Reject triggers arriving within `cooldown` of the last accepted one
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Keep at most `limit` finished incidents for lookup
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn directory(&self) -> &RecipientDirectory {
        &self.directory
    }

    /// Start a new incident for `payload`. Must be called inside a tokio runtime.
    pub fn trigger(&self, payload: AlertPayload) -> Result<IncidentHandle, IncidentError> {
        self.check_cooldown()?;
        self.retire_finished();

        let mut incident = Incident::new(payload, self.directory.recipients(), self.initial_tier);
        let id = incident.id();
        let status = incident.subscribe();
        let stand_down = CancellationToken::new();

        let controller = Arc::clone(&self.controller);
        let token = stand_down.clone();
        let span = info_span!("incident", id = %id);
        let task = tokio::spawn(
            async move {
                controller
                    .run_escalation_with_cancel(&mut incident, &token)
                    .await
            }
            .instrument(span),
        );

        info!(incident = %id, recipients = self.directory.len(), "Incident triggered");

        self.write_incidents().insert(
            id,
            TrackedIncident {
                status: status.clone(),
                stand_down: stand_down.clone(),
                abort: task.abort_handle(),
            },
        );

        Ok(IncidentHandle {
            id,
            status,
            stand_down,
            task,
        })
    }

    /// Stand down an incident by id.
    ///
    /// Only incidents that have not started escalating can still be
    /// acknowledged this way; returns `false` for those past `Waiting`,
    /// finished, or unknown.
    pub fn stand_down(&self, id: &IncidentId) -> bool {
        let incidents = self.read_incidents();
        let Some(tracked) = incidents.get(id) else {
            return false;
        };
        let state = tracked.status.borrow().state;
        match state {
            IncidentState::Initial | IncidentState::Dispatched | IncidentState::Waiting => {
                info!(incident = %id, "Stand-down requested");
                tracked.stand_down.cancel();
                true
            }
            _ => {
                debug!(incident = %id, state = %state, "Stand-down refused");
                false
            }
        }
    }

    /// Status of a live incident, or the final status of a recently finished one
    pub fn status(&self, id: &IncidentId) -> Option<IncidentStatus> {
        if let Some(tracked) = self.read_incidents().get(id) {
            return Some(tracked.status.borrow().clone());
        }
        self.lock_history().iter().find(|s| s.id == *id).cloned()
    }

    /// Incidents still running, oldest first
    pub fn list(&self) -> Vec<IncidentStatus> {
        self.retire_finished();
        let mut statuses: Vec<IncidentStatus> = self
            .read_incidents()
            .values()
            .map(|t| t.status.borrow().clone())
            .collect();
        statuses.sort_by_key(|s| s.created_at);
        statuses
    }

    /// Final statuses of recently finished incidents, oldest first
    pub fn recent(&self) -> Vec<IncidentStatus> {
        self.retire_finished();
        let mut statuses: Vec<IncidentStatus> = self.lock_history().iter().cloned().collect();
        statuses.sort_by_key(|s| s.created_at);
        statuses
    }

    /// Number of incidents not yet in a terminal state
    pub fn active_count(&self) -> usize {
        self.retire_finished();
        self.read_incidents()
            .values()
            .filter(|t| !t.status.borrow().state.is_terminal())
            .count()
    }

    /// Abort every running incident
    pub fn shutdown(&self) {
        for (id, tracked) in self.read_incidents().iter() {
            if !tracked.abort.is_finished() {
                info!(incident = %id, "Aborting incident on shutdown");
                tracked.abort.abort();
            }
        }
    }

    /// Move incidents whose task has ended out of the live registry
    fn retire_finished(&self) {
        let mut incidents = self.write_incidents();
        let finished: Vec<IncidentId> = incidents
            .iter()
            .filter(|(_, t)| t.abort.is_finished())
            .map(|(id, _)| *id)
            .collect();
        if finished.is_empty() {
            return;
        }

        // History is updated under the registry lock so `status` never misses
        // an incident in transit.
        let mut history = self.lock_history();
        for id in finished {
            if let Some(tracked) = incidents.remove(&id) {
                history.push_back(tracked.status.borrow().clone());
            }
        }
        while history.len() > self.history_limit {
            history.pop_front();
        }
    }

    fn check_cooldown(&self) -> Result<(), IncidentError> {
        let mut last = self
            .last_accepted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();

        if let Some(previous) = *last {
            let elapsed = now.duration_since(previous);
            if elapsed < self.cooldown {
                let remaining = self.cooldown - elapsed;
                return Err(IncidentError::CoolingDown {
                    remaining_secs: remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
                });
            }
        }

        *last = Some(now);
        Ok(())
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, VecDeque<IncidentStatus>> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_incidents(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<IncidentId, TrackedIncident>> {
        self.incidents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_incidents(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<IncidentId, TrackedIncident>> {
        self.incidents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
