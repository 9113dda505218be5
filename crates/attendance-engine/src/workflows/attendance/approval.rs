use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{ApprovalStatus, AttendanceEvent, Decision, EventId};
use super::repository::{AttendanceEventSource, DecisionBatch, DecisionStore, RepositoryError};

/// A decision requested on an event that already left `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error(
    "event {event_id} is already {} and cannot be {}",
    .current.label(),
    .requested.resulting_status().label()
)]
pub struct InvalidTransition {
    pub event_id: EventId,
    pub current: ApprovalStatus,
    pub requested: Decision,
}

/// Caller bugs. These fail loudly instead of being corrected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("event ids present in both approve and reject lists: {}", join_ids(.0))]
    OverlappingBatch(Vec<EventId>),
    #[error("allowances requested for event {event_id} in state {}", .status.label())]
    UnapprovedEvent {
        event_id: EventId,
        status: ApprovalStatus,
    },
}

fn join_ids(ids: &[EventId]) -> String {
    ids.iter()
        .map(|id| id.0.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error(transparent)]
    Contract(#[from] ContractViolation),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of a single-event decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Applied {
        event: AttendanceEvent,
    },
    /// The event was already terminal and is returned exactly as stored.
    Unchanged {
        event: AttendanceEvent,
        transition: InvalidTransition,
    },
}

impl DecisionOutcome {
    pub fn event(&self) -> &AttendanceEvent {
        match self {
            DecisionOutcome::Applied { event } | DecisionOutcome::Unchanged { event, .. } => event,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, DecisionOutcome::Applied { .. })
    }
}

/// Result of a batch decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub approved: Vec<EventId>,
    pub rejected: Vec<EventId>,
    pub unchanged: Vec<InvalidTransition>,
}

/// Pending → Approved | Rejected state machine over an external event store.
pub struct ApprovalWorkflow<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> ApprovalWorkflow<'a, S>
where
    S: AttendanceEventSource + DecisionStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn decide(
        &self,
        event_id: &EventId,
        decision: Decision,
    ) -> Result<DecisionOutcome, ApprovalError> {
        let event = self.load(event_id)?;

        if event.status.is_terminal() {
            return Ok(Self::unchanged(event, decision));
        }

        let mut batch = DecisionBatch::default();
        match decision {
            Decision::Approved => batch.approved.insert(event.id.clone()),
            Decision::Rejected => batch.rejected.insert(event.id.clone()),
        };
        match self.store.apply_decisions(&batch) {
            // Another decision landed between our read and our write.
            Err(RepositoryError::StaleDecision(stale)) => {
                let current = self.load(event_id)?;
                if !current.status.is_terminal() {
                    return Err(RepositoryError::StaleDecision(stale).into());
                }
                return Ok(Self::unchanged(current, decision));
            }
            other => other?,
        }

        let mut event = event;
        event.status = decision.resulting_status();
        info!(event_id = %event.id, status = event.status.label(), "attendance event decided");
        Ok(DecisionOutcome::Applied { event })
    }

    /// Apply many decisions as one all-or-nothing batch. Ids in neither list stay pending;
    /// ids already terminal are reported in [`BatchOutcome::unchanged`].
    pub fn decide_batch(
        &self,
        approved_ids: &[EventId],
        rejected_ids: &[EventId],
    ) -> Result<BatchOutcome, ApprovalError> {
        let approved: BTreeSet<EventId> = approved_ids.iter().cloned().collect();
        let rejected: BTreeSet<EventId> = rejected_ids.iter().cloned().collect();

        let overlap: Vec<EventId> = approved.intersection(&rejected).cloned().collect();
        if !overlap.is_empty() {
            let violation = ContractViolation::OverlappingBatch(overlap);
            warn!(%violation, "rejecting batch decision");
            return Err(violation.into());
        }

        let (mut batch, mut outcome) = self.partition(&approved, &rejected)?;
        if !batch.is_empty() {
            match self.store.apply_decisions(&batch) {
                Err(RepositoryError::StaleDecision(event_id)) => {
                    // A concurrent decision won the race; re-read and retry once with what is
                    // still pending. A second conflict is reported to the caller.
                    warn!(%event_id, "batch raced with another decision, retrying");
                    (batch, outcome) = self.partition(&approved, &rejected)?;
                    if !batch.is_empty() {
                        self.store.apply_decisions(&batch)?;
                    }
                }
                other => other?,
            }
        }

        if !outcome.unchanged.is_empty() {
            warn!(
                skipped = outcome.unchanged.len(),
                "batch contained events that were already decided"
            );
        }

        info!(
            approved = outcome.approved.len(),
            rejected = outcome.rejected.len(),
            written = batch.len(),
            "attendance batch decision applied"
        );
        Ok(outcome)
    }

    /// Split the requested ids into a write batch of pending events and the terminal rest.
    fn partition(
        &self,
        approved: &BTreeSet<EventId>,
        rejected: &BTreeSet<EventId>,
    ) -> Result<(DecisionBatch, BatchOutcome), ApprovalError> {
        let mut batch = DecisionBatch::default();
        let mut outcome = BatchOutcome::default();

        let requested = approved
            .iter()
            .map(|id| (id, Decision::Approved))
            .chain(rejected.iter().map(|id| (id, Decision::Rejected)));

        for (id, decision) in requested {
            let event = self.load(id)?;
            if event.status.is_terminal() {
                outcome.unchanged.push(InvalidTransition {
                    event_id: event.id,
                    current: event.status,
                    requested: decision,
                });
                continue;
            }
            match decision {
                Decision::Approved => {
                    batch.approved.insert(event.id.clone());
                    outcome.approved.push(event.id);
                }
                Decision::Rejected => {
                    batch.rejected.insert(event.id.clone());
                    outcome.rejected.push(event.id);
                }
            }
        }

        Ok((batch, outcome))
    }

    fn unchanged(event: AttendanceEvent, requested: Decision) -> DecisionOutcome {
        let transition = InvalidTransition {
            event_id: event.id.clone(),
            current: event.status,
            requested,
        };
        warn!(%transition, "ignoring decision on terminal attendance event");
        DecisionOutcome::Unchanged { event, transition }
    }

    fn load(&self, event_id: &EventId) -> Result<AttendanceEvent, RepositoryError> {
        self.store
            .fetch_event(event_id)?
            .ok_or_else(|| RepositoryError::NotFound(format!("attendance event {event_id}")))
    }
}
