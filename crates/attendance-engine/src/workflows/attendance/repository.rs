use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    AttendanceEvent, DateRange, Employee, EmployeeId, EventId, ShiftDefinition, TripId,
    TripRecord,
};

/// Read access to raw attendance events.
pub trait AttendanceEventSource: Send + Sync {
    fn fetch_events(
        &self,
        employee_id: &EmployeeId,
        range: DateRange,
    ) -> Result<Vec<AttendanceEvent>, RepositoryError>;

    fn fetch_event(&self, id: &EventId) -> Result<Option<AttendanceEvent>, RepositoryError>;
}

/// Shift lookup; `None` means no shift is scheduled for that employee on that date.
pub trait ShiftCatalog: Send + Sync {
    fn fetch_shift(
        &self,
        employee_id: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Option<ShiftDefinition>, RepositoryError>;
}

/// Write side of the approval workflow.
///
/// Implementations must apply a batch transactionally: either every transition in the batch
/// is persisted or none is, and a concurrent reader never observes a partial batch.
pub trait DecisionStore: Send + Sync {
    fn apply_decisions(&self, batch: &DecisionBatch) -> Result<(), RepositoryError>;
}

pub trait EmployeeDirectory: Send + Sync {
    fn fetch_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;
}

pub trait TripRegistry: Send + Sync {
    fn fetch_trip(&self, id: &TripId) -> Result<Option<TripRecord>, RepositoryError>;
}

/// Disjoint approve/reject sets handed to [`DecisionStore::apply_decisions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionBatch {
    pub approved: BTreeSet<EventId>,
    pub rejected: BTreeSet<EventId>,
}

impl DecisionBatch {
    pub fn is_empty(&self) -> bool {
        self.approved.is_empty() && self.rejected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.approved.len() + self.rejected.len()
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("event {0} is no longer pending")]
    StaleDecision(EventId),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("malformed payload from attendance source: {0}")]
    Malformed(String),
}
