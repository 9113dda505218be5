use std::sync::Arc;

use tracing::{debug, info, warn};

use super::allowance::{resolve_grants, AllowanceGrant};
use super::approval::{
    ApprovalError, ApprovalWorkflow, BatchOutcome, ContractViolation, DecisionOutcome,
};
use super::domain::{DateRange, Decision, Employee, EmployeeId, EventId};
use super::export::{export_aggregate, AttendanceSheet, ExportError};
use super::reconciliation::{
    fetch_validated, DataFetchError, EmployeeAggregate, ReconciliationEngine,
};
use super::repository::{
    AttendanceEventSource, DecisionStore, EmployeeDirectory, RepositoryError, ShiftCatalog,
    TripRegistry,
};
use super::review::{review_queue, ReviewItem};
use crate::config::ReconciliationLimits;

/// Everything the service needs from the attendance system of record.
pub trait AttendanceRepository:
    AttendanceEventSource + DecisionStore + EmployeeDirectory + TripRegistry
{
}

impl<T> AttendanceRepository for T where
    T: AttendanceEventSource + DecisionStore + EmployeeDirectory + TripRegistry
{
}

/// Service composing reconciliation, review, approval, allowance and export over injected
/// repositories.
pub struct AttendanceService<R, C> {
    repository: Arc<R>,
    shifts: Arc<C>,
    limits: ReconciliationLimits,
}

impl<R, C> AttendanceService<R, C>
where
    R: AttendanceRepository + 'static,
    C: ShiftCatalog + 'static,
{
    pub fn new(repository: Arc<R>, shifts: Arc<C>) -> Self {
        Self::with_limits(repository, shifts, ReconciliationLimits::default())
    }

    pub fn with_limits(repository: Arc<R>, shifts: Arc<C>, limits: ReconciliationLimits) -> Self {
        Self {
            repository,
            shifts,
            limits,
        }
    }

    pub fn limits(&self) -> ReconciliationLimits {
        self.limits
    }

    pub fn employee(&self, employee_id: &EmployeeId) -> Result<Employee, AttendanceServiceError> {
        self.repository
            .fetch_employee(employee_id)?
            .ok_or_else(|| AttendanceServiceError::UnknownEmployee(employee_id.clone()))
    }

    /// Reconcile one employee over an inclusive range.
    pub fn reconcile(
        &self,
        employee_id: &EmployeeId,
        range: DateRange,
    ) -> Result<EmployeeAggregate, AttendanceServiceError> {
        self.check_range(range)?;
        let employee = self.employee(employee_id)?;

        let engine = ReconciliationEngine::new(self.repository.as_ref(), self.shifts.as_ref());
        let aggregate = engine.reconcile(&employee, range).map_err(|err| {
            warn!(employee = %employee_id, error = %err, "reconciliation aborted");
            err
        })?;

        info!(
            employee = %employee_id,
            from = %range.start(),
            to = %range.end(),
            present = aggregate.total_days,
            late_minutes = aggregate.total_late,
            overtime_minutes = aggregate.total_overtime,
            alpha = aggregate.total_alpha,
            "attendance reconciled"
        );
        Ok(aggregate)
    }

    /// Reconcile several employees; the first failure aborts the whole request.
    pub fn reconcile_many(
        &self,
        employee_ids: &[EmployeeId],
        range: DateRange,
    ) -> Result<Vec<EmployeeAggregate>, AttendanceServiceError> {
        employee_ids
            .iter()
            .map(|employee_id| self.reconcile(employee_id, range))
            .collect()
    }

    pub fn review_queue(
        &self,
        employee_id: &EmployeeId,
        range: DateRange,
    ) -> Result<Vec<ReviewItem>, AttendanceServiceError> {
        self.check_range(range)?;
        let employee = self.employee(employee_id)?;
        let events = fetch_validated(self.repository.as_ref(), &employee.id, range)?;
        let queue = review_queue(events.into_values());
        debug!(employee = %employee_id, pending = queue.len(), "review queue built");
        Ok(queue)
    }

    pub fn decide(
        &self,
        event_id: &EventId,
        decision: Decision,
    ) -> Result<DecisionOutcome, AttendanceServiceError> {
        let workflow = ApprovalWorkflow::new(self.repository.as_ref());
        Ok(workflow.decide(event_id, decision)?)
    }

    pub fn decide_batch(
        &self,
        approved_ids: &[EventId],
        rejected_ids: &[EventId],
    ) -> Result<BatchOutcome, AttendanceServiceError> {
        let workflow = ApprovalWorkflow::new(self.repository.as_ref());
        Ok(workflow.decide_batch(approved_ids, rejected_ids)?)
    }

    /// Allowances granted by an approved event.
    pub fn allowances(
        &self,
        event_id: &EventId,
    ) -> Result<Vec<AllowanceGrant>, AttendanceServiceError> {
        let event = self
            .repository
            .fetch_event(event_id)?
            .ok_or_else(|| RepositoryError::NotFound(format!("attendance event {event_id}")))?;
        let employee = self.employee(&event.employee_id)?;

        let trip = match &event.trip_id {
            Some(trip_id) => Some(self.repository.fetch_trip(trip_id)?.ok_or_else(|| {
                RepositoryError::NotFound(format!("trip {} linked to event {event_id}", trip_id.0))
            })?),
            None => None,
        };

        resolve_grants(&event, employee.allowances, trip.as_ref()).map_err(|violation| {
            warn!(%violation, "allowance resolution refused");
            AttendanceServiceError::Contract(violation)
        })
    }

    pub fn export(
        &self,
        employee_ids: &[EmployeeId],
        range: DateRange,
    ) -> Result<AttendanceSheet, AttendanceServiceError> {
        let aggregates = self.reconcile_many(employee_ids, range)?;
        Ok(export_aggregate(&aggregates, range))
    }

    fn check_range(&self, range: DateRange) -> Result<(), AttendanceServiceError> {
        if range.len_days() > self.limits.max_range_days {
            return Err(AttendanceServiceError::RangeTooLong {
                days: range.len_days(),
                max: self.limits.max_range_days,
            });
        }
        Ok(())
    }
}

/// Error raised by the attendance service.
#[derive(Debug, thiserror::Error)]
pub enum AttendanceServiceError {
    #[error(transparent)]
    DataFetch(#[from] DataFetchError),
    #[error(transparent)]
    Approval(#[from] ApprovalError),
    #[error(transparent)]
    Contract(#[from] ContractViolation),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("unknown employee {0}")]
    UnknownEmployee(EmployeeId),
    #[error("date range spans {days} days, limit is {max}")]
    RangeTooLong { days: u32, max: u32 },
}
