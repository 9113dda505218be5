//! Attendance reconciliation, abnormality review, approval and allowance resolution.
//!
//! Nothing here owns storage. Events, shifts, employees and trips arrive through the traits in
//! [`repository`], every reconciliation is recomputed from source, and approval decisions are
//! written back through the store's atomic [`repository::DecisionStore::apply_decisions`].

pub mod abnormality;
pub mod allowance;
pub mod approval;
pub mod domain;
pub mod export;
pub mod reconciliation;
pub mod repository;
pub mod review;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use abnormality::{classify, AbnormalityReason, MAX_SITE_DISTANCE_M};
pub use allowance::{resolve_grants, AllowanceGrant, AllowanceKind, GrantBasis};
pub use approval::{
    ApprovalError, ApprovalWorkflow, BatchOutcome, ContractViolation, DecisionOutcome,
    InvalidTransition,
};
pub use domain::{
    AllowanceFlags, ApprovalStatus, AttendanceEvent, DateRange, Decision, Employee, EmployeeId,
    EventId, OvertimeSubmission, Remark, RemarkKind, ShiftDefinition, ShiftId, TripId,
    TripRecord,
};
pub use export::{export_aggregate, AttendanceSheet, ExportError, MergedRange, SheetCell};
pub use reconciliation::{
    DailyAttendanceRecord, DataFetchError, EmployeeAggregate, ReconciliationEngine,
};
pub use repository::{
    AttendanceEventSource, DecisionBatch, DecisionStore, EmployeeDirectory, RepositoryError,
    ShiftCatalog, TripRegistry,
};
pub use review::{review_queue, ReviewItem};
pub use router::attendance_router;
pub use service::{AttendanceRepository, AttendanceService, AttendanceServiceError};
