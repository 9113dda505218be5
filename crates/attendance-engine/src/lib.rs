//! Attendance reconciliation and approval engine.
//!
//! Raw check-in/check-out events and shift definitions are folded into per-day attendance
//! facts, abnormal events are queued for human review, and decided events gate what counts
//! toward allowance and payroll totals. Storage and shift scheduling stay outside the crate
//! behind the traits in [`workflows::attendance::repository`].

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
