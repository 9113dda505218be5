mod rules;

pub use rules::{is_early_checkout, lateness_minutes};

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::abnormality::AbnormalityReason;
use super::domain::{
    is_non_working_day, ApprovalStatus, AttendanceEvent, DateRange, Employee, EmployeeId,
    EventId, RemarkKind,
};
use super::repository::{AttendanceEventSource, RepositoryError, ShiftCatalog};

/// Derived attendance fact for one employee on one date.
///
/// `late_minutes` and `overtime_minutes` are `None` when the date is not applicable: leave
/// remarks, rejected events, or (for lateness) an event without a check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyAttendanceRecord {
    pub event_id: EventId,
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub shift_name: String,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub late_minutes: Option<i64>,
    pub overtime_minutes: Option<i64>,
    pub early_checkout: bool,
    pub remark: Option<RemarkKind>,
    pub status: ApprovalStatus,
    pub abnormalities: Vec<AbnormalityReason>,
    pub non_working_day: bool,
}

impl DailyAttendanceRecord {
    /// Whether this date feeds the aggregate totals at all.
    pub fn counts_toward_totals(&self) -> bool {
        self.status != ApprovalStatus::Rejected && !self.is_leave()
    }

    pub fn is_leave(&self) -> bool {
        self.remark.is_some_and(RemarkKind::is_leave)
    }

    pub fn is_present(&self) -> bool {
        self.counts_toward_totals() && self.check_in.is_some()
    }

    pub fn is_missing_checkout(&self) -> bool {
        self.is_present() && self.check_out.is_none()
    }
}

/// Reconciled view of one employee over a date range. Always computed fresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeAggregate {
    pub employee_id: EmployeeId,
    pub nip: String,
    pub name: String,
    pub range: DateRange,
    pub days: BTreeMap<NaiveDate, DailyAttendanceRecord>,
    pub alpha_dates: Vec<NaiveDate>,
    pub total_days: u32,
    pub total_late: i64,
    pub total_overtime: i64,
    pub total_alpha: u32,
    pub total_empty_out: u32,
}

impl EmployeeAggregate {
    fn from_records(
        employee: &Employee,
        range: DateRange,
        days: BTreeMap<NaiveDate, DailyAttendanceRecord>,
    ) -> Self {
        let alpha_dates: Vec<NaiveDate> = range
            .days()
            .filter(|date| !is_non_working_day(*date) && !days.contains_key(date))
            .collect();

        let total_days = days.values().filter(|record| record.is_present()).count() as u32;
        let total_late = days.values().filter_map(|record| record.late_minutes).sum();
        let total_overtime = days
            .values()
            .filter_map(|record| record.overtime_minutes)
            .sum();
        let total_empty_out = days
            .values()
            .filter(|record| record.is_missing_checkout())
            .count() as u32;

        Self {
            employee_id: employee.id.clone(),
            nip: employee.nip.clone(),
            name: employee.name.clone(),
            range,
            total_alpha: alpha_dates.len() as u32,
            alpha_dates,
            days,
            total_days,
            total_late,
            total_overtime,
            total_empty_out,
        }
    }

    pub fn record(&self, date: NaiveDate) -> Option<&DailyAttendanceRecord> {
        self.days.get(&date)
    }
}

/// Failure to obtain trustworthy source data; no partial aggregate is ever produced.
#[derive(Debug, thiserror::Error)]
pub enum DataFetchError {
    #[error("attendance source failed: {0}")]
    Source(#[from] RepositoryError),
    #[error("event {event_id} belongs to employee {employee_id}")]
    ForeignEvent {
        event_id: EventId,
        employee_id: EmployeeId,
    },
    #[error("event {event_id} dated {date} is outside the requested range")]
    OutOfRange { event_id: EventId, date: NaiveDate },
    #[error("events {first} and {second} are both recorded on {date}")]
    DuplicateDate {
        date: NaiveDate,
        first: EventId,
        second: EventId,
    },
    #[error("event {event_id} checks out before it checks in")]
    CheckoutBeforeCheckin { event_id: EventId },
    #[error("event {event_id} carries a negative or non-finite site distance")]
    InvalidDistance { event_id: EventId },
    #[error("event {event_id} carries a negative or non-finite overtime duration")]
    InvalidOvertime { event_id: EventId },
    #[error("no shift scheduled for {employee_id} on {date}")]
    MissingShift {
        employee_id: EmployeeId,
        date: NaiveDate,
    },
}

/// Folds raw events and per-date shifts into an [`EmployeeAggregate`].
pub struct ReconciliationEngine<'a, E: ?Sized, C: ?Sized> {
    events: &'a E,
    shifts: &'a C,
}

impl<'a, E, C> ReconciliationEngine<'a, E, C>
where
    E: AttendanceEventSource + ?Sized,
    C: ShiftCatalog + ?Sized,
{
    pub fn new(events: &'a E, shifts: &'a C) -> Self {
        Self { events, shifts }
    }

    pub fn reconcile(
        &self,
        employee: &Employee,
        range: DateRange,
    ) -> Result<EmployeeAggregate, DataFetchError> {
        let by_date = fetch_validated(self.events, &employee.id, range)?;

        let mut days = BTreeMap::new();
        for (date, event) in &by_date {
            // Shifts change mid-range, so each date resolves its own.
            let shift = self
                .shifts
                .fetch_shift(&employee.id, *date)?
                .ok_or_else(|| DataFetchError::MissingShift {
                    employee_id: employee.id.clone(),
                    date: *date,
                })?;
            days.insert(*date, rules::derive_record(event, &shift));
        }

        Ok(EmployeeAggregate::from_records(employee, range, days))
    }
}

/// Fetch an employee's events for `range`, keyed by date, after source-contract validation.
/// Every read that trusts event data goes through here.
pub(crate) fn fetch_validated<E>(
    source: &E,
    employee_id: &EmployeeId,
    range: DateRange,
) -> Result<BTreeMap<NaiveDate, AttendanceEvent>, DataFetchError>
where
    E: AttendanceEventSource + ?Sized,
{
    let fetched = source.fetch_events(employee_id, range)?;
    rules::index_events(employee_id, range, fetched)
}
