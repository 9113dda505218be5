use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use super::super::abnormality::classify;
use super::super::domain::{
    is_non_working_day, ApprovalStatus, AttendanceEvent, DateRange, EmployeeId, ShiftDefinition,
};
use super::{DailyAttendanceRecord, DataFetchError};

/// Index the fetched events by date, rejecting anything that breaks the source contract.
pub(crate) fn index_events(
    employee_id: &EmployeeId,
    range: DateRange,
    events: Vec<AttendanceEvent>,
) -> Result<BTreeMap<NaiveDate, AttendanceEvent>, DataFetchError> {
    let mut by_date: BTreeMap<NaiveDate, AttendanceEvent> = BTreeMap::new();

    for event in events {
        validate_event(employee_id, range, &event)?;

        if let Some(existing) = by_date.get(&event.date) {
            return Err(DataFetchError::DuplicateDate {
                date: event.date,
                first: existing.id.clone(),
                second: event.id,
            });
        }
        by_date.insert(event.date, event);
    }

    Ok(by_date)
}

fn validate_event(
    employee_id: &EmployeeId,
    range: DateRange,
    event: &AttendanceEvent,
) -> Result<(), DataFetchError> {
    if &event.employee_id != employee_id {
        return Err(DataFetchError::ForeignEvent {
            event_id: event.id.clone(),
            employee_id: event.employee_id.clone(),
        });
    }

    if !range.contains(event.date) {
        return Err(DataFetchError::OutOfRange {
            event_id: event.id.clone(),
            date: event.date,
        });
    }

    if let (Some(check_in), Some(check_out)) = (event.check_in, event.check_out) {
        if check_out < check_in {
            return Err(DataFetchError::CheckoutBeforeCheckin {
                event_id: event.id.clone(),
            });
        }
    }

    let distances_valid = valid_distance(event.start_distance_m)
        && event.end_distance_m.map_or(true, valid_distance);
    if !distances_valid {
        return Err(DataFetchError::InvalidDistance {
            event_id: event.id.clone(),
        });
    }

    if event
        .overtime
        .iter()
        .any(|submission| !submission.total_hours.is_finite() || submission.total_hours < 0.0)
    {
        return Err(DataFetchError::InvalidOvertime {
            event_id: event.id.clone(),
        });
    }

    Ok(())
}

fn valid_distance(meters: f64) -> bool {
    meters.is_finite() && meters >= 0.0
}

/// Whole minutes between the scheduled start and the check-in, floored at zero.
pub fn lateness_minutes(check_in: NaiveDateTime, shift_start: NaiveDateTime) -> i64 {
    (check_in - shift_start).num_minutes().max(0)
}

pub fn is_early_checkout(check_out: Option<NaiveDateTime>, shift_end: NaiveDateTime) -> bool {
    check_out.is_some_and(|check_out| check_out < shift_end)
}

/// Derive the per-day fact for one event under the shift in effect on its date.
pub(crate) fn derive_record(
    event: &AttendanceEvent,
    shift: &ShiftDefinition,
) -> DailyAttendanceRecord {
    let excluded = event.is_on_leave() || event.status == ApprovalStatus::Rejected;

    let late_minutes = match event.check_in {
        Some(check_in) if !excluded => {
            Some(lateness_minutes(check_in, shift.starts_at(event.date)))
        }
        _ => None,
    };

    let overtime_minutes = if excluded {
        None
    } else {
        Some(event.approved_overtime_minutes())
    };

    DailyAttendanceRecord {
        event_id: event.id.clone(),
        employee_id: event.employee_id.clone(),
        date: event.date,
        shift_name: shift.name.clone(),
        check_in: event.check_in,
        check_out: event.check_out,
        late_minutes,
        overtime_minutes,
        early_checkout: is_early_checkout(event.check_out, shift.ends_at(event.date)),
        remark: event.remark_kind(),
        status: event.status,
        abnormalities: classify(event),
        non_working_day: is_non_working_day(event.date),
    }
}
