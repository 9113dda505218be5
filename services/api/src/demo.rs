use crate::infra::{InMemoryAttendanceStore, InMemoryShiftCatalog};
use attendance_engine::error::AppError;
use attendance_engine::workflows::attendance::{
    AllowanceFlags, ApprovalStatus, AttendanceEvent, AttendanceService, DateRange, Decision,
    Employee, EmployeeAggregate, EmployeeId, EventId, OvertimeSubmission, Remark, RemarkKind,
    RepositoryError, ShiftDefinition, ShiftId, TripId, TripRecord,
};
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime, Weekday};
use clap::Args;
use std::io::Write;
use std::sync::Arc;

pub(crate) type DemoService = AttendanceService<InMemoryAttendanceStore, InMemoryShiftCatalog>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Monday the seeded week starts on (YYYY-MM-DD). Defaults to the current week.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) week_of: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct ReconcileArgs {
    /// First day of the report (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) from: NaiveDate,
    /// Last day of the report, inclusive (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) to: NaiveDate,
    /// Restrict the report to these employee ids; defaults to the whole roster
    #[arg(long = "employee")]
    pub(crate) employees: Vec<String>,
}

/// Print the CSV attendance sheet for the seeded roster.
pub(crate) fn run_reconcile(args: ReconcileArgs) -> Result<(), AppError> {
    let range = DateRange::new(args.from, args.to)
        .map_err(|err| AppError::Usage(err.to_string()))?;
    let (service, store) = seeded_service(monday_of(range.start()))?;

    let employees = if args.employees.is_empty() {
        store.employee_ids().map_err(attendance_error)?
    } else {
        args.employees.into_iter().map(EmployeeId).collect()
    };

    let sheet = service.export(&employees, range)?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    sheet.write_csv(&mut handle)?;
    handle.flush()?;
    Ok(())
}

/// Walk the approval workflow on the seeded week and show its effect on the totals.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let monday = monday_of(args.week_of.unwrap_or_else(|| Local::now().date_naive()));
    let range = DateRange::new(monday, monday + Duration::days(6))
        .map_err(|err| AppError::Usage(err.to_string()))?;
    let (service, _) = seeded_service(monday)?;
    let employee = EmployeeId(ROSTER[0].0.to_string());

    println!("Attendance demo for week {} .. {}", range.start(), range.end());
    let before = service.reconcile(&employee, range)?;
    render_aggregate("Before review", &before);

    let queue = service.review_queue(&employee, range)?;
    println!("\nReview queue ({} item(s))", queue.len());
    for item in &queue {
        let reasons: Vec<&str> = item.reasons.iter().map(|reason| reason.label()).collect();
        println!("  {} {} -> {}", item.event.date, item.event.id, reasons.join(", "));
    }

    let pending = pending_ids(&before);
    let (rejected, approved) = match pending.split_first() {
        Some((first, rest)) => (vec![first.clone()], rest.to_vec()),
        None => (Vec::new(), Vec::new()),
    };
    let outcome = service.decide_batch(&approved, &rejected)?;
    println!(
        "\nApplied batch: {} approved, {} rejected, {} unchanged",
        outcome.approved.len(),
        outcome.rejected.len(),
        outcome.unchanged.len()
    );

    let thursday = EventId(format!("{}-{}", ROSTER[0].0, 4));
    let repeat = service.decide(&thursday, Decision::Approved)?;
    println!(
        "Repeat decision on {}: {}",
        repeat.event().id,
        if repeat.was_applied() { "applied" } else { "unchanged" }
    );

    let after = service.reconcile(&employee, range)?;
    render_aggregate("After review", &after);

    let trip_event = EventId(format!("{}-{}", ROSTER[1].0, 3));
    match service.allowances(&trip_event) {
        Ok(grants) => {
            println!("\nAllowances for {trip_event}");
            for grant in grants {
                println!("  {}", grant.kind.label());
            }
        }
        Err(err) => println!("\nAllowances for {trip_event} unavailable: {err}"),
    }

    Ok(())
}

fn render_aggregate(title: &str, aggregate: &EmployeeAggregate) {
    println!("\n{title}: {} ({})", aggregate.name, aggregate.nip);
    for (date, record) in &aggregate.days {
        println!(
            "  {date} {:<7} in={} late={} overtime={} status={}",
            record.shift_name,
            record
                .check_in
                .map(|at| at.format("%H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
            minutes(record.late_minutes),
            minutes(record.overtime_minutes),
            record.status.label(),
        );
    }
    for date in &aggregate.alpha_dates {
        println!("  {date} alpha");
    }
    println!(
        "  present={} late={}m overtime={}m alpha={} no-checkout={}",
        aggregate.total_days,
        aggregate.total_late,
        aggregate.total_overtime,
        aggregate.total_alpha,
        aggregate.total_empty_out
    );
}

fn minutes(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |m| format!("{m}m"))
}

fn pending_ids(aggregate: &EmployeeAggregate) -> Vec<EventId> {
    aggregate
        .days
        .values()
        .filter(|record| record.status == ApprovalStatus::Pending)
        .map(|record| record.event_id.clone())
        .collect()
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn attendance_error(err: RepositoryError) -> AppError {
    AppError::Attendance(err.into())
}

const ROSTER: [(&str, &str, &str, AllowanceFlags); 2] = [
    (
        "emp-001",
        "198703122010011004",
        "Sri Wahyuni",
        AllowanceFlags {
            transport: true,
            lodging: false,
        },
    ),
    (
        "emp-002",
        "199002142015031007",
        "Bambang Sutrisno",
        AllowanceFlags {
            transport: false,
            lodging: false,
        },
    ),
];

fn shift(id: &str, name: &str, start: u32, end: u32) -> ShiftDefinition {
    ShiftDefinition {
        id: ShiftId(id.to_string()),
        name: name.to_string(),
        start: NaiveTime::from_hms_opt(start, 0, 0).unwrap_or(NaiveTime::MIN),
        end: NaiveTime::from_hms_opt(end, 0, 0).unwrap_or(NaiveTime::MIN),
    }
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> Option<chrono::NaiveDateTime> {
    date.and_hms_opt(hour, minute, 0)
}

pub(crate) fn seeded_service(
    monday: NaiveDate,
) -> Result<(DemoService, Arc<InMemoryAttendanceStore>), AppError> {
    let (store, shifts) = seed_roster(monday)?;
    Ok((AttendanceService::new(store.clone(), shifts), store))
}

/// Seed the working week containing `week_of` for the demo roster.
///
/// The first employee moves from the morning to the afternoon shift on Thursday, checks in
/// late on Tuesday, forgets to check out on Wednesday, takes sick leave on Friday and has no
/// record at all on Saturday. The second employee is on an official trip on Wednesday.
pub(crate) fn seed_roster(
    week_of: NaiveDate,
) -> Result<(Arc<InMemoryAttendanceStore>, Arc<InMemoryShiftCatalog>), AppError> {
    let monday = monday_of(week_of);
    let store = Arc::new(InMemoryAttendanceStore::default());
    let shifts = Arc::new(InMemoryShiftCatalog::new(shift("pagi", "Pagi", 8, 16)));

    for (id, nip, name, allowances) in ROSTER {
        store
            .insert_employee(Employee {
                id: EmployeeId(id.to_string()),
                nip: nip.to_string(),
                name: name.to_string(),
                allowances,
            })
            .map_err(attendance_error)?;
    }

    let trip = TripRecord {
        id: TripId("spd-0412".to_string()),
        destination: "Yogyakarta".to_string(),
        is_dinas: true,
    };
    store.insert_trip(trip.clone()).map_err(attendance_error)?;

    let first = EmployeeId(ROSTER[0].0.to_string());
    let thursday = monday + Duration::days(3);
    shifts
        .assign(first.clone(), thursday, shift("siang", "Siang", 13, 21))
        .map_err(attendance_error)?;

    for (employee_id, _, _, _) in ROSTER {
        for offset in 0..6 {
            let date = monday + Duration::days(offset);
            let Some(event) = seeded_event(employee_id, date, &trip) else {
                continue;
            };
            store.insert_event(event).map_err(attendance_error)?;
        }
    }

    Ok((store, shifts))
}

fn seeded_event(employee_id: &str, date: NaiveDate, trip: &TripRecord) -> Option<AttendanceEvent> {
    let weekday = date.weekday();
    let afternoon = employee_id == ROSTER[0].0 && matches!(weekday, Weekday::Thu | Weekday::Fri);
    let (start_hour, end_hour) = if afternoon { (13, 21) } else { (8, 16) };

    let mut event = AttendanceEvent {
        id: EventId(format!("{employee_id}-{}", weekday.number_from_monday())),
        employee_id: EmployeeId(employee_id.to_string()),
        date,
        shift_id: ShiftId(if afternoon { "siang" } else { "pagi" }.to_string()),
        check_in: at(date, start_hour - 1, 50),
        check_out: at(date, end_hour, 10),
        start_distance_m: 14.0,
        end_distance_m: Some(11.0),
        start_photo: true,
        end_photo: true,
        description: "Kantor".to_string(),
        status: ApprovalStatus::Pending,
        remark: None,
        trip_id: None,
        overtime: Vec::new(),
    };

    match (employee_id == ROSTER[0].0, weekday) {
        (_, Weekday::Sat) => return None,
        (true, Weekday::Mon) => {
            event.status = ApprovalStatus::Approved;
            event.overtime.push(OvertimeSubmission {
                start: at(date, 16, 0)?,
                end: at(date, 18, 0)?,
                total_hours: 2.0,
                status: ApprovalStatus::Approved,
                approver: Some("Kepala Seksi".to_string()),
                approved_at: at(date, 19, 0),
            });
        }
        (true, Weekday::Tue) => {
            event.check_in = at(date, 8, 25);
            event.start_distance_m = 72.0;
        }
        (true, Weekday::Wed) => {
            event.check_out = None;
            event.end_distance_m = None;
            event.end_photo = false;
        }
        (true, Weekday::Fri) => {
            event.check_in = None;
            event.check_out = None;
            event.end_distance_m = None;
            event.remark = Some(Remark {
                kind: RemarkKind::IzinSakit,
                note: Some("surat dokter".to_string()),
            });
        }
        (false, Weekday::Wed) => {
            event.status = ApprovalStatus::Approved;
            event.trip_id = Some(trip.id.clone());
            event.description = format!("Perjalanan dinas ke {}", trip.destination);
            event.start_distance_m = 0.0;
        }
        _ => {}
    }

    Some(event)
}
