use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for employees as issued by the HR system of record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

/// Identifier wrapper for one attendance session (one check-in).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShiftId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TripId(pub String);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference data describing the working hours in effect for an employee on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftDefinition {
    pub id: ShiftId,
    pub name: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ShiftDefinition {
    pub fn starts_at(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.start)
    }

    /// Shifts whose end is not after their start finish on the following day.
    pub fn ends_at(&self, date: NaiveDate) -> NaiveDateTime {
        let end = date.and_time(self.end);
        if self.crosses_midnight() {
            end + Duration::days(1)
        } else {
            end
        }
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end <= self.start
    }
}

/// Approval state of an attendance event or overtime submission.
///
/// The upstream REST payloads carry this as `0`, `1`, `2`; [`ApprovalStatus::from_code`]
/// and [`ApprovalStatus::code`] translate at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Approved),
            2 => Some(Self::Rejected),
            _ => None,
        }
    }

    pub const fn code(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Approved => 1,
            Self::Rejected => 2,
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Human decision applied to a pending event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub const fn resulting_status(self) -> ApprovalStatus {
        match self {
            Self::Approved => ApprovalStatus::Approved,
            Self::Rejected => ApprovalStatus::Rejected,
        }
    }
}

/// HR annotation kinds; wire codes 1 through 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemarkKind {
    Cuti,
    IzinSakit,
    Izin,
    DinasLuar,
    LupaAbsen,
    Koreksi,
}

impl RemarkKind {
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Cuti),
            2 => Some(Self::IzinSakit),
            3 => Some(Self::Izin),
            4 => Some(Self::DinasLuar),
            5 => Some(Self::LupaAbsen),
            6 => Some(Self::Koreksi),
            _ => None,
        }
    }

    pub const fn code(self) -> u8 {
        match self {
            Self::Cuti => 1,
            Self::IzinSakit => 2,
            Self::Izin => 3,
            Self::DinasLuar => 4,
            Self::LupaAbsen => 5,
            Self::Koreksi => 6,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Cuti => "Cuti",
            Self::IzinSakit => "Izin Sakit",
            Self::Izin => "Izin",
            Self::DinasLuar => "Dinas Luar",
            Self::LupaAbsen => "Lupa Absen",
            Self::Koreksi => "Koreksi",
        }
    }

    /// Leave remarks take the date out of lateness, overtime and absence accounting.
    pub const fn is_leave(self) -> bool {
        matches!(self, Self::Cuti | Self::IzinSakit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remark {
    pub kind: RemarkKind,
    #[serde(default)]
    pub note: Option<String>,
}

/// Overtime claimed against a single attendance event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvertimeSubmission {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub total_hours: f64,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub approver: Option<String>,
    #[serde(default)]
    pub approved_at: Option<NaiveDateTime>,
}

impl OvertimeSubmission {
    pub fn total_minutes(&self) -> i64 {
        (self.total_hours * 60.0).round() as i64
    }

    pub fn counts_toward_totals(&self) -> bool {
        self.status == ApprovalStatus::Approved
    }
}

/// One employee work session as recorded by the attendance source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub id: EventId,
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub shift_id: ShiftId,
    #[serde(default)]
    pub check_in: Option<NaiveDateTime>,
    #[serde(default)]
    pub check_out: Option<NaiveDateTime>,
    pub start_distance_m: f64,
    #[serde(default)]
    pub end_distance_m: Option<f64>,
    pub start_photo: bool,
    pub end_photo: bool,
    #[serde(default)]
    pub description: String,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub remark: Option<Remark>,
    #[serde(default)]
    pub trip_id: Option<TripId>,
    #[serde(default)]
    pub overtime: Vec<OvertimeSubmission>,
}

impl AttendanceEvent {
    pub fn remark_kind(&self) -> Option<RemarkKind> {
        self.remark.as_ref().map(|remark| remark.kind)
    }

    pub fn is_on_leave(&self) -> bool {
        self.remark_kind().is_some_and(RemarkKind::is_leave)
    }

    pub fn approved_overtime_minutes(&self) -> i64 {
        self.overtime
            .iter()
            .filter(|submission| submission.counts_toward_totals())
            .map(OvertimeSubmission::total_minutes)
            .sum()
    }
}

/// Per-employee allowance eligibility maintained by HR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceFlags {
    pub transport: bool,
    pub lodging: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub nip: String,
    pub name: String,
    #[serde(default)]
    pub allowances: AllowanceFlags,
}

/// Trip record an event may be linked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRecord {
    pub id: TripId,
    pub destination: String,
    pub is_dinas: bool,
}

/// Inclusive calendar range. `start <= end` holds for every value, deserialized ones included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = InvalidDateRange;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidDateRange> {
        if start > end {
            return Err(InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn len_days(&self) -> u32 {
        let days = (self.end - self.start).num_days().saturating_add(1);
        u32::try_from(days.max(0)).unwrap_or(u32::MAX)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |day| {
            day.succ_opt().filter(|next| *next <= end)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("date range start {start} is after end {end}")]
pub struct InvalidDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Sunday is the only designated non-working day.
pub fn is_non_working_day(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sun
}
