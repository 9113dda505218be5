use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::workflows::attendance::domain::{
    AllowanceFlags, ApprovalStatus, AttendanceEvent, DateRange, Employee, EmployeeId, EventId,
    OvertimeSubmission, Remark, RemarkKind, ShiftDefinition, ShiftId, TripId, TripRecord,
};
use crate::workflows::attendance::repository::{
    AttendanceEventSource, DecisionBatch, DecisionStore, EmployeeDirectory, RepositoryError,
    ShiftCatalog, TripRegistry,
};
use crate::workflows::attendance::service::AttendanceService;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn at(day: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    day.and_time(NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time"))
}

pub(super) fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
    DateRange::new(start, end).expect("ordered range")
}

pub(super) fn employee_id() -> EmployeeId {
    EmployeeId("emp-001".to_string())
}

pub(super) fn employee(allowances: AllowanceFlags) -> Employee {
    Employee {
        id: employee_id(),
        nip: "198703122010011004".to_string(),
        name: "Sri Wahyuni".to_string(),
        allowances,
    }
}

pub(super) fn office_shift() -> ShiftDefinition {
    ShiftDefinition {
        id: ShiftId("office".to_string()),
        name: "Pagi".to_string(),
        start: NaiveTime::from_hms_opt(8, 0, 0).expect("valid"),
        end: NaiveTime::from_hms_opt(16, 0, 0).expect("valid"),
    }
}

pub(super) fn late_shift() -> ShiftDefinition {
    ShiftDefinition {
        id: ShiftId("siang".to_string()),
        name: "Siang".to_string(),
        start: NaiveTime::from_hms_opt(13, 0, 0).expect("valid"),
        end: NaiveTime::from_hms_opt(21, 0, 0).expect("valid"),
    }
}

pub(super) fn night_shift() -> ShiftDefinition {
    ShiftDefinition {
        id: ShiftId("malam".to_string()),
        name: "Malam".to_string(),
        start: NaiveTime::from_hms_opt(22, 0, 0).expect("valid"),
        end: NaiveTime::from_hms_opt(6, 0, 0).expect("valid"),
    }
}

/// Normal, on-time, fully photographed office-hours event.
pub(super) fn event_on(id: &str, day: NaiveDate) -> AttendanceEvent {
    AttendanceEvent {
        id: EventId(id.to_string()),
        employee_id: employee_id(),
        date: day,
        shift_id: office_shift().id,
        check_in: Some(at(day, 7, 55)),
        check_out: Some(at(day, 16, 5)),
        start_distance_m: 12.0,
        end_distance_m: Some(8.5),
        start_photo: true,
        end_photo: true,
        description: "Kantor pusat".to_string(),
        status: ApprovalStatus::Approved,
        remark: None,
        trip_id: None,
        overtime: Vec::new(),
    }
}

pub(super) fn overtime(day: NaiveDate, hours: f64, status: ApprovalStatus) -> OvertimeSubmission {
    OvertimeSubmission {
        start: at(day, 16, 0),
        end: at(day, 16, 0) + chrono::Duration::minutes((hours * 60.0) as i64),
        total_hours: hours,
        status,
        approver: Some("Kepala Bagian".to_string()),
        approved_at: None,
    }
}

pub(super) fn leave(kind: RemarkKind) -> Remark {
    Remark {
        kind,
        note: Some("disetujui HR".to_string()),
    }
}

pub(super) fn dinas_trip() -> TripRecord {
    TripRecord {
        id: TripId("trip-17".to_string()),
        destination: "Surabaya".to_string(),
        is_dinas: true,
    }
}

/// Shift catalog with a default shift and per-date overrides.
#[derive(Clone)]
pub(super) struct MemoryShifts {
    pub(super) default: Option<ShiftDefinition>,
    pub(super) overrides: BTreeMap<NaiveDate, ShiftDefinition>,
}

impl MemoryShifts {
    pub(super) fn office() -> Self {
        Self {
            default: Some(office_shift()),
            overrides: BTreeMap::new(),
        }
    }

    pub(super) fn empty() -> Self {
        Self {
            default: None,
            overrides: BTreeMap::new(),
        }
    }

    pub(super) fn with_override(mut self, day: NaiveDate, shift: ShiftDefinition) -> Self {
        self.overrides.insert(day, shift);
        self
    }
}

impl ShiftCatalog for MemoryShifts {
    fn fetch_shift(
        &self,
        _employee_id: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Option<ShiftDefinition>, RepositoryError> {
        Ok(self
            .overrides
            .get(&date)
            .cloned()
            .or_else(|| self.default.clone()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    pub(super) events: Arc<Mutex<Vec<AttendanceEvent>>>,
    pub(super) employees: Arc<Mutex<HashMap<EmployeeId, Employee>>>,
    pub(super) trips: Arc<Mutex<HashMap<TripId, TripRecord>>>,
    pub(super) fail_next_apply: Arc<AtomicBool>,
    pub(super) applied_batches: Arc<Mutex<Vec<DecisionBatch>>>,
}

impl MemoryStore {
    pub(super) fn with_events(events: Vec<AttendanceEvent>) -> Self {
        let store = Self::default();
        *store.events.lock().expect("event mutex poisoned") = events;
        store.add_employee(employee(AllowanceFlags::default()));
        store
    }

    pub(super) fn add_employee(&self, employee: Employee) {
        self.employees
            .lock()
            .expect("employee mutex poisoned")
            .insert(employee.id.clone(), employee);
    }

    pub(super) fn add_trip(&self, trip: TripRecord) {
        self.trips
            .lock()
            .expect("trip mutex poisoned")
            .insert(trip.id.clone(), trip);
    }

    pub(super) fn status_of(&self, id: &str) -> ApprovalStatus {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .iter()
            .find(|event| event.id.0 == id)
            .map(|event| event.status)
            .expect("event present")
    }

    pub(super) fn batches(&self) -> Vec<DecisionBatch> {
        self.applied_batches
            .lock()
            .expect("batch mutex poisoned")
            .clone()
    }
}

impl AttendanceEventSource for MemoryStore {
    fn fetch_events(
        &self,
        employee_id: &EmployeeId,
        range: DateRange,
    ) -> Result<Vec<AttendanceEvent>, RepositoryError> {
        let guard = self.events.lock().expect("event mutex poisoned");
        Ok(guard
            .iter()
            .filter(|event| &event.employee_id == employee_id && range.contains(event.date))
            .cloned()
            .collect())
    }

    fn fetch_event(&self, id: &EventId) -> Result<Option<AttendanceEvent>, RepositoryError> {
        let guard = self.events.lock().expect("event mutex poisoned");
        Ok(guard.iter().find(|event| &event.id == id).cloned())
    }
}

impl DecisionStore for MemoryStore {
    fn apply_decisions(&self, batch: &DecisionBatch) -> Result<(), RepositoryError> {
        let mut guard = self.events.lock().expect("event mutex poisoned");
        if self.fail_next_apply.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("write timed out".to_string()));
        }

        for id in batch.approved.iter().chain(batch.rejected.iter()) {
            let event = guard
                .iter()
                .find(|event| &event.id == id)
                .ok_or_else(|| RepositoryError::NotFound(id.0.clone()))?;
            if event.status != ApprovalStatus::Pending {
                return Err(RepositoryError::StaleDecision(id.clone()));
            }
        }

        for event in guard.iter_mut() {
            if batch.approved.contains(&event.id) {
                event.status = ApprovalStatus::Approved;
            } else if batch.rejected.contains(&event.id) {
                event.status = ApprovalStatus::Rejected;
            }
        }

        self.applied_batches
            .lock()
            .expect("batch mutex poisoned")
            .push(batch.clone());
        Ok(())
    }
}

impl EmployeeDirectory for MemoryStore {
    fn fetch_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Ok(self
            .employees
            .lock()
            .expect("employee mutex poisoned")
            .get(id)
            .cloned())
    }
}

impl TripRegistry for MemoryStore {
    fn fetch_trip(&self, id: &TripId) -> Result<Option<TripRecord>, RepositoryError> {
        Ok(self
            .trips
            .lock()
            .expect("trip mutex poisoned")
            .get(id)
            .cloned())
    }
}

/// Store whose event source is down; everything else behaves like an empty store.
#[derive(Default)]
pub(super) struct UnavailableStore {
    pub(super) inner: MemoryStore,
}

impl AttendanceEventSource for UnavailableStore {
    fn fetch_events(
        &self,
        _employee_id: &EmployeeId,
        _range: DateRange,
    ) -> Result<Vec<AttendanceEvent>, RepositoryError> {
        Err(RepositoryError::Unavailable("attendance api offline".to_string()))
    }

    fn fetch_event(&self, _id: &EventId) -> Result<Option<AttendanceEvent>, RepositoryError> {
        Err(RepositoryError::Unavailable("attendance api offline".to_string()))
    }
}

impl DecisionStore for UnavailableStore {
    fn apply_decisions(&self, batch: &DecisionBatch) -> Result<(), RepositoryError> {
        self.inner.apply_decisions(batch)
    }
}

impl EmployeeDirectory for UnavailableStore {
    fn fetch_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        self.inner.fetch_employee(id)
    }
}

impl TripRegistry for UnavailableStore {
    fn fetch_trip(&self, id: &TripId) -> Result<Option<TripRecord>, RepositoryError> {
        self.inner.fetch_trip(id)
    }
}

/// Source that also returns events it should have filtered out.
pub(super) struct LeakyStore {
    pub(super) inner: MemoryStore,
    pub(super) leaked: Vec<AttendanceEvent>,
}

impl AttendanceEventSource for LeakyStore {
    fn fetch_events(
        &self,
        employee_id: &EmployeeId,
        range: DateRange,
    ) -> Result<Vec<AttendanceEvent>, RepositoryError> {
        let mut events = self.inner.fetch_events(employee_id, range)?;
        events.extend(self.leaked.iter().cloned());
        Ok(events)
    }

    fn fetch_event(&self, id: &EventId) -> Result<Option<AttendanceEvent>, RepositoryError> {
        self.inner.fetch_event(id)
    }
}

impl DecisionStore for LeakyStore {
    fn apply_decisions(&self, batch: &DecisionBatch) -> Result<(), RepositoryError> {
        self.inner.apply_decisions(batch)
    }
}

impl EmployeeDirectory for LeakyStore {
    fn fetch_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        self.inner.fetch_employee(id)
    }
}

impl TripRegistry for LeakyStore {
    fn fetch_trip(&self, id: &TripId) -> Result<Option<TripRecord>, RepositoryError> {
        self.inner.fetch_trip(id)
    }
}

/// Store where a competing decision lands between the workflow's read and its write.
pub(super) struct RacingStore {
    pub(super) inner: MemoryStore,
    competing: Mutex<Option<DecisionBatch>>,
}

impl RacingStore {
    pub(super) fn new(inner: MemoryStore, competing: DecisionBatch) -> Self {
        Self {
            inner,
            competing: Mutex::new(Some(competing)),
        }
    }
}

impl AttendanceEventSource for RacingStore {
    fn fetch_events(
        &self,
        employee_id: &EmployeeId,
        range: DateRange,
    ) -> Result<Vec<AttendanceEvent>, RepositoryError> {
        self.inner.fetch_events(employee_id, range)
    }

    fn fetch_event(&self, id: &EventId) -> Result<Option<AttendanceEvent>, RepositoryError> {
        self.inner.fetch_event(id)
    }
}

impl DecisionStore for RacingStore {
    fn apply_decisions(&self, batch: &DecisionBatch) -> Result<(), RepositoryError> {
        let competing = self
            .competing
            .lock()
            .expect("competing mutex poisoned")
            .take();
        if let Some(competing) = competing {
            self.inner.apply_decisions(&competing)?;
        }
        self.inner.apply_decisions(batch)
    }
}

pub(super) fn build_service(
    store: MemoryStore,
    shifts: MemoryShifts,
) -> (
    AttendanceService<MemoryStore, MemoryShifts>,
    Arc<MemoryStore>,
) {
    let store = Arc::new(store);
    let service = AttendanceService::new(store.clone(), Arc::new(shifts));
    (service, store)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf8 body")
}
