use attendance_engine::workflows::attendance::{
    ApprovalStatus, AttendanceEvent, AttendanceEventSource, DateRange, DecisionBatch,
    DecisionStore, Employee, EmployeeDirectory, EmployeeId, EventId, RepositoryError,
    ShiftCatalog, ShiftDefinition, TripId, TripRecord, TripRegistry,
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local stand-in for the HR system of record.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAttendanceStore {
    events: Arc<Mutex<HashMap<EventId, AttendanceEvent>>>,
    employees: Arc<Mutex<HashMap<EmployeeId, Employee>>>,
    trips: Arc<Mutex<HashMap<TripId, TripRecord>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".to_string()))
}

impl InMemoryAttendanceStore {
    pub(crate) fn insert_event(&self, event: AttendanceEvent) -> Result<(), RepositoryError> {
        lock(&self.events)?.insert(event.id.clone(), event);
        Ok(())
    }

    pub(crate) fn insert_employee(&self, employee: Employee) -> Result<(), RepositoryError> {
        lock(&self.employees)?.insert(employee.id.clone(), employee);
        Ok(())
    }

    pub(crate) fn insert_trip(&self, trip: TripRecord) -> Result<(), RepositoryError> {
        lock(&self.trips)?.insert(trip.id.clone(), trip);
        Ok(())
    }

    pub(crate) fn employee_ids(&self) -> Result<Vec<EmployeeId>, RepositoryError> {
        let mut ids: Vec<EmployeeId> = lock(&self.employees)?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

impl AttendanceEventSource for InMemoryAttendanceStore {
    fn fetch_events(
        &self,
        employee_id: &EmployeeId,
        range: DateRange,
    ) -> Result<Vec<AttendanceEvent>, RepositoryError> {
        let guard = lock(&self.events)?;
        let mut events: Vec<AttendanceEvent> = guard
            .values()
            .filter(|event| &event.employee_id == employee_id && range.contains(event.date))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(events)
    }

    fn fetch_event(&self, id: &EventId) -> Result<Option<AttendanceEvent>, RepositoryError> {
        Ok(lock(&self.events)?.get(id).cloned())
    }
}

impl DecisionStore for InMemoryAttendanceStore {
    fn apply_decisions(&self, batch: &DecisionBatch) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.events)?;

        // Validate the whole batch under the lock before touching any record.
        for id in batch.approved.iter().chain(batch.rejected.iter()) {
            match guard.get(id) {
                None => return Err(RepositoryError::NotFound(format!("attendance event {id}"))),
                Some(event) if event.status != ApprovalStatus::Pending => {
                    return Err(RepositoryError::StaleDecision(id.clone()))
                }
                Some(_) => {}
            }
        }

        for (ids, status) in [
            (&batch.approved, ApprovalStatus::Approved),
            (&batch.rejected, ApprovalStatus::Rejected),
        ] {
            for id in ids {
                if let Some(event) = guard.get_mut(id) {
                    event.status = status;
                }
            }
        }
        Ok(())
    }
}

impl EmployeeDirectory for InMemoryAttendanceStore {
    fn fetch_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Ok(lock(&self.employees)?.get(id).cloned())
    }
}

impl TripRegistry for InMemoryAttendanceStore {
    fn fetch_trip(&self, id: &TripId) -> Result<Option<TripRecord>, RepositoryError> {
        Ok(lock(&self.trips)?.get(id).cloned())
    }
}

/// Shift roster: one default shift plus assignments that take effect from a given date.
#[derive(Clone)]
pub(crate) struct InMemoryShiftCatalog {
    default: ShiftDefinition,
    assignments: Arc<Mutex<HashMap<EmployeeId, Vec<(NaiveDate, ShiftDefinition)>>>>,
}

impl InMemoryShiftCatalog {
    pub(crate) fn new(default: ShiftDefinition) -> Self {
        Self {
            default,
            assignments: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Switch an employee onto `shift` from `effective` onwards.
    pub(crate) fn assign(
        &self,
        employee_id: EmployeeId,
        effective: NaiveDate,
        shift: ShiftDefinition,
    ) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.assignments)?;
        let entries = guard.entry(employee_id).or_default();
        entries.push((effective, shift));
        entries.sort_by_key(|(from, _)| *from);
        Ok(())
    }
}

impl ShiftCatalog for InMemoryShiftCatalog {
    fn fetch_shift(
        &self,
        employee_id: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Option<ShiftDefinition>, RepositoryError> {
        let guard = lock(&self.assignments)?;
        let assigned = guard.get(employee_id).and_then(|entries| {
            entries
                .iter()
                .rev()
                .find(|(from, _)| *from <= date)
                .map(|(_, shift)| shift.clone())
        });
        Ok(Some(assigned.unwrap_or_else(|| self.default.clone())))
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
