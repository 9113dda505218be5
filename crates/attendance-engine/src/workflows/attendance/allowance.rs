use serde::{Deserialize, Serialize};

use super::approval::ContractViolation;
use super::domain::{AllowanceFlags, ApprovalStatus, AttendanceEvent, EventId, TripId, TripRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowanceKind {
    Transport,
    Lodging,
    BusinessTrip,
}

impl AllowanceKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Transport => "Transport",
            Self::Lodging => "Lodging",
            Self::BusinessTrip => "Business Trip",
        }
    }
}

/// What made the event eligible for a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum GrantBasis {
    EmployeeFlag,
    DinasTrip { trip_id: TripId, destination: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceGrant {
    pub event_id: EventId,
    pub kind: AllowanceKind,
    pub basis: GrantBasis,
}

/// Derive the supplementary allowances an approved event grants.
///
/// Only approved events may be resolved; anything else is a caller bug. A trip only counts
/// when it is the one the event links to.
pub fn resolve_grants(
    event: &AttendanceEvent,
    flags: AllowanceFlags,
    trip: Option<&TripRecord>,
) -> Result<Vec<AllowanceGrant>, ContractViolation> {
    if event.status != ApprovalStatus::Approved {
        return Err(ContractViolation::UnapprovedEvent {
            event_id: event.id.clone(),
            status: event.status,
        });
    }

    let mut grants = Vec::new();

    if flags.transport {
        grants.push(AllowanceGrant {
            event_id: event.id.clone(),
            kind: AllowanceKind::Transport,
            basis: GrantBasis::EmployeeFlag,
        });
    }

    if flags.lodging {
        grants.push(AllowanceGrant {
            event_id: event.id.clone(),
            kind: AllowanceKind::Lodging,
            basis: GrantBasis::EmployeeFlag,
        });
    }

    let linked_trip = trip.filter(|trip| event.trip_id.as_ref() == Some(&trip.id));
    if let Some(trip) = linked_trip.filter(|trip| trip.is_dinas) {
        grants.push(AllowanceGrant {
            event_id: event.id.clone(),
            kind: AllowanceKind::BusinessTrip,
            basis: GrantBasis::DinasTrip {
                trip_id: trip.id.clone(),
                destination: trip.destination.clone(),
            },
        });
    }

    Ok(grants)
}
