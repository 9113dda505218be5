use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::AttendanceEvent;

/// Distance from the assigned site, in meters, at or beyond which a check-in or check-out is
/// flagged for review.
pub const MAX_SITE_DISTANCE_M: f64 = 60.0;

/// Plausibility check an attendance event failed.
///
/// Variant order is the evaluation order and the order reasons are displayed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbnormalityReason {
    StartDistanceTooFar,
    EndDistanceTooFar,
    MissingStartPhoto,
    MissingEndPhoto,
    MissingCheckout,
}

impl AbnormalityReason {
    pub const fn code(self) -> &'static str {
        match self {
            Self::StartDistanceTooFar => "start_distance_too_far",
            Self::EndDistanceTooFar => "end_distance_too_far",
            Self::MissingStartPhoto => "missing_start_photo",
            Self::MissingEndPhoto => "missing_end_photo",
            Self::MissingCheckout => "missing_checkout",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::StartDistanceTooFar => "Check-in too far from site",
            Self::EndDistanceTooFar => "Check-out too far from site",
            Self::MissingStartPhoto => "No check-in photo",
            Self::MissingEndPhoto => "No check-out photo",
            Self::MissingCheckout => "No check-out recorded",
        }
    }
}

impl fmt::Display for AbnormalityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Classify one event. An empty list means the event is normal.
pub fn classify(event: &AttendanceEvent) -> Vec<AbnormalityReason> {
    let mut reasons = Vec::new();

    if event.start_distance_m >= MAX_SITE_DISTANCE_M {
        reasons.push(AbnormalityReason::StartDistanceTooFar);
    }

    if event
        .end_distance_m
        .is_some_and(|distance| distance >= MAX_SITE_DISTANCE_M)
    {
        reasons.push(AbnormalityReason::EndDistanceTooFar);
    }

    if !event.start_photo {
        reasons.push(AbnormalityReason::MissingStartPhoto);
    }

    match event.check_out {
        Some(_) if !event.end_photo => reasons.push(AbnormalityReason::MissingEndPhoto),
        Some(_) => {}
        None => reasons.push(AbnormalityReason::MissingCheckout),
    }

    reasons
}

pub fn is_abnormal(event: &AttendanceEvent) -> bool {
    !classify(event).is_empty()
}
