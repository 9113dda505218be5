use serde::Serialize;

use super::abnormality::{classify, AbnormalityReason};
use super::domain::{ApprovalStatus, AttendanceEvent};

/// Pending event that failed at least one plausibility check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewItem {
    pub event: AttendanceEvent,
    pub reasons: Vec<AbnormalityReason>,
}

/// Pending abnormal events, oldest first. Normal pending events need no reviewer and are left
/// out; decided events are never listed.
pub fn review_queue<I>(events: I) -> Vec<ReviewItem>
where
    I: IntoIterator<Item = AttendanceEvent>,
{
    let mut items: Vec<ReviewItem> = events
        .into_iter()
        .filter(|event| event.status == ApprovalStatus::Pending)
        .filter_map(|event| {
            let reasons = classify(&event);
            (!reasons.is_empty()).then_some(ReviewItem { event, reasons })
        })
        .collect();

    items.sort_by(|left, right| {
        left.event
            .date
            .cmp(&right.event.date)
            .then_with(|| left.event.id.cmp(&right.event.id))
    });
    items
}
