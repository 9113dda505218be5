use std::sync::atomic::Ordering;

use super::common::*;
use crate::workflows::attendance::approval::{
    ApprovalError, ApprovalWorkflow, ContractViolation, DecisionOutcome,
};
use crate::workflows::attendance::domain::{AllowanceFlags, ApprovalStatus, Decision, EventId};
use crate::workflows::attendance::reconciliation::ReconciliationEngine;
use crate::workflows::attendance::repository::{DecisionBatch, RepositoryError};

fn pending_store() -> MemoryStore {
    let events = [
        ("evt-1", date(2024, 1, 8)),
        ("evt-2", date(2024, 1, 9)),
        ("evt-3", date(2024, 1, 10)),
    ]
    .into_iter()
    .map(|(id, day)| {
        let mut event = event_on(id, day);
        event.status = ApprovalStatus::Pending;
        event.overtime = vec![overtime(day, 1.0, ApprovalStatus::Approved)];
        event
    })
    .collect();
    MemoryStore::with_events(events)
}

fn ids(raw: &[&str]) -> Vec<EventId> {
    raw.iter().map(|id| EventId(id.to_string())).collect()
}

#[test]
fn decide_moves_pending_event_to_terminal_state() {
    let store = pending_store();
    let workflow = ApprovalWorkflow::new(&store);

    let outcome = workflow
        .decide(&EventId("evt-1".to_string()), Decision::Rejected)
        .expect("decision applies");

    assert!(outcome.was_applied());
    assert_eq!(outcome.event().status, ApprovalStatus::Rejected);
    assert_eq!(store.status_of("evt-1"), ApprovalStatus::Rejected);
    assert_eq!(store.status_of("evt-2"), ApprovalStatus::Pending);
}

#[test]
fn deciding_a_terminal_event_returns_it_unchanged() {
    let store = pending_store();
    let workflow = ApprovalWorkflow::new(&store);
    let id = EventId("evt-1".to_string());

    workflow
        .decide(&id, Decision::Approved)
        .expect("first decision applies");
    let second = workflow
        .decide(&id, Decision::Rejected)
        .expect("second decision is a no-op");

    match second {
        DecisionOutcome::Unchanged { event, transition } => {
            assert_eq!(event.status, ApprovalStatus::Approved);
            assert_eq!(transition.current, ApprovalStatus::Approved);
            assert_eq!(transition.requested, Decision::Rejected);
        }
        other => panic!("expected unchanged outcome, got {other:?}"),
    }
    assert_eq!(store.status_of("evt-1"), ApprovalStatus::Approved);
    assert_eq!(store.batches().len(), 1, "no second write is issued");
}

#[test]
fn approving_twice_does_not_double_count_overtime() {
    let store = pending_store();
    let workflow = ApprovalWorkflow::new(&store);
    let id = EventId("evt-1".to_string());

    workflow.decide(&id, Decision::Approved).expect("applies");
    workflow.decide(&id, Decision::Approved).expect("idempotent");

    let day = date(2024, 1, 8);
    let aggregate = ReconciliationEngine::new(&store, &MemoryShifts::office())
        .reconcile(&employee(AllowanceFlags::default()), range(day, day))
        .expect("reconciles");
    assert_eq!(aggregate.total_overtime, 60);
}

#[test]
fn unknown_event_is_not_found() {
    let store = pending_store();
    let workflow = ApprovalWorkflow::new(&store);

    match workflow.decide(&EventId("missing".to_string()), Decision::Approved) {
        Err(ApprovalError::Repository(RepositoryError::NotFound(_))) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn batch_applies_both_lists_and_leaves_others_pending() {
    let store = pending_store();
    let workflow = ApprovalWorkflow::new(&store);

    let outcome = workflow
        .decide_batch(&ids(&["evt-1"]), &ids(&["evt-2"]))
        .expect("batch applies");

    assert_eq!(outcome.approved, ids(&["evt-1"]));
    assert_eq!(outcome.rejected, ids(&["evt-2"]));
    assert!(outcome.unchanged.is_empty());
    assert_eq!(store.status_of("evt-1"), ApprovalStatus::Approved);
    assert_eq!(store.status_of("evt-2"), ApprovalStatus::Rejected);
    assert_eq!(store.status_of("evt-3"), ApprovalStatus::Pending);
    assert_eq!(store.batches().len(), 1, "one atomic write per batch");
    assert_eq!(store.batches()[0].len(), 2);
}

#[test]
fn overlapping_batch_is_a_contract_violation() {
    let store = pending_store();
    let workflow = ApprovalWorkflow::new(&store);

    match workflow.decide_batch(&ids(&["evt-1", "evt-2"]), &ids(&["evt-2"])) {
        Err(ApprovalError::Contract(ContractViolation::OverlappingBatch(overlap))) => {
            assert_eq!(overlap, ids(&["evt-2"]));
        }
        other => panic!("expected overlap violation, got {other:?}"),
    }
    assert_eq!(store.status_of("evt-1"), ApprovalStatus::Pending);
    assert!(store.batches().is_empty());
}

#[test]
fn failed_batch_write_leaves_every_event_pending() {
    let store = pending_store();
    store.fail_next_apply.store(true, Ordering::SeqCst);
    let workflow = ApprovalWorkflow::new(&store);

    let result = workflow.decide_batch(&ids(&["evt-1", "evt-3"]), &ids(&["evt-2"]));

    assert!(matches!(
        result,
        Err(ApprovalError::Repository(RepositoryError::Unavailable(_)))
    ));
    for id in ["evt-1", "evt-2", "evt-3"] {
        assert_eq!(store.status_of(id), ApprovalStatus::Pending);
    }

    let aggregate = ReconciliationEngine::new(&store, &MemoryShifts::office())
        .reconcile(
            &employee(AllowanceFlags::default()),
            range(date(2024, 1, 8), date(2024, 1, 10)),
        )
        .expect("reconciles");
    assert!(aggregate
        .days
        .values()
        .all(|record| record.status == ApprovalStatus::Pending));
}

#[test]
fn unknown_id_in_batch_aborts_before_any_write() {
    let store = pending_store();
    let workflow = ApprovalWorkflow::new(&store);

    let result = workflow.decide_batch(&ids(&["evt-1", "ghost"]), &[]);

    assert!(matches!(
        result,
        Err(ApprovalError::Repository(RepositoryError::NotFound(_)))
    ));
    assert_eq!(store.status_of("evt-1"), ApprovalStatus::Pending);
    assert!(store.batches().is_empty());
}

#[test]
fn batch_reports_already_decided_events_as_unchanged() {
    let store = pending_store();
    let workflow = ApprovalWorkflow::new(&store);
    workflow
        .decide(&EventId("evt-1".to_string()), Decision::Rejected)
        .expect("applies");

    let outcome = workflow
        .decide_batch(&ids(&["evt-1", "evt-2"]), &[])
        .expect("batch applies");

    assert_eq!(outcome.approved, ids(&["evt-2"]));
    assert_eq!(outcome.unchanged.len(), 1);
    assert_eq!(outcome.unchanged[0].current, ApprovalStatus::Rejected);
    assert_eq!(store.status_of("evt-1"), ApprovalStatus::Rejected);
}

#[test]
fn empty_batch_issues_no_write() {
    let store = pending_store();
    let workflow = ApprovalWorkflow::new(&store);

    let outcome = workflow.decide_batch(&[], &[]).expect("empty batch");

    assert!(outcome.approved.is_empty() && outcome.rejected.is_empty());
    assert!(store.batches().is_empty());
}

fn approval_of(raw: &[&str]) -> DecisionBatch {
    DecisionBatch {
        approved: ids(raw).into_iter().collect(),
        ..DecisionBatch::default()
    }
}

#[test]
fn decision_losing_a_race_is_reported_unchanged() {
    let store = RacingStore::new(pending_store(), approval_of(&["evt-1"]));
    let workflow = ApprovalWorkflow::new(&store);

    let outcome = workflow
        .decide(&EventId("evt-1".to_string()), Decision::Rejected)
        .expect("double submit is tolerated");

    match outcome {
        DecisionOutcome::Unchanged { event, transition } => {
            assert_eq!(event.status, ApprovalStatus::Approved);
            assert_eq!(transition.current, ApprovalStatus::Approved);
        }
        other => panic!("expected unchanged outcome, got {other:?}"),
    }
    assert_eq!(store.inner.status_of("evt-1"), ApprovalStatus::Approved);
}

#[test]
fn batch_losing_a_race_retries_with_remaining_pending_events() {
    let store = RacingStore::new(pending_store(), approval_of(&["evt-1"]));
    let workflow = ApprovalWorkflow::new(&store);

    let outcome = workflow
        .decide_batch(&ids(&["evt-1", "evt-2"]), &ids(&["evt-3"]))
        .expect("batch retries after the race");

    assert_eq!(outcome.approved, ids(&["evt-2"]));
    assert_eq!(outcome.rejected, ids(&["evt-3"]));
    assert_eq!(outcome.unchanged.len(), 1);
    assert_eq!(outcome.unchanged[0].event_id, EventId("evt-1".to_string()));
    assert_eq!(store.inner.status_of("evt-2"), ApprovalStatus::Approved);
    assert_eq!(store.inner.status_of("evt-3"), ApprovalStatus::Rejected);
    assert_eq!(
        store.inner.batches().len(),
        2,
        "competing write plus one retried batch"
    );
}

#[test]
fn status_codes_round_trip_through_wire_values() {
    for status in [
        ApprovalStatus::Pending,
        ApprovalStatus::Approved,
        ApprovalStatus::Rejected,
    ] {
        assert_eq!(ApprovalStatus::from_code(status.code()), Some(status));
    }
    assert_eq!(ApprovalStatus::from_code(7), None);
}
