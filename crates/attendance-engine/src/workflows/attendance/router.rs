use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::approval::ApprovalError;
use super::domain::{DateRange, Decision, EmployeeId, EventId};
use super::reconciliation::DataFetchError;
use super::repository::{RepositoryError, ShiftCatalog};
use super::service::{AttendanceRepository, AttendanceService, AttendanceServiceError};

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
}

#[derive(Debug, Deserialize)]
pub struct BatchDecisionRequest {
    #[serde(default)]
    pub approved_ids: Vec<EventId>,
    #[serde(default)]
    pub rejected_ids: Vec<EventId>,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub employee_ids: Vec<EmployeeId>,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Router builder exposing reconciliation, review, approval, allowance and export endpoints.
pub fn attendance_router<R, C>(service: Arc<AttendanceService<R, C>>) -> Router
where
    R: AttendanceRepository + 'static,
    C: ShiftCatalog + 'static,
{
    Router::new()
        .route(
            "/api/v1/attendance/employees/:employee_id/reconciliation",
            get(reconciliation_handler::<R, C>),
        )
        .route(
            "/api/v1/attendance/employees/:employee_id/review",
            get(review_handler::<R, C>),
        )
        .route(
            "/api/v1/attendance/events/:event_id/decision",
            post(decision_handler::<R, C>),
        )
        .route(
            "/api/v1/attendance/events/:event_id/allowances",
            get(allowance_handler::<R, C>),
        )
        .route(
            "/api/v1/attendance/decisions",
            post(batch_decision_handler::<R, C>),
        )
        .route("/api/v1/attendance/export", post(export_handler::<R, C>))
        .with_state(service)
}

pub(crate) async fn reconciliation_handler<R, C>(
    State(service): State<Arc<AttendanceService<R, C>>>,
    Path(employee_id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Response
where
    R: AttendanceRepository + 'static,
    C: ShiftCatalog + 'static,
{
    let range = match DateRange::new(query.from, query.to) {
        Ok(range) => range,
        Err(err) => return bad_request(err.to_string()),
    };

    match service.reconcile(&EmployeeId(employee_id), range) {
        Ok(aggregate) => (StatusCode::OK, Json(aggregate)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn review_handler<R, C>(
    State(service): State<Arc<AttendanceService<R, C>>>,
    Path(employee_id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Response
where
    R: AttendanceRepository + 'static,
    C: ShiftCatalog + 'static,
{
    let range = match DateRange::new(query.from, query.to) {
        Ok(range) => range,
        Err(err) => return bad_request(err.to_string()),
    };

    match service.review_queue(&EmployeeId(employee_id), range) {
        Ok(queue) => (StatusCode::OK, Json(queue)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn decision_handler<R, C>(
    State(service): State<Arc<AttendanceService<R, C>>>,
    Path(event_id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Response
where
    R: AttendanceRepository + 'static,
    C: ShiftCatalog + 'static,
{
    match service.decide(&EventId(event_id), request.decision) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn batch_decision_handler<R, C>(
    State(service): State<Arc<AttendanceService<R, C>>>,
    Json(request): Json<BatchDecisionRequest>,
) -> Response
where
    R: AttendanceRepository + 'static,
    C: ShiftCatalog + 'static,
{
    match service.decide_batch(&request.approved_ids, &request.rejected_ids) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn allowance_handler<R, C>(
    State(service): State<Arc<AttendanceService<R, C>>>,
    Path(event_id): Path<String>,
) -> Response
where
    R: AttendanceRepository + 'static,
    C: ShiftCatalog + 'static,
{
    match service.allowances(&EventId(event_id)) {
        Ok(grants) => (StatusCode::OK, Json(grants)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn export_handler<R, C>(
    State(service): State<Arc<AttendanceService<R, C>>>,
    Json(request): Json<ExportRequest>,
) -> Response
where
    R: AttendanceRepository + 'static,
    C: ShiftCatalog + 'static,
{
    let range = match DateRange::new(request.from, request.to) {
        Ok(range) => range,
        Err(err) => return bad_request(err.to_string()),
    };

    let csv = service
        .export(&request.employee_ids, range)
        .and_then(|sheet| sheet.to_csv_string().map_err(AttendanceServiceError::from));

    match csv {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Map service failures onto HTTP statuses; fetch failures are reported as retryable.
pub(crate) fn error_response(err: AttendanceServiceError) -> Response {
    let status = match &err {
        AttendanceServiceError::DataFetch(DataFetchError::Source(
            RepositoryError::Unavailable(_),
        )) => StatusCode::SERVICE_UNAVAILABLE,
        AttendanceServiceError::DataFetch(_) => StatusCode::BAD_GATEWAY,
        AttendanceServiceError::UnknownEmployee(_)
        | AttendanceServiceError::Repository(RepositoryError::NotFound(_))
        | AttendanceServiceError::Approval(ApprovalError::Repository(RepositoryError::NotFound(
            _,
        ))) => StatusCode::NOT_FOUND,
        AttendanceServiceError::Contract(_)
        | AttendanceServiceError::Approval(ApprovalError::Contract(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AttendanceServiceError::Approval(ApprovalError::Repository(
            RepositoryError::StaleDecision(_),
        )) => StatusCode::CONFLICT,
        AttendanceServiceError::RangeTooLong { .. } => StatusCode::BAD_REQUEST,
        AttendanceServiceError::Repository(RepositoryError::Unavailable(_))
        | AttendanceServiceError::Approval(ApprovalError::Repository(
            RepositoryError::Unavailable(_),
        )) => StatusCode::SERVICE_UNAVAILABLE,
        AttendanceServiceError::Repository(_)
        | AttendanceServiceError::Approval(_)
        | AttendanceServiceError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let retryable = matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE
    );
    let payload = json!({
        "error": err.to_string(),
        "retryable": retryable,
    });
    (status, Json(payload)).into_response()
}
