use crate::cli::ServeArgs;
use crate::demo::seed_roster;
use crate::infra::AppState;
use crate::routes::with_operational_routes;
use attendance_engine::config::AppConfig;
use attendance_engine::error::AppError;
use attendance_engine::telemetry;
use attendance_engine::workflows::attendance::AttendanceService;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let week_of = args
        .seed_week
        .unwrap_or_else(|| Local::now().date_naive());
    let (store, shifts) = seed_roster(week_of)?;
    info!(%week_of, "in-memory store seeded with demo roster");
    let service = Arc::new(AttendanceService::with_limits(
        store,
        shifts,
        config.reconciliation,
    ));

    let limits = service.limits();

    let app = with_operational_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        max_range_days = limits.max_range_days,
        "attendance engine ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
