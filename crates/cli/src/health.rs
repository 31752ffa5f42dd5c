//! Minimal liveness endpoint for process supervision.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use bb_scheduler::BookingScheduler;
use tracing::{info, warn};

/// Serves `/healthz` until the task is aborted. A bind failure only disables
/// the endpoint; the daemon keeps booking.
pub async fn serve(addr: String, scheduler: BookingScheduler) {
	let app = Router::new()
		.route("/healthz", get(healthz))
		.with_state(scheduler);

	let listener = match tokio::net::TcpListener::bind(&addr).await {
		Ok(listener) => listener,
		Err(err) => {
			warn!(target = "bb", %addr, error = %err, "could not bind health endpoint");
			return;
		}
	};
	info!(target = "bb", %addr, "health endpoint listening");
	if let Err(err) = axum::serve(listener, app).await {
		warn!(target = "bb", error = %err, "health endpoint stopped");
	}
}

async fn healthz(State(scheduler): State<BookingScheduler>) -> (StatusCode, String) {
	if scheduler.is_running() {
		(StatusCode::OK, format!("ok: {}", scheduler.get_schedule_info()))
	} else {
		(StatusCode::SERVICE_UNAVAILABLE, "scheduler is not running".to_string())
	}
}
