//! The weekly booking scheduler: trigger loop, fan-out, attempt lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bb_core::{BookingAttempt, BookingStatus, ClassSchedule, Storage, UserId, validate};
use chrono::Utc;
use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::cancel::CancelToken;
use crate::error::SchedulerError;
use crate::registry::{ActiveBookingContext, ActiveBookings, BookingWindow};
use crate::session::SessionManager;
use crate::window;

/// Base pause before a task touches the site.
const JITTER_BASE_MS: u64 = 800;
/// Per-user spread on top of the base, keyed off the user id so the batch's
/// tasks never hit the site in lockstep.
const JITTER_SPREAD_MS: u64 = 400;
/// Hard per-attempt budget covering login, the hold until the window opens,
/// and the booking sequence itself.
const TASK_DEADLINE: Duration = Duration::from_secs(15 * 60);
/// Soft budget for the whole batch. Lapsing only logs; stragglers keep
/// running detached and record their own outcomes.
const BATCH_SOFT_DEADLINE: Duration = Duration::from_secs(10 * 60);

/// Cheap to clone; all clones drive the same scheduler.
#[derive(Clone)]
pub struct BookingScheduler {
	inner: Arc<Inner>,
}

struct Inner {
	storage: Arc<dyn Storage>,
	sessions: Arc<SessionManager>,
	active: ActiveBookings,
	running: AtomicBool,
	trigger_loop: Mutex<Option<JoinHandle<()>>>,
}

impl BookingScheduler {
	pub fn new(storage: Arc<dyn Storage>, sessions: Arc<SessionManager>) -> Self {
		Self {
			inner: Arc::new(Inner {
				storage,
				sessions,
				active: ActiveBookings::new(),
				running: AtomicBool::new(false),
				trigger_loop: Mutex::new(None),
			}),
		}
	}

	pub fn active_bookings(&self) -> &ActiveBookings {
		&self.inner.active
	}

	pub fn is_running(&self) -> bool {
		self.inner.running.load(Ordering::SeqCst)
	}

	/// Spawns the weekly trigger loop. Errors when already running.
	pub fn start(&self) -> Result<()> {
		if self.inner.running.swap(true, Ordering::SeqCst) {
			return Err(SchedulerError::AlreadyRunning);
		}
		let scheduler = self.clone();
		let handle = tokio::spawn(async move {
			loop {
				let now = Utc::now();
				let trigger_at = window::next_trigger(now);
				let pause = (trigger_at - now).to_std().unwrap_or_default();
				info!(target = "bb.scheduler", %trigger_at, "waiting for the next booking trigger");
				sleep(pause).await;
				scheduler.run_batch().await;
			}
		});
		*self.inner.trigger_loop.lock() = Some(handle);
		info!(target = "bb.scheduler", "scheduler started");
		Ok(())
	}

	/// Stops the trigger loop and cancels everything in flight.
	pub fn stop(&self) {
		if !self.inner.running.swap(false, Ordering::SeqCst) {
			return;
		}
		if let Some(handle) = self.inner.trigger_loop.lock().take() {
			handle.abort();
		}
		self.inner.active.cancel_all();
		info!(target = "bb.scheduler", "scheduler stopped");
	}

	/// Validates and persists a weekly class request plus the Pending attempt
	/// targeting the next opening. Malformed fields are rejected here, before
	/// anything reaches storage.
	pub async fn schedule_class(
		&self,
		user_id: UserId,
		day: &str,
		hour: &str,
		class_type: &str,
	) -> Result<BookingAttempt> {
		let day = validate::parse_day(day)?;
		validate::validate_hour(hour)?;
		let class_type = validate::parse_class_type(class_type)?;

		if self.inner.storage.get_user(user_id).await?.is_none() {
			return Err(SchedulerError::UnknownUser(user_id));
		}

		let opens_at = window::next_opening(Utc::now());
		let schedule = ClassSchedule {
			id: format!("{user_id}-{}-{}", day.token(), hour.trim()),
			day,
			hour: hour.trim().to_string(),
			class_type,
		};
		self.inner.storage.save_class_schedule(user_id, schedule.clone()).await?;

		let attempt = BookingAttempt::new(user_id, &schedule, opens_at);
		self.inner.storage.save_booking_attempt(attempt.clone()).await?;
		info!(
			target = "bb.scheduler",
			%user_id,
			%day,
			hour = %schedule.hour,
			class_type = %class_type,
			%opens_at,
			"class scheduled"
		);
		Ok(attempt)
	}

	/// Cancels a user's in-flight attempt. `false` when nothing is in flight.
	pub fn cancel_booking(&self, user_id: UserId) -> bool {
		let cancelled = self.inner.active.cancel(user_id);
		if cancelled {
			info!(target = "bb.scheduler", %user_id, "booking cancelled");
		}
		cancelled
	}

	/// Human-readable view of the next trigger.
	pub fn get_schedule_info(&self) -> String {
		if !self.is_running() {
			return "scheduler is not running".to_string();
		}
		format!(
			"next booking batch at {}",
			window::next_trigger(Utc::now()).format("%Y-%m-%d %H:%M:%S UTC")
		)
	}

	/// Runs one batch over every pending attempt, each in its own task. A
	/// storage failure skips the whole batch until the next trigger; per-user
	/// failures are recorded on their attempt and never abort the batch.
	pub async fn run_batch(&self) {
		let pending = match self.inner.storage.get_all_pending_bookings().await {
			Ok(pending) => pending,
			Err(err) => {
				error!(target = "bb.scheduler", error = %err, "could not load pending bookings, batch skipped");
				return;
			}
		};
		if pending.is_empty() {
			debug!(target = "bb.scheduler", "no pending bookings");
			return;
		}

		info!(target = "bb.scheduler", count = pending.len(), "booking batch started");
		let tasks: Vec<_> = pending
			.into_iter()
			.map(|attempt| {
				let scheduler = self.clone();
				tokio::spawn(async move { scheduler.process_attempt(attempt).await })
			})
			.collect();

		// Dropping the handles on expiry detaches stragglers instead of
		// aborting them; each task still records its own outcome.
		if timeout(BATCH_SOFT_DEADLINE, join_all(tasks)).await.is_err() {
			warn!(target = "bb.scheduler", "batch soft deadline lapsed with attempts still in flight");
		} else {
			info!(target = "bb.scheduler", "booking batch finished");
		}
	}

	/// Drives one attempt from Pending to a terminal status.
	async fn process_attempt(&self, attempt: BookingAttempt) {
		let user_id = attempt.user_id;
		let jitter = JITTER_BASE_MS + user_id.unsigned_abs() % JITTER_SPREAD_MS;
		sleep(Duration::from_millis(jitter)).await;

		let cancel = CancelToken::new();
		self.inner.active.register(
			ActiveBookingContext {
				user_id,
				attempt_id: attempt.id.clone(),
				window: BookingWindow {
					day: attempt.day,
					hour: attempt.hour.clone(),
					class_type: attempt.class_type,
					opens_at: attempt.attempt_time,
				},
				status: BookingStatus::Active,
			},
			cancel.clone(),
		);
		if let Err(err) = self
			.inner
			.storage
			.update_booking_status(&attempt.id, BookingStatus::Active, None)
			.await
		{
			warn!(target = "bb.scheduler", %user_id, error = %err, "could not mark attempt active");
		}

		let outcome = tokio::select! {
			() = cancel.cancelled() => Err(SchedulerError::Cancelled),
			result = timeout(TASK_DEADLINE, self.attempt_booking(&attempt)) => {
				result.unwrap_or(Err(SchedulerError::DeadlineLapsed(TASK_DEADLINE)))
			}
		};

		let (status, message) = match &outcome {
			Ok(()) => {
				info!(target = "bb.scheduler", %user_id, attempt = %attempt.id, "booking succeeded");
				(BookingStatus::Success, None)
			}
			Err(err) => {
				warn!(target = "bb.scheduler", %user_id, attempt = %attempt.id, error = %err, "booking failed");
				(BookingStatus::Failed, Some(err.to_string()))
			}
		};
		if let Err(err) = self
			.inner
			.storage
			.update_booking_status(&attempt.id, status, message)
			.await
		{
			error!(target = "bb.scheduler", %user_id, attempt = %attempt.id, error = %err, "could not record attempt outcome");
		}
		self.inner.active.remove(user_id);
	}

	async fn attempt_booking(&self, attempt: &BookingAttempt) -> Result<()> {
		let client = self.inner.sessions.ensure_session_ready(attempt.user_id).await?;

		let now = Utc::now();
		if attempt.attempt_time > now {
			let pause = (attempt.attempt_time - now).to_std().unwrap_or_default();
			debug!(
				target = "bb.scheduler",
				user_id = %attempt.user_id,
				opens_at = %attempt.attempt_time,
				"holding until the window opens"
			);
			sleep(pause).await;
		}

		client
			.book_class(attempt.day, attempt.class_type, &attempt.hour)
			.await?;
		Ok(())
	}
}
