//! Registry of in-flight booking attempts.

use std::collections::HashMap;

use bb_core::{BookingStatus, ClassType, Day, UserId};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::warn;

use crate::cancel::CancelToken;

/// The slot one attempt targets.
#[derive(Debug, Clone)]
pub struct BookingWindow {
	pub day: Day,
	pub hour: String,
	pub class_type: ClassType,
	pub opens_at: DateTime<Utc>,
}

/// Point-in-time view of one in-flight attempt.
#[derive(Debug, Clone)]
pub struct ActiveBookingContext {
	pub user_id: UserId,
	pub attempt_id: String,
	pub window: BookingWindow,
	pub status: BookingStatus,
}

struct ActiveEntry {
	context: ActiveBookingContext,
	cancel: CancelToken,
}

/// Everything currently in flight, keyed by user. This map is the only
/// shared mutable state in the scheduler; at most one entry exists per user.
#[derive(Default)]
pub struct ActiveBookings {
	inner: RwLock<HashMap<UserId, ActiveEntry>>,
}

impl ActiveBookings {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers an attempt. An existing entry for the same user is cancelled
	/// and replaced, keeping the one-per-user invariant under races.
	pub fn register(&self, context: ActiveBookingContext, cancel: CancelToken) {
		let user_id = context.user_id;
		let displaced = self
			.inner
			.write()
			.insert(user_id, ActiveEntry { context, cancel });
		if let Some(entry) = displaced {
			entry.cancel.cancel();
			warn!(target = "bb.scheduler", %user_id, "displaced a live booking context");
		}
	}

	pub fn set_status(&self, user_id: UserId, status: BookingStatus) {
		if let Some(entry) = self.inner.write().get_mut(&user_id) {
			entry.context.status = status;
		}
	}

	pub fn remove(&self, user_id: UserId) -> Option<ActiveBookingContext> {
		self.inner.write().remove(&user_id).map(|entry| entry.context)
	}

	/// Fires the user's cancel handle and drops the entry. `false` when the
	/// user has nothing in flight; nothing is touched in that case.
	pub fn cancel(&self, user_id: UserId) -> bool {
		match self.inner.write().remove(&user_id) {
			Some(entry) => {
				entry.cancel.cancel();
				true
			}
			None => false,
		}
	}

	/// Fires every live handle and empties the registry. Used on shutdown.
	pub fn cancel_all(&self) {
		for (_, entry) in self.inner.write().drain() {
			entry.cancel.cancel();
		}
	}

	/// Point-in-time copies of every live context.
	pub fn snapshot(&self) -> Vec<ActiveBookingContext> {
		self.inner
			.read()
			.values()
			.map(|entry| entry.context.clone())
			.collect()
	}

	pub fn len(&self) -> usize {
		self.inner.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.read().is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn context(user_id: UserId, attempt_id: &str) -> ActiveBookingContext {
		ActiveBookingContext {
			user_id,
			attempt_id: attempt_id.to_string(),
			window: BookingWindow {
				day: Day::Monday,
				hour: "10:00".to_string(),
				class_type: ClassType::Wod,
				opens_at: Utc::now(),
			},
			status: BookingStatus::Active,
		}
	}

	#[test]
	fn at_most_one_entry_per_user() {
		let registry = ActiveBookings::new();
		let first = CancelToken::new();
		registry.register(context(7, "a"), first.clone());
		registry.register(context(7, "b"), CancelToken::new());

		let snapshot = registry.snapshot();
		assert_eq!(snapshot.len(), 1);
		assert_eq!(snapshot[0].attempt_id, "b");
		// The displaced attempt was told to stand down.
		assert!(first.is_cancelled());
	}

	#[test]
	fn cancel_on_absent_user_is_a_no_op() {
		let registry = ActiveBookings::new();
		registry.register(context(1, "a"), CancelToken::new());
		assert!(!registry.cancel(2));
		assert_eq!(registry.len(), 1);
	}

	#[test]
	fn cancel_fires_once_and_removes_the_entry() {
		let registry = ActiveBookings::new();
		let token = CancelToken::new();
		registry.register(context(1, "a"), token.clone());

		assert!(registry.cancel(1));
		assert!(token.is_cancelled());
		assert!(registry.snapshot().is_empty());
		// A second cancel finds nothing.
		assert!(!registry.cancel(1));
	}

	#[test]
	fn set_status_is_visible_in_snapshots() {
		let registry = ActiveBookings::new();
		registry.register(context(3, "a"), CancelToken::new());
		registry.set_status(3, BookingStatus::Success);
		assert_eq!(registry.snapshot()[0].status, BookingStatus::Success);
	}

	#[test]
	fn cancel_all_empties_the_registry() {
		let registry = ActiveBookings::new();
		let a = CancelToken::new();
		let b = CancelToken::new();
		registry.register(context(1, "a"), a.clone());
		registry.register(context(2, "b"), b.clone());

		registry.cancel_all();
		assert!(registry.is_empty());
		assert!(a.is_cancelled() && b.is_cancelled());
	}
}
