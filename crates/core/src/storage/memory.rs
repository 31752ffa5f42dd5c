//! In-memory storage backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::{Storage, StorageError};
use crate::model::{BookingAttempt, BookingStatus, ClassSchedule, User, UserId};

/// HashMap-backed storage. Suitable for single-process deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
	users: RwLock<HashMap<UserId, User>>,
	attempts: RwLock<HashMap<String, BookingAttempt>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	/// Test/introspection helper: fetch one attempt by id.
	pub fn get_booking_attempt(&self, attempt_id: &str) -> Option<BookingAttempt> {
		self.attempts.read().get(attempt_id).cloned()
	}
}

#[async_trait]
impl Storage for MemoryStorage {
	async fn save_user(&self, user: User) -> Result<(), StorageError> {
		self.users.write().insert(user.user_id, user);
		Ok(())
	}

	async fn get_user(&self, user_id: UserId) -> Result<Option<User>, StorageError> {
		Ok(self.users.read().get(&user_id).cloned())
	}

	async fn save_class_schedule(&self, user_id: UserId, schedule: ClassSchedule) -> Result<(), StorageError> {
		let mut users = self.users.write();
		let user = users
			.get_mut(&user_id)
			.ok_or_else(|| StorageError::NotFound(format!("user {user_id}")))?;
		user.schedules.push(schedule);
		user.updated_at = Utc::now();
		Ok(())
	}

	async fn save_booking_attempt(&self, attempt: BookingAttempt) -> Result<(), StorageError> {
		self.attempts.write().insert(attempt.id.clone(), attempt);
		Ok(())
	}

	async fn get_all_pending_bookings(&self) -> Result<Vec<BookingAttempt>, StorageError> {
		Ok(self
			.attempts
			.read()
			.values()
			.filter(|a| a.status == BookingStatus::Pending)
			.cloned()
			.collect())
	}

	async fn update_booking_status(
		&self,
		attempt_id: &str,
		status: BookingStatus,
		error_msg: Option<String>,
	) -> Result<(), StorageError> {
		let mut attempts = self.attempts.write();
		let attempt = attempts
			.get_mut(attempt_id)
			.ok_or_else(|| StorageError::NotFound(format!("attempt {attempt_id}")))?;
		attempt.status = status;
		attempt.error_msg = error_msg;
		attempt.updated_at = Utc::now();
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use chrono::Utc;

	use super::*;
	use crate::model::{ClassType, Day};

	fn schedule() -> ClassSchedule {
		ClassSchedule {
			id: "s1".to_string(),
			day: Day::Monday,
			hour: "10:00".to_string(),
			class_type: ClassType::Wod,
		}
	}

	#[tokio::test]
	async fn pending_filter_excludes_terminal_attempts() {
		let store = MemoryStorage::new();
		let a = BookingAttempt::new(1, &schedule(), Utc::now());
		let b = BookingAttempt::new(2, &schedule(), Utc::now());
		let b_id = b.id.clone();
		store.save_booking_attempt(a).await.unwrap();
		store.save_booking_attempt(b).await.unwrap();

		store
			.update_booking_status(&b_id, BookingStatus::Failed, Some("boom".to_string()))
			.await
			.unwrap();

		let pending = store.get_all_pending_bookings().await.unwrap();
		assert_eq!(pending.len(), 1);
		assert_eq!(pending[0].user_id, 1);
	}

	#[tokio::test]
	async fn update_unknown_attempt_is_not_found() {
		let store = MemoryStorage::new();
		let err = store
			.update_booking_status("nope", BookingStatus::Active, None)
			.await
			.unwrap_err();
		assert!(matches!(err, StorageError::NotFound(_)));
	}

	#[tokio::test]
	async fn class_schedule_appends_to_user() {
		let store = MemoryStorage::new();
		store.save_user(User::new(9, "a@b.com", "enc")).await.unwrap();
		store.save_class_schedule(9, schedule()).await.unwrap();
		let user = store.get_user(9).await.unwrap().unwrap();
		assert_eq!(user.schedules.len(), 1);
	}
}
