//! Storage contract consumed by the scheduler and session manager.
//!
//! Only the contract is fixed here; backends are swappable. The in-memory
//! implementation ships with the crate and backs the test suite.

mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStorage;

use crate::model::{BookingAttempt, BookingStatus, ClassSchedule, User, UserId};

/// Persistence failures. Fatal for the operation attempted, never for the
/// process: the scheduler retries on its next weekly trigger.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("storage unavailable: {0}")]
	Unavailable(String),
	#[error("not found: {0}")]
	NotFound(String),
}

/// Contract every storage backend must satisfy.
#[async_trait]
pub trait Storage: Send + Sync {
	async fn save_user(&self, user: User) -> Result<(), StorageError>;
	async fn get_user(&self, user_id: UserId) -> Result<Option<User>, StorageError>;
	/// Appends a class schedule to the user's record.
	async fn save_class_schedule(&self, user_id: UserId, schedule: ClassSchedule) -> Result<(), StorageError>;
	async fn save_booking_attempt(&self, attempt: BookingAttempt) -> Result<(), StorageError>;
	async fn get_all_pending_bookings(&self) -> Result<Vec<BookingAttempt>, StorageError>;
	async fn update_booking_status(
		&self,
		attempt_id: &str,
		status: BookingStatus,
		error_msg: Option<String>,
	) -> Result<(), StorageError>;
}
