//! Scheduler error taxonomy.

use std::time::Duration;

use bb_automation::AutomationError;
use bb_core::crypto::CryptoError;
use bb_core::{StorageError, UserId, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
	#[error("scheduler is already running")]
	AlreadyRunning,
	#[error("no registered user with id {0}")]
	UnknownUser(UserId),
	#[error(transparent)]
	Validation(#[from] ValidationError),
	#[error(transparent)]
	Storage(#[from] StorageError),
	#[error(transparent)]
	Crypto(#[from] CryptoError),
	#[error(transparent)]
	Automation(#[from] AutomationError),
	/// The attempt was cancelled while in flight. The message doubles as the
	/// persisted failure reason.
	#[error("cancelled before completion")]
	Cancelled,
	#[error("booking task deadline of {0:?} lapsed")]
	DeadlineLapsed(Duration),
}
