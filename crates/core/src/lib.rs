//! Core data model and collaborator contracts for boxbooker.
//!
//! This crate is deliberately free of scheduling and browser concerns: it
//! holds the persisted types, the storage contract consumed by the scheduler
//! and session manager, the password-at-rest encryption primitive, and input
//! validation for user-supplied booking fields.

pub mod crypto;
pub mod model;
pub mod storage;
pub mod validate;

pub use model::{
	BookingAttempt, BookingStatus, ClassSchedule, ClassType, Day, SessionArtifact, SessionCookie,
	User, UserId,
};
pub use storage::{MemoryStorage, Storage, StorageError};
pub use validate::ValidationError;
