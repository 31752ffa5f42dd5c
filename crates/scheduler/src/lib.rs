//! Booking scheduler and session manager.
//!
//! [`scheduler`] owns the weekly trigger loop and the concurrent fan-out over
//! pending attempts, [`session`] owns one automation client per user and the
//! reuse-or-relogin decision, [`registry`] tracks what is in flight, and
//! [`window`] is the pure arithmetic for when slots open.

pub mod cancel;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod window;

pub use cancel::CancelToken;
pub use error::SchedulerError;
pub use registry::{ActiveBookingContext, ActiveBookings, BookingWindow};
pub use scheduler::BookingScheduler;
pub use session::{CdpClientFactory, ClientFactory, SessionManager};

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, SchedulerError>;
