//! Automation contract consumed by the session manager and scheduler.

use async_trait::async_trait;
use bb_core::{ClassType, Day, SessionArtifact};

use crate::Result;

/// What the orchestration layer needs from one user's automation context.
/// The concrete implementation is [`crate::Client`]; tests inject stubs.
#[async_trait]
pub trait AutomationApi: Send + Sync + std::fmt::Debug {
	/// Authenticates, reusing loaded session data when the site still
	/// accepts it. Returns the session artifact to persist.
	async fn log_in(&self, email: &str, password: &str) -> Result<SessionArtifact>;

	/// Loads a stored artifact and validates it against a protected page.
	async fn restore_session(&self, artifact: &SessionArtifact) -> Result<()>;

	/// Runs the full reservation sequence. Either it completes or it fails
	/// with the stage that broke; there is no partial success.
	async fn book_class(&self, day: Day, class_type: ClassType, hour: &str) -> Result<()>;

	/// Releases browser resources. Idempotent.
	async fn close(&self);
}
