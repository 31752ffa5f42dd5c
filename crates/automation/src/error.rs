//! Automation error taxonomy.

use thiserror::Error;

use crate::driver::{DriverError, Locator};
use crate::stage::Stage;

/// A failed automation call. Always carries the stage that was executing so
/// the recorded booking failure names where the sequence broke.
#[derive(Debug, Error)]
pub enum AutomationError {
	#[error("{stage}: element never appeared within {budget_ms}ms: {locator}")]
	ElementTimeout {
		stage: Stage,
		locator: Locator,
		budget_ms: u64,
	},
	#[error("{stage}: login form rejected the credentials")]
	CredentialsRejected { stage: Stage },
	#[error("{stage}: no session artifact produced after login")]
	MissingSessionArtifact { stage: Stage },
	#[error("{stage}: session restore failed: {message}")]
	SessionRestore { stage: Stage, message: String },
	#[error("{stage}: booking attempted without an authenticated session")]
	NotAuthenticated { stage: Stage },
	#[error("{stage}: browser driver failed: {source}")]
	Driver {
		stage: Stage,
		#[source]
		source: DriverError,
	},
}

impl AutomationError {
	/// The stage the sequence was in when it failed.
	pub fn stage(&self) -> Stage {
		match self {
			AutomationError::ElementTimeout { stage, .. }
			| AutomationError::CredentialsRejected { stage }
			| AutomationError::MissingSessionArtifact { stage }
			| AutomationError::SessionRestore { stage, .. }
			| AutomationError::NotAuthenticated { stage }
			| AutomationError::Driver { stage, .. } => *stage,
		}
	}

	/// Wraps a driver failure with the stage it interrupted, keeping element
	/// timeouts as their own variant so callers can tell "slot never opened"
	/// from protocol breakage.
	pub fn from_driver(stage: Stage, err: DriverError) -> Self {
		match err {
			DriverError::ElementTimeout { locator, budget_ms } => {
				AutomationError::ElementTimeout { stage, locator, budget_ms }
			}
			other => AutomationError::Driver { stage, source: other },
		}
	}
}
