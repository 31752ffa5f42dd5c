//! Declarative step sequences.
//!
//! Login and booking flows are lists of stage-tagged steps executed in order
//! by a generic runner. The first step that fails aborts the whole sequence
//! with the stage it was in; there is no partial success. Keeping sequences
//! as data isolates the fragile selectors from the client's control flow and
//! lets the runner be exercised against fake drivers.

use std::time::Duration;

use crate::driver::{Driver, Locator};
use crate::error::AutomationError;
use crate::stage::Stage;

/// Wait budget for any single expected element.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(30);

/// One discrete browser interaction.
#[derive(Debug, Clone)]
pub enum Action {
	Goto(String),
	WaitVisible(Locator),
	WaitGone(Locator),
	Click(Locator),
	Fill(Locator, String),
	/// Unconditional pause, for human-like pacing and server-side settling.
	Settle(Duration),
}

/// An [`Action`] tagged with the stage it belongs to.
#[derive(Debug, Clone)]
pub struct Step {
	pub stage: Stage,
	pub action: Action,
}

impl Step {
	pub fn new(stage: Stage, action: Action) -> Self {
		Self { stage, action }
	}
}

/// Runs steps in order against the driver. Automation steps are not
/// interruptible mid-step; cancellation takes effect between them via the
/// caller's surrounding deadline.
pub async fn run_steps(driver: &dyn Driver, steps: &[Step]) -> Result<(), AutomationError> {
	for step in steps {
		run_step(driver, step).await?;
	}
	Ok(())
}

async fn run_step(driver: &dyn Driver, step: &Step) -> Result<(), AutomationError> {
	let stage = step.stage;
	match &step.action {
		Action::Goto(url) => driver.goto(url).await,
		Action::WaitVisible(locator) => driver.wait_visible(locator, DEFAULT_WAIT).await,
		Action::WaitGone(locator) => driver.wait_gone(locator, DEFAULT_WAIT).await,
		Action::Click(locator) => driver.click(locator).await,
		Action::Fill(locator, value) => driver.fill(locator, value).await,
		Action::Settle(duration) => {
			tokio::time::sleep(*duration).await;
			Ok(())
		}
	}
	.map_err(|err| AutomationError::from_driver(stage, err))
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::time::Duration;

	use async_trait::async_trait;
	use bb_core::SessionCookie;
	use parking_lot::Mutex;

	use super::*;
	use crate::driver::DriverError;

	/// Records calls and fails on locators listed as missing.
	#[derive(Default)]
	struct ScriptedDriver {
		calls: Arc<Mutex<Vec<String>>>,
		missing: Vec<String>,
	}

	impl ScriptedDriver {
		fn record(&self, entry: String) {
			self.calls.lock().push(entry);
		}

		fn is_missing(&self, locator: &Locator) -> bool {
			self.missing.iter().any(|m| locator.to_string().contains(m.as_str()))
		}
	}

	#[async_trait]
	impl Driver for ScriptedDriver {
		async fn goto(&self, url: &str) -> Result<(), DriverError> {
			self.record(format!("goto {url}"));
			Ok(())
		}

		async fn wait_visible(&self, locator: &Locator, budget: Duration) -> Result<(), DriverError> {
			if self.is_missing(locator) {
				return Err(DriverError::ElementTimeout {
					locator: locator.clone(),
					budget_ms: budget.as_millis() as u64,
				});
			}
			self.record(format!("wait {locator}"));
			Ok(())
		}

		async fn wait_gone(&self, locator: &Locator, _budget: Duration) -> Result<(), DriverError> {
			self.record(format!("gone {locator}"));
			Ok(())
		}

		async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
			self.record(format!("click {locator}"));
			Ok(())
		}

		async fn fill(&self, locator: &Locator, value: &str) -> Result<(), DriverError> {
			self.record(format!("fill {locator}={value}"));
			Ok(())
		}

		async fn cookies(&self) -> Result<Vec<SessionCookie>, DriverError> {
			Ok(Vec::new())
		}

		async fn set_cookie(&self, _cookie: &SessionCookie) -> Result<(), DriverError> {
			Ok(())
		}

		async fn clear_cookies(&self) -> Result<(), DriverError> {
			Ok(())
		}

		async fn close(&self) {}
	}

	#[tokio::test]
	async fn steps_run_in_order() {
		let driver = ScriptedDriver::default();
		let calls = Arc::clone(&driver.calls);
		let steps = vec![
			Step::new(Stage::Authenticating, Action::Goto("https://x/user".to_string())),
			Step::new(Stage::Authenticating, Action::Fill(Locator::css("#email"), "a@b.com".to_string())),
			Step::new(Stage::Authenticating, Action::Click(Locator::css("#submit"))),
		];
		run_steps(&driver, &steps).await.unwrap();
		assert_eq!(
			*calls.lock(),
			vec!["goto https://x/user", "fill css=#email=a@b.com", "click css=#submit"]
		);
	}

	#[tokio::test]
	async fn first_failure_aborts_with_its_stage() {
		let driver = ScriptedDriver {
			missing: vec!["#calendar".to_string()],
			..Default::default()
		};
		let calls = Arc::clone(&driver.calls);
		let steps = vec![
			Step::new(Stage::Authenticating, Action::Goto("https://x/user".to_string())),
			Step::new(
				Stage::NavigatingToBookingPage,
				Action::WaitVisible(Locator::css("#calendar")),
			),
			Step::new(Stage::DaySelected, Action::Click(Locator::css("a.dia"))),
		];
		let err = run_steps(&driver, &steps).await.unwrap_err();
		assert_eq!(err.stage(), Stage::NavigatingToBookingPage);
		// The later step never ran.
		assert_eq!(calls.lock().len(), 1);
	}
}
