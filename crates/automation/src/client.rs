//! The booking-site client: a stage-ordered state machine over a [`Driver`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bb_core::{ClassType, Day, SessionArtifact, SessionCookie};
use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::api::AutomationApi;
use crate::driver::{Driver, DriverError};
use crate::error::AutomationError;
use crate::selectors;
use crate::stage::Stage;
use crate::step::{Action, Step, run_steps};
use crate::Result;

/// Shorter budget for the session-validation probe; a dead session should
/// fail fast into the fresh-login path.
const PROBE_WAIT: Duration = Duration::from_secs(10);
/// Pause between filling the form and submitting, pacing like a human.
const HUMAN_DELAY: Duration = Duration::from_secs(2);
/// Pause after the confirmation is accepted so server-side processing
/// completes before the call returns success.
const CONFIRM_SETTLE: Duration = Duration::from_secs(3);

/// Site-level configuration for one client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	pub base_url: String,
}

#[derive(Debug, Default)]
struct ClientState {
	stage: Option<Stage>,
	cookies: Vec<SessionCookie>,
}

impl ClientState {
	fn stage(&self) -> Stage {
		self.stage.unwrap_or(Stage::Unauthenticated)
	}
}

/// One user's automation context. All mutable state (current stage, captured
/// cookies) is internal; the driver underneath is never shared across users.
pub struct Client {
	driver: Arc<dyn Driver>,
	base_url: String,
	state: Mutex<ClientState>,
}

impl std::fmt::Debug for Client {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Client")
			.field("base_url", &self.base_url)
			.finish_non_exhaustive()
	}
}

impl Client {
	pub fn new(driver: Arc<dyn Driver>, config: ClientConfig) -> Self {
		Self {
			driver,
			base_url: config.base_url,
			state: Mutex::new(ClientState::default()),
		}
	}

	pub fn stage(&self) -> Stage {
		self.state.lock().stage()
	}

	fn set_stage(&self, stage: Stage) {
		self.state.lock().stage = Some(stage);
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	/// Pushes loaded cookies into the driver and probes a protected page.
	/// Ok means the site still accepts the session.
	async fn validate_loaded_session(&self) -> Result<()> {
		let cookies = self.state.lock().cookies.clone();
		for cookie in &cookies {
			self.driver
				.set_cookie(cookie)
				.await
				.map_err(|e| AutomationError::from_driver(Stage::Authenticating, e))?;
		}
		self.driver
			.goto(&self.url(selectors::SCHEDULE_PATH))
			.await
			.map_err(|e| AutomationError::from_driver(Stage::Authenticating, e))?;
		self.driver
			.wait_visible(&selectors::calendar_container(), PROBE_WAIT)
			.await
			.map_err(|e| AutomationError::from_driver(Stage::Authenticating, e))?;
		Ok(())
	}

	/// Full form-fill-and-submit sequence, then the trust-device prompt.
	async fn fresh_login(&self, email: &str, password: &str) -> Result<()> {
		let form = vec![
			Step::new(Stage::Authenticating, Action::Goto(self.url(selectors::LOGIN_PATH))),
			Step::new(Stage::Authenticating, Action::WaitVisible(selectors::login_email_input())),
			Step::new(Stage::Authenticating, Action::WaitVisible(selectors::login_password_input())),
			Step::new(Stage::Authenticating, Action::Fill(selectors::login_email_input(), email.to_string())),
			Step::new(
				Stage::Authenticating,
				Action::Fill(selectors::login_password_input(), password.to_string()),
			),
			Step::new(Stage::Authenticating, Action::Settle(HUMAN_DELAY)),
			Step::new(Stage::Authenticating, Action::Click(selectors::login_submit_button())),
		];
		run_steps(self.driver.as_ref(), &form).await?;

		// The submit button disappearing is the success signal; if the form
		// is still there after the budget the credentials were rejected.
		if let Err(err) = self
			.driver
			.wait_gone(&selectors::login_submit_button(), crate::step::DEFAULT_WAIT)
			.await
		{
			return Err(match err {
				DriverError::ElementTimeout { .. } => {
					AutomationError::CredentialsRejected { stage: Stage::Authenticating }
				}
				other => AutomationError::from_driver(Stage::Authenticating, other),
			});
		}

		let trust_prompt = vec![
			Step::new(Stage::Authenticating, Action::WaitVisible(selectors::trust_device_decline())),
			Step::new(Stage::Authenticating, Action::Click(selectors::trust_device_decline())),
			Step::new(Stage::Authenticating, Action::WaitGone(selectors::trust_device_decline())),
		];
		run_steps(self.driver.as_ref(), &trust_prompt).await
	}

	/// Pulls cookies out of the driver and extracts the auth cookie.
	async fn save_session(&self) -> Result<SessionArtifact> {
		let cookies = self
			.driver
			.cookies()
			.await
			.map_err(|e| AutomationError::from_driver(Stage::Authenticating, e))?;

		let auth = cookies
			.iter()
			.find(|c| c.name == selectors::AUTH_COOKIE_NAME && !c.value.is_empty())
			.cloned()
			.ok_or(AutomationError::MissingSessionArtifact { stage: Stage::Authenticating })?;

		self.state.lock().cookies = cookies;
		Ok(SessionArtifact { cookie: auth, last_login: Utc::now() })
	}

	/// Drops all session data, in the driver and in the client.
	pub async fn clear_session(&self) -> Result<()> {
		self.driver
			.clear_cookies()
			.await
			.map_err(|e| AutomationError::from_driver(Stage::Unauthenticated, e))?;
		let mut state = self.state.lock();
		state.cookies.clear();
		state.stage = Some(Stage::Unauthenticated);
		Ok(())
	}
}

#[async_trait]
impl AutomationApi for Client {
	async fn log_in(&self, email: &str, password: &str) -> Result<SessionArtifact> {
		self.set_stage(Stage::Authenticating);

		// Loaded session data short-circuits to a validation probe; only a
		// failed probe runs the full form sequence.
		let has_session = !self.state.lock().cookies.is_empty();
		if has_session {
			match self.validate_loaded_session().await {
				Ok(()) => {
					debug!(target = "bb.client", "session probe succeeded, skipping login form");
					self.set_stage(Stage::Authenticated);
					return self.save_session().await;
				}
				Err(err) => {
					warn!(target = "bb.client", error = %err, "session probe failed, falling back to fresh login");
				}
			}
		}

		self.fresh_login(email, password).await.inspect_err(|_| {
			self.set_stage(Stage::Failed);
		})?;

		let artifact = self.save_session().await.inspect_err(|_| {
			self.set_stage(Stage::Failed);
		})?;
		self.set_stage(Stage::Authenticated);
		info!(target = "bb.client", %email, "logged in");
		Ok(artifact)
	}

	async fn restore_session(&self, artifact: &SessionArtifact) -> Result<()> {
		self.state.lock().cookies = vec![artifact.cookie.clone()];
		self.validate_loaded_session().await.map_err(|err| {
			AutomationError::SessionRestore {
				stage: Stage::Authenticating,
				message: err.to_string(),
			}
		})?;
		self.set_stage(Stage::Authenticated);
		Ok(())
	}

	async fn book_class(&self, day: Day, class_type: ClassType, hour: &str) -> Result<()> {
		let stage = self.stage();
		if !matches!(stage, Stage::Authenticated | Stage::Confirmed) {
			return Err(AutomationError::NotAuthenticated { stage });
		}

		info!(
			target = "bb.client",
			day = %day,
			class_type = %class_type,
			%hour,
			"starting reservation sequence"
		);

		let sequence = vec![
			// Into the calendar, then forward to the week being opened.
			Step::new(Stage::NavigatingToBookingPage, Action::Click(selectors::booking_calendar_link())),
			Step::new(Stage::NavigatingToBookingPage, Action::WaitVisible(selectors::calendar_container())),
			Step::new(Stage::NavigatingToBookingPage, Action::Click(selectors::next_week_arrow())),
			// Day tab by its letter token.
			Step::new(Stage::DaySelected, Action::Settle(Duration::from_secs(1))),
			Step::new(Stage::DaySelected, Action::WaitVisible(selectors::day_tab(day.token()))),
			Step::new(Stage::DaySelected, Action::Click(selectors::day_tab(day.token()))),
			// The reserve control appearing on the matching card is the
			// slot actually opening.
			Step::new(
				Stage::AwaitingSlotOpen,
				Action::WaitVisible(selectors::reserve_button(class_type.label(), hour)),
			),
			Step::new(
				Stage::AwaitingSlotOpen,
				Action::Click(selectors::reserve_button(class_type.label(), hour)),
			),
			Step::new(Stage::AwaitingSlotOpen, Action::Settle(Duration::from_millis(100))),
			// Confirmation dialog.
			Step::new(Stage::BookingSubmitted, Action::WaitVisible(selectors::confirmation_accept())),
			Step::new(Stage::BookingSubmitted, Action::Click(selectors::confirmation_accept())),
			Step::new(Stage::BookingSubmitted, Action::Settle(CONFIRM_SETTLE)),
		];

		for step in &sequence {
			self.set_stage(step.stage);
			run_steps(self.driver.as_ref(), std::slice::from_ref(step))
				.await
				.inspect_err(|err| {
					self.set_stage(Stage::Failed);
					warn!(
						target = "bb.client",
						day = %day,
						class_type = %class_type,
						%hour,
						error = %err,
						"reservation sequence failed"
					);
				})?;
		}

		self.set_stage(Stage::Confirmed);
		info!(target = "bb.client", day = %day, class_type = %class_type, %hour, "reservation confirmed");
		Ok(())
	}

	async fn close(&self) {
		self.driver.close().await;
	}
}
