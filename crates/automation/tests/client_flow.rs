//! Client state-machine behavior against a scripted in-memory driver.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bb_automation::{
	AutomationApi, AutomationError, Client, ClientConfig, Driver, DriverError, Locator, Stage,
};
use bb_core::SessionCookie;
use parking_lot::Mutex;

const BASE_URL: &str = "https://box.example.com";

/// Scripted page: locators are "visible" when any registered marker is a
/// substring of their rendered form. Clicks and fills always land; waits
/// gate the flow exactly like a real page would.
#[derive(Default)]
struct FakeDriver {
	log: Mutex<Vec<String>>,
	browser_cookies: Mutex<Vec<SessionCookie>>,
	visible: Mutex<HashSet<&'static str>>,
	never_gone: Mutex<HashSet<&'static str>>,
}

impl FakeDriver {
	fn with_visible(markers: &[&'static str]) -> Self {
		let fake = Self::default();
		fake.visible.lock().extend(markers.iter().copied());
		fake
	}

	fn add_cookie(&self, name: &str, value: &str) {
		self.browser_cookies.lock().push(SessionCookie {
			name: name.to_string(),
			value: value.to_string(),
			domain: "box.example.com".to_string(),
			path: "/".to_string(),
			expires: None,
			secure: true,
			http_only: true,
		});
	}

	fn log_entries(&self) -> Vec<String> {
		self.log.lock().clone()
	}

	fn clear_log(&self) {
		self.log.lock().clear();
	}

	fn matches(set: &HashSet<&'static str>, locator: &Locator) -> bool {
		let rendered = locator.to_string();
		set.iter().any(|marker| rendered.contains(marker))
	}
}

#[async_trait]
impl Driver for FakeDriver {
	async fn goto(&self, url: &str) -> Result<(), DriverError> {
		self.log.lock().push(format!("goto {url}"));
		Ok(())
	}

	async fn wait_visible(&self, locator: &Locator, budget: Duration) -> Result<(), DriverError> {
		if Self::matches(&self.visible.lock(), locator) {
			self.log.lock().push(format!("wait {locator}"));
			return Ok(());
		}
		Err(DriverError::ElementTimeout {
			locator: locator.clone(),
			budget_ms: budget.as_millis() as u64,
		})
	}

	async fn wait_gone(&self, locator: &Locator, budget: Duration) -> Result<(), DriverError> {
		if Self::matches(&self.never_gone.lock(), locator) {
			return Err(DriverError::ElementTimeout {
				locator: locator.clone(),
				budget_ms: budget.as_millis() as u64,
			});
		}
		self.log.lock().push(format!("gone {locator}"));
		Ok(())
	}

	async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
		self.log.lock().push(format!("click {locator}"));
		Ok(())
	}

	async fn fill(&self, locator: &Locator, value: &str) -> Result<(), DriverError> {
		self.log.lock().push(format!("fill {locator}={value}"));
		Ok(())
	}

	async fn cookies(&self) -> Result<Vec<SessionCookie>, DriverError> {
		Ok(self.browser_cookies.lock().clone())
	}

	async fn set_cookie(&self, cookie: &SessionCookie) -> Result<(), DriverError> {
		self.log.lock().push(format!("set_cookie {}", cookie.name));
		self.browser_cookies.lock().push(cookie.clone());
		Ok(())
	}

	async fn clear_cookies(&self) -> Result<(), DriverError> {
		self.browser_cookies.lock().clear();
		Ok(())
	}

	async fn close(&self) {
		self.log.lock().push("close".to_string());
	}
}

/// Markers for a fully healthy login page plus trust prompt.
const LOGIN_PAGE: &[&str] = &["IoEmail", "IoPassword", "CtlNoSeguro", "calendar"];

fn client_over(driver: Arc<FakeDriver>) -> Client {
	Client::new(driver, ClientConfig { base_url: BASE_URL.to_string() })
}

#[tokio::test(start_paused = true)]
async fn fresh_login_extracts_auth_cookie() {
	let driver = Arc::new(FakeDriver::with_visible(LOGIN_PAGE));
	driver.add_cookie(".WBAuth", "session-token");
	let client = client_over(Arc::clone(&driver));

	let artifact = client.log_in("a@b.com", "pw").await.unwrap();
	assert_eq!(artifact.cookie.name, ".WBAuth");
	assert_eq!(artifact.cookie.value, "session-token");
	assert_eq!(client.stage(), Stage::Authenticated);

	let log = driver.log_entries();
	assert!(log[0].starts_with(&format!("goto {BASE_URL}/user")));
	assert!(log.iter().any(|e| e.contains("fill") && e.contains("IoEmail")));
	assert!(log.iter().any(|e| e.contains("click") && e.contains("CtlNoSeguro")));
}

#[tokio::test(start_paused = true)]
async fn second_login_probes_instead_of_resubmitting() {
	let driver = Arc::new(FakeDriver::with_visible(LOGIN_PAGE));
	driver.add_cookie(".WBAuth", "session-token");
	let client = client_over(Arc::clone(&driver));

	client.log_in("a@b.com", "pw").await.unwrap();
	driver.clear_log();

	client.log_in("a@b.com", "pw").await.unwrap();
	let log = driver.log_entries();

	// Validation probe only: protected page, no form interaction.
	assert!(log.iter().any(|e| e.starts_with(&format!("goto {BASE_URL}/schedule"))));
	assert!(!log.iter().any(|e| e.contains("fill")));
	assert!(!log.iter().any(|e| e.contains(&format!("goto {BASE_URL}/user"))));
}

#[tokio::test(start_paused = true)]
async fn stale_session_falls_back_to_fresh_login() {
	// Probe page lacks the calendar: the restored session is rejected.
	let driver = Arc::new(FakeDriver::with_visible(&["IoEmail", "IoPassword", "CtlNoSeguro"]));
	driver.add_cookie(".WBAuth", "fresh-token");
	let client = client_over(Arc::clone(&driver));

	let artifact = bb_core::SessionArtifact {
		cookie: SessionCookie {
			name: ".WBAuth".to_string(),
			value: "stale".to_string(),
			domain: "box.example.com".to_string(),
			path: "/".to_string(),
			expires: None,
			secure: true,
			http_only: true,
		},
		last_login: chrono::Utc::now(),
	};
	assert!(client.restore_session(&artifact).await.is_err());

	// log_in with the stale cookie loaded: probe fails, form runs.
	let got = client.log_in("a@b.com", "pw").await.unwrap();
	assert_eq!(got.cookie.value, "fresh-token");
	let log = driver.log_entries();
	assert!(log.iter().any(|e| e.contains(&format!("goto {BASE_URL}/user"))));
}

#[tokio::test(start_paused = true)]
async fn lingering_submit_button_means_rejected_credentials() {
	let driver = Arc::new(FakeDriver::with_visible(LOGIN_PAGE));
	driver.never_gone.lock().insert("CtlAceptar");
	let client = client_over(driver);

	let err = client.log_in("a@b.com", "wrong").await.unwrap_err();
	assert!(matches!(err, AutomationError::CredentialsRejected { .. }));
	assert_eq!(err.stage(), Stage::Authenticating);
	assert_eq!(client.stage(), Stage::Failed);
}

#[tokio::test(start_paused = true)]
async fn missing_auth_cookie_after_submit_is_an_error() {
	let driver = Arc::new(FakeDriver::with_visible(LOGIN_PAGE));
	// No .WBAuth cookie ever appears.
	let client = client_over(driver);

	let err = client.log_in("a@b.com", "pw").await.unwrap_err();
	assert!(matches!(err, AutomationError::MissingSessionArtifact { .. }));
}

#[tokio::test(start_paused = true)]
async fn booking_requires_authentication() {
	let driver = Arc::new(FakeDriver::default());
	let client = client_over(driver);

	let err = client
		.book_class(bb_core::Day::Monday, bb_core::ClassType::Wod, "10:00")
		.await
		.unwrap_err();
	assert!(matches!(err, AutomationError::NotAuthenticated { .. }));
}

#[tokio::test(start_paused = true)]
async fn booking_runs_the_full_ordered_sequence() {
	let driver = Arc::new(FakeDriver::with_visible(&[
		"IoEmail",
		"IoPassword",
		"CtlNoSeguro",
		"calendar",
		"dia",
		"entrenar",
		"Aceptar",
	]));
	driver.add_cookie(".WBAuth", "tok");
	let client = client_over(Arc::clone(&driver));

	client.log_in("a@b.com", "pw").await.unwrap();
	driver.clear_log();

	client
		.book_class(bb_core::Day::Tuesday, bb_core::ClassType::OpenBox, "07:00")
		.await
		.unwrap();
	assert_eq!(client.stage(), Stage::Confirmed);

	let log = driver.log_entries();
	let position = |needle: &str| {
		log.iter()
			.position(|e| e.contains(needle))
			.unwrap_or_else(|| panic!("missing log entry: {needle}"))
	};
	let calendar_link = position("Reservar clases");
	let day_tab = position("text()='M'");
	let reserve = position("entrenar");
	let confirm = position("Aceptar");
	assert!(calendar_link < day_tab && day_tab < reserve && reserve < confirm);

	// Card locator matched both the class label and the hour.
	assert!(log.iter().any(|e| e.contains("Open box") && e.contains("07:00")));
}

#[tokio::test(start_paused = true)]
async fn booking_failure_reports_the_broken_stage() {
	// Everything present except the reserve control: the slot never opens.
	let driver = Arc::new(FakeDriver::with_visible(&[
		"IoEmail",
		"IoPassword",
		"CtlNoSeguro",
		"calendar",
		"dia",
		"Aceptar",
	]));
	driver.add_cookie(".WBAuth", "tok");
	let client = client_over(Arc::clone(&driver));
	client.log_in("a@b.com", "pw").await.unwrap();

	let err = client
		.book_class(bb_core::Day::Monday, bb_core::ClassType::Wod, "10:00")
		.await
		.unwrap_err();
	assert_eq!(err.stage(), Stage::AwaitingSlotOpen);
	assert_eq!(client.stage(), Stage::Failed);
}

#[tokio::test(start_paused = true)]
async fn clear_session_resets_to_unauthenticated() {
	let driver = Arc::new(FakeDriver::with_visible(LOGIN_PAGE));
	driver.add_cookie(".WBAuth", "tok");
	let client = client_over(Arc::clone(&driver));

	client.log_in("a@b.com", "pw").await.unwrap();
	client.clear_session().await.unwrap();
	assert_eq!(client.stage(), Stage::Unauthenticated);
	assert!(driver.browser_cookies.lock().is_empty());
}
