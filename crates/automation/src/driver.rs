//! Browser driver abstraction.
//!
//! Everything the client needs from a browser-like context, and nothing
//! more. The production implementation is [`crate::cdp::CdpDriver`]; tests
//! drive the client with in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;
use bb_core::SessionCookie;
use thiserror::Error;

/// How an element is located on the page. The booking site offers no stable
/// ids on its cards, so most locators are structural XPath over visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
	Css(String),
	XPath(String),
}

impl Locator {
	pub fn css(selector: impl Into<String>) -> Self {
		Locator::Css(selector.into())
	}

	pub fn xpath(expression: impl Into<String>) -> Self {
		Locator::XPath(expression.into())
	}
}

impl std::fmt::Display for Locator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Locator::Css(s) => write!(f, "css={s}"),
			Locator::XPath(x) => write!(f, "xpath={x}"),
		}
	}
}

/// Failures at the browser boundary, stage-agnostic. The step runner wraps
/// these with the stage they interrupted.
#[derive(Debug, Error)]
pub enum DriverError {
	#[error("element never appeared within {budget_ms}ms: {locator}")]
	ElementTimeout { locator: Locator, budget_ms: u64 },
	#[error("element not present: {0}")]
	ElementMissing(Locator),
	#[error("navigation failed: {0}")]
	Navigation(String),
	#[error("protocol error: {0}")]
	Protocol(String),
	#[error("browser connection closed")]
	ConnectionClosed,
}

/// One isolated browser-like automation context. A driver belongs to exactly
/// one user; no state is shared across drivers.
#[async_trait]
pub trait Driver: Send + Sync {
	/// Navigates and waits for the document to be ready.
	async fn goto(&self, url: &str) -> Result<(), DriverError>;

	/// Waits until the element is present and visible, or the budget lapses.
	async fn wait_visible(&self, locator: &Locator, budget: Duration) -> Result<(), DriverError>;

	/// Waits until no element matches, or the budget lapses.
	async fn wait_gone(&self, locator: &Locator, budget: Duration) -> Result<(), DriverError>;

	async fn click(&self, locator: &Locator) -> Result<(), DriverError>;

	/// Sets an input's value, firing the site's change handlers.
	async fn fill(&self, locator: &Locator, value: &str) -> Result<(), DriverError>;

	/// All cookies visible to the current context.
	async fn cookies(&self) -> Result<Vec<SessionCookie>, DriverError>;

	async fn set_cookie(&self, cookie: &SessionCookie) -> Result<(), DriverError>;

	async fn clear_cookies(&self) -> Result<(), DriverError>;

	/// Releases the underlying browser resources. Idempotent.
	async fn close(&self);
}
