//! [`Driver`] implementation over a dedicated DevTools session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bb_core::SessionCookie;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};
use tracing::debug;

use super::connection::CdpConnection;
use crate::driver::{Driver, DriverError, Locator};

/// How often element waits re-evaluate the page.
const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Budget for the document to become ready after navigation.
const NAV_WAIT: Duration = Duration::from_secs(30);

/// A driver bound to one page inside one incognito browser context. The
/// context is created on connect and disposed on close, so cookies and
/// storage never leak between users.
pub struct CdpDriver {
	conn: Arc<CdpConnection>,
	session_id: String,
	target_id: String,
	context_id: String,
	closed: AtomicBool,
}

impl CdpDriver {
	/// Connects to the browser and carves out an isolated context + page.
	pub async fn connect(ws_endpoint: &str) -> Result<Self, DriverError> {
		let conn = Arc::new(CdpConnection::connect(ws_endpoint).await?);

		let created = conn
			.send(None, "Target.createBrowserContext", json!({ "disposeOnDetach": true }))
			.await?;
		let context_id = str_field(&created, "browserContextId")?;

		let target = conn
			.send(
				None,
				"Target.createTarget",
				json!({ "url": "about:blank", "browserContextId": context_id }),
			)
			.await?;
		let target_id = str_field(&target, "targetId")?;

		let attached = conn
			.send(
				None,
				"Target.attachToTarget",
				json!({ "targetId": target_id, "flatten": true }),
			)
			.await?;
		let session_id = str_field(&attached, "sessionId")?;

		debug!(target = "bb.cdp", %target_id, "isolated browser context ready");

		Ok(Self {
			conn,
			session_id,
			target_id,
			context_id,
			closed: AtomicBool::new(false),
		})
	}

	async fn send(&self, method: &str, params: Value) -> Result<Value, DriverError> {
		self.conn.send(Some(&self.session_id), method, params).await
	}

	/// Evaluates a JS expression on the page and returns its value.
	async fn eval(&self, expression: &str) -> Result<Value, DriverError> {
		let result = self
			.send(
				"Runtime.evaluate",
				json!({ "expression": expression, "returnByValue": true }),
			)
			.await?;
		if let Some(details) = result.get("exceptionDetails") {
			let text = details
				.get("text")
				.and_then(Value::as_str)
				.unwrap_or("evaluation failed");
			return Err(DriverError::Protocol(text.to_string()));
		}
		Ok(result
			.pointer("/result/value")
			.cloned()
			.unwrap_or(Value::Null))
	}

	async fn eval_bool(&self, expression: &str) -> Result<bool, DriverError> {
		Ok(self.eval(expression).await?.as_bool().unwrap_or(false))
	}

	/// Polls a boolean expression until true or the budget lapses.
	async fn poll_until(
		&self,
		expression: &str,
		budget: Duration,
		locator: &Locator,
	) -> Result<(), DriverError> {
		let deadline = Instant::now() + budget;
		loop {
			if self.eval_bool(expression).await? {
				return Ok(());
			}
			if Instant::now() >= deadline {
				return Err(DriverError::ElementTimeout {
					locator: locator.clone(),
					budget_ms: budget.as_millis() as u64,
				});
			}
			sleep(POLL_INTERVAL).await;
		}
	}
}

#[async_trait]
impl Driver for CdpDriver {
	async fn goto(&self, url: &str) -> Result<(), DriverError> {
		let result = self.send("Page.navigate", json!({ "url": url })).await?;
		if let Some(text) = result.get("errorText").and_then(Value::as_str) {
			return Err(DriverError::Navigation(text.to_string()));
		}
		let ready = "document.readyState === 'interactive' || document.readyState === 'complete'";
		self.poll_until(ready, NAV_WAIT, &Locator::css("document")).await
	}

	async fn wait_visible(&self, locator: &Locator, budget: Duration) -> Result<(), DriverError> {
		self.poll_until(&visible_expression(locator), budget, locator).await
	}

	async fn wait_gone(&self, locator: &Locator, budget: Duration) -> Result<(), DriverError> {
		let expression = format!("({}) === null", find_expression(locator));
		self.poll_until(&expression, budget, locator).await
	}

	async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
		let expression = format!(
			"(() => {{ const el = {}; if (!el) return false; el.click(); return true; }})()",
			find_expression(locator)
		);
		if !self.eval_bool(&expression).await? {
			return Err(DriverError::ElementMissing(locator.clone()));
		}
		Ok(())
	}

	async fn fill(&self, locator: &Locator, value: &str) -> Result<(), DriverError> {
		let expression = format!(
			"(() => {{ const el = {find}; if (!el) return false; el.focus(); el.value = {value}; \
			el.dispatchEvent(new Event('input', {{bubbles: true}})); \
			el.dispatchEvent(new Event('change', {{bubbles: true}})); return true; }})()",
			find = find_expression(locator),
			value = js_string(value),
		);
		if !self.eval_bool(&expression).await? {
			return Err(DriverError::ElementMissing(locator.clone()));
		}
		Ok(())
	}

	async fn cookies(&self) -> Result<Vec<SessionCookie>, DriverError> {
		let result = self.send("Network.getCookies", json!({})).await?;
		let cookies = result
			.get("cookies")
			.and_then(Value::as_array)
			.map(|list| list.iter().filter_map(parse_cookie).collect())
			.unwrap_or_default();
		Ok(cookies)
	}

	async fn set_cookie(&self, cookie: &SessionCookie) -> Result<(), DriverError> {
		let mut params = json!({
			"name": cookie.name,
			"value": cookie.value,
			"domain": cookie.domain,
			"path": cookie.path,
			"secure": cookie.secure,
			"httpOnly": cookie.http_only,
		});
		if let Some(expires) = cookie.expires {
			params["expires"] = json!(expires.timestamp());
		}
		let result = self.send("Network.setCookie", params).await?;
		if result.get("success").and_then(Value::as_bool) == Some(false) {
			return Err(DriverError::Protocol(format!("cookie {} was not set", cookie.name)));
		}
		Ok(())
	}

	async fn clear_cookies(&self) -> Result<(), DriverError> {
		self.send("Network.clearBrowserCookies", json!({})).await?;
		Ok(())
	}

	async fn close(&self) {
		if self.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		let _ = self
			.conn
			.send(None, "Target.closeTarget", json!({ "targetId": self.target_id }))
			.await;
		let _ = self
			.conn
			.send(
				None,
				"Target.disposeBrowserContext",
				json!({ "browserContextId": self.context_id }),
			)
			.await;
		self.conn.close();
	}
}

/// JS expression resolving a locator to an element (or null).
fn find_expression(locator: &Locator) -> String {
	match locator {
		Locator::Css(selector) => format!("document.querySelector({})", js_string(selector)),
		Locator::XPath(expression) => format!(
			"document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
			js_string(expression)
		),
	}
}

/// JS expression that is true while the element is present and rendered.
fn visible_expression(locator: &Locator) -> String {
	format!(
		"(() => {{ const el = {}; return !!(el && (el.offsetWidth || el.offsetHeight || el.getClientRects().length)); }})()",
		find_expression(locator)
	)
}

/// Embeds a Rust string as a JS string literal. JSON escaping handles the
/// quotes XPath expressions are full of.
fn js_string(value: &str) -> String {
	serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn parse_cookie(value: &Value) -> Option<SessionCookie> {
	let expires = value
		.get("expires")
		.and_then(Value::as_f64)
		.filter(|ts| *ts > 0.0)
		.and_then(|ts| DateTime::<Utc>::from_timestamp(ts as i64, 0));
	Some(SessionCookie {
		name: value.get("name")?.as_str()?.to_string(),
		value: value.get("value")?.as_str()?.to_string(),
		domain: value.get("domain").and_then(Value::as_str).unwrap_or_default().to_string(),
		path: value.get("path").and_then(Value::as_str).unwrap_or("/").to_string(),
		expires,
		secure: value.get("secure").and_then(Value::as_bool).unwrap_or(false),
		http_only: value.get("httpOnly").and_then(Value::as_bool).unwrap_or(false),
	})
}

fn str_field(value: &Value, field: &str) -> Result<String, DriverError> {
	value
		.get(field)
		.and_then(Value::as_str)
		.map(str::to_string)
		.ok_or_else(|| DriverError::Protocol(format!("missing {field} in devtools response")))
}
