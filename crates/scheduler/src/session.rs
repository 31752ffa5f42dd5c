//! Per-user automation client ownership and session lifecycle.
//!
//! One client exists per user, created lazily. Whether a stored session is
//! reused or a fresh login runs is decided here; the automation crate only
//! executes what this module asks for.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bb_automation::cdp::CdpDriver;
use bb_automation::{AutomationApi, AutomationError, Client, ClientConfig, Stage};
use bb_core::crypto::{decrypt_password, encrypt_password};
use bb_core::{Storage, User, UserId, validate};
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::Result;
use crate::error::SchedulerError;

/// Session cookies that carry no expiry of their own stay trusted this long.
const SESSION_FALLBACK_TTL_HOURS: i64 = 24;

/// Creates the automation client for one user. The production factory dials
/// the browser; tests inject stubs.
#[async_trait]
pub trait ClientFactory: Send + Sync {
	async fn create(&self, user_id: UserId) -> Result<Arc<dyn AutomationApi>>;
}

/// Production factory: one DevTools connection and isolated browser context
/// per user, wrapped in the site client.
pub struct CdpClientFactory {
	pub ws_endpoint: String,
	pub base_url: String,
}

#[async_trait]
impl ClientFactory for CdpClientFactory {
	async fn create(&self, user_id: UserId) -> Result<Arc<dyn AutomationApi>> {
		let driver = CdpDriver::connect(&self.ws_endpoint)
			.await
			.map_err(|err| AutomationError::from_driver(Stage::Unauthenticated, err))?;
		debug!(target = "bb.session", %user_id, "automation client created");
		Ok(Arc::new(Client::new(
			Arc::new(driver),
			ClientConfig { base_url: self.base_url.clone() },
		)))
	}
}

pub struct SessionManager {
	storage: Arc<dyn Storage>,
	factory: Arc<dyn ClientFactory>,
	encryption_key: String,
	clients: Mutex<HashMap<UserId, Arc<dyn AutomationApi>>>,
}

impl SessionManager {
	pub fn new(
		storage: Arc<dyn Storage>,
		factory: Arc<dyn ClientFactory>,
		encryption_key: String,
	) -> Self {
		Self {
			storage,
			factory,
			encryption_key,
			clients: Mutex::new(HashMap::new()),
		}
	}

	/// One client per user, created on first use and cached after.
	pub async fn get_or_create_client(&self, user_id: UserId) -> Result<Arc<dyn AutomationApi>> {
		let mut clients = self.clients.lock().await;
		if let Some(client) = clients.get(&user_id) {
			return Ok(Arc::clone(client));
		}
		let client = self.factory.create(user_id).await?;
		clients.insert(user_id, Arc::clone(&client));
		Ok(client)
	}

	/// Returns a client authenticated against the site. A stored session that
	/// the site still accepts is reused; a rejected or missing one falls back
	/// to a fresh login with the decrypted credentials, and the new artifact
	/// is persisted with its expiry.
	pub async fn ensure_session_ready(&self, user_id: UserId) -> Result<Arc<dyn AutomationApi>> {
		let Some(mut user) = self.storage.get_user(user_id).await? else {
			return Err(SchedulerError::UnknownUser(user_id));
		};
		let client = self.get_or_create_client(user_id).await?;

		if user.has_valid_session(Utc::now()) {
			if let Some(artifact) = user.session.clone() {
				match client.restore_session(&artifact).await {
					Ok(()) => {
						debug!(target = "bb.session", %user_id, "stored session restored");
						return Ok(client);
					}
					Err(err) => {
						// Not fatal: a rejected restore just means the site
						// invalidated the cookie early.
						warn!(
							target = "bb.session",
							%user_id,
							error = %err,
							"stored session rejected, logging in fresh"
						);
					}
				}
			}
		}

		let password = decrypt_password(&user.encrypted_password, &self.encryption_key)?;
		let artifact = client.log_in(&user.email, &password).await?;
		let expires_at = artifact
			.cookie
			.expires
			.unwrap_or_else(|| Utc::now() + Duration::hours(SESSION_FALLBACK_TTL_HOURS));
		user.update_session(artifact, expires_at);
		self.storage.save_user(user).await?;
		info!(target = "bb.session", %user_id, %expires_at, "fresh session established");
		Ok(client)
	}

	/// Registers a new user. Credentials are probed with a real login before
	/// anything is persisted, so a typo never makes it into storage.
	pub async fn register_user(&self, user_id: UserId, email: &str, password: &str) -> Result<()> {
		validate::validate_email(email)?;
		validate::validate_password(password)?;

		let client = self.get_or_create_client(user_id).await?;
		let artifact = client.log_in(email, password).await?;

		let encrypted = encrypt_password(password, &self.encryption_key)?;
		let mut user = User::new(user_id, email, encrypted);
		let expires_at = artifact
			.cookie
			.expires
			.unwrap_or_else(|| Utc::now() + Duration::hours(SESSION_FALLBACK_TTL_HOURS));
		user.update_session(artifact, expires_at);
		self.storage.save_user(user).await?;
		info!(target = "bb.session", %user_id, %email, "user registered");
		Ok(())
	}

	/// Releases one user's automation resources.
	pub async fn close_client(&self, user_id: UserId) {
		if let Some(client) = self.clients.lock().await.remove(&user_id) {
			client.close().await;
			debug!(target = "bb.session", %user_id, "automation client closed");
		}
	}

	/// Releases every client. Used on shutdown.
	pub async fn close_all(&self) {
		let clients: Vec<_> = self.clients.lock().await.drain().collect();
		for (user_id, client) in clients {
			client.close().await;
			debug!(target = "bb.session", %user_id, "automation client closed");
		}
	}
}
