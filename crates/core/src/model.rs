//! Persisted model types shared across the scheduler and automation crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat identity of an end user. One booking pipeline runs per id.
pub type UserId = i64;

/// Day of the week as presented on the booking site's calendar tabs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Day {
	Monday,
	Tuesday,
	Wednesday,
	Thursday,
	Friday,
	Saturday,
	Sunday,
}

impl Day {
	/// The single-letter tab token the site renders for this day
	/// (Spanish initials: Lunes, Martes, miercoles=X, Jueves, Viernes,
	/// Sabado, Domingo).
	pub fn token(&self) -> &'static str {
		match self {
			Day::Monday => "L",
			Day::Tuesday => "M",
			Day::Wednesday => "X",
			Day::Thursday => "J",
			Day::Friday => "V",
			Day::Saturday => "S",
			Day::Sunday => "D",
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Day::Monday => "monday",
			Day::Tuesday => "tuesday",
			Day::Wednesday => "wednesday",
			Day::Thursday => "thursday",
			Day::Friday => "friday",
			Day::Saturday => "saturday",
			Day::Sunday => "sunday",
		}
	}
}

impl std::fmt::Display for Day {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Class types offered by the box, matched against the visible card label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClassType {
	Wod,
	OpenBox,
	OpenTotal,
	Hyrox,
	Gymaquinas,
	PiernaGluteo,
	Bomberos,
}

impl ClassType {
	/// The exact text the site displays on the class card heading.
	pub fn label(&self) -> &'static str {
		match self {
			ClassType::Wod => "Wod",
			ClassType::OpenBox => "Open box",
			ClassType::OpenTotal => "Open TOTAL",
			ClassType::Hyrox => "HYROX",
			ClassType::Gymaquinas => "GYMaquinas",
			ClassType::PiernaGluteo => "Pierna/Gluteo",
			ClassType::Bomberos => "BOMBEROS",
		}
	}
}

impl std::fmt::Display for ClassType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.label())
	}
}

/// A browser cookie captured from an authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionCookie {
	pub name: String,
	pub value: String,
	pub domain: String,
	pub path: String,
	pub expires: Option<DateTime<Utc>>,
	pub secure: bool,
	pub http_only: bool,
}

/// The persisted authentication artifact: the site's auth cookie plus the
/// login instant that produced it. Restoring it lets a client skip the full
/// login form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionArtifact {
	pub cookie: SessionCookie,
	pub last_login: DateTime<Utc>,
}

/// One weekly class a user wants booked on their behalf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassSchedule {
	pub id: String,
	pub day: Day,
	/// Time in "HH:MM" as displayed on the class card.
	pub hour: String,
	pub class_type: ClassType,
}

/// A registered end user. Credentials are stored encrypted; the session
/// artifact is refreshed by the session manager on every fresh login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
	pub user_id: UserId,
	pub email: String,
	/// AES-GCM ciphertext, base64. Decrypted only at login time.
	pub encrypted_password: String,
	pub session: Option<SessionArtifact>,
	pub session_expires_at: Option<DateTime<Utc>>,
	pub session_valid: bool,
	pub last_login: Option<DateTime<Utc>>,
	pub schedules: Vec<ClassSchedule>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl User {
	pub fn new(user_id: UserId, email: impl Into<String>, encrypted_password: impl Into<String>) -> Self {
		let now = Utc::now();
		Self {
			user_id,
			email: email.into(),
			encrypted_password: encrypted_password.into(),
			session: None,
			session_expires_at: None,
			session_valid: false,
			last_login: None,
			schedules: Vec::new(),
			created_at: now,
			updated_at: now,
		}
	}

	/// A session is usable only when the validity flag is set AND the expiry
	/// is strictly in the future. Anything else mandates a fresh login.
	pub fn has_valid_session(&self, now: DateTime<Utc>) -> bool {
		self.session_valid
			&& self.session.is_some()
			&& self.session_expires_at.is_some_and(|exp| now < exp)
	}

	pub fn update_session(&mut self, artifact: SessionArtifact, expires_at: DateTime<Utc>) {
		let now = Utc::now();
		self.last_login = Some(artifact.last_login);
		self.session = Some(artifact);
		self.session_expires_at = Some(expires_at);
		self.session_valid = true;
		self.updated_at = now;
	}

	pub fn clear_session(&mut self) {
		self.session = None;
		self.session_expires_at = None;
		self.session_valid = false;
		self.updated_at = Utc::now();
	}
}

/// Lifecycle of a persisted booking attempt. Transitions are
/// pending → active → {success, failed}; terminal statuses are final.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
	Pending,
	Active,
	Success,
	Failed,
	Expired,
}

impl BookingStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(self, BookingStatus::Success | BookingStatus::Failed | BookingStatus::Expired)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			BookingStatus::Pending => "pending",
			BookingStatus::Active => "active",
			BookingStatus::Success => "success",
			BookingStatus::Failed => "failed",
			BookingStatus::Expired => "expired",
		}
	}
}

impl std::fmt::Display for BookingStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One scheduled reservation request, mutated only by the scheduler.
/// No credentials live here; the user record is looked up by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingAttempt {
	pub id: String,
	pub user_id: UserId,
	pub day: Day,
	pub hour: String,
	pub class_type: ClassType,
	pub status: BookingStatus,
	/// The computed booking-window open instant this attempt targets.
	pub attempt_time: DateTime<Utc>,
	pub error_msg: Option<String>,
	/// Reserved for retry semantics that were never implemented upstream.
	pub retry_count: u32,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl BookingAttempt {
	pub fn new(user_id: UserId, schedule: &ClassSchedule, attempt_time: DateTime<Utc>) -> Self {
		let now = Utc::now();
		Self {
			id: format!(
				"{}-{}-{}-{}-{}",
				user_id,
				schedule.day.token(),
				schedule.hour,
				schedule.class_type.label(),
				now.timestamp()
			),
			user_id,
			day: schedule.day,
			hour: schedule.hour.clone(),
			class_type: schedule.class_type,
			status: BookingStatus::Pending,
			attempt_time,
			error_msg: None,
			retry_count: 0,
			created_at: now,
			updated_at: now,
		}
	}
}

#[cfg(test)]
mod tests {
	use chrono::TimeZone;

	use super::*;

	fn artifact(expires: Option<DateTime<Utc>>) -> SessionArtifact {
		SessionArtifact {
			cookie: SessionCookie {
				name: ".WBAuth".to_string(),
				value: "tok".to_string(),
				domain: "box.example.com".to_string(),
				path: "/".to_string(),
				expires,
				secure: true,
				http_only: true,
			},
			last_login: Utc::now(),
		}
	}

	#[test]
	fn session_valid_requires_flag_and_future_expiry() {
		let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
		let mut user = User::new(7, "a@b.com", "enc");
		assert!(!user.has_valid_session(now));

		user.update_session(artifact(None), now + chrono::Duration::hours(24));
		assert!(user.has_valid_session(now));

		// Expiry exactly at `now` is not strictly in the future.
		user.session_expires_at = Some(now);
		assert!(!user.has_valid_session(now));

		user.session_expires_at = Some(now + chrono::Duration::hours(1));
		user.session_valid = false;
		assert!(!user.has_valid_session(now));
	}

	#[test]
	fn clear_session_invalidates() {
		let now = Utc::now();
		let mut user = User::new(7, "a@b.com", "enc");
		user.update_session(artifact(None), now + chrono::Duration::hours(24));
		user.clear_session();
		assert!(!user.has_valid_session(now));
		assert!(user.session.is_none());
	}

	#[test]
	fn day_tokens_match_site_tabs() {
		assert_eq!(Day::Monday.token(), "L");
		assert_eq!(Day::Wednesday.token(), "X");
		assert_eq!(Day::Sunday.token(), "D");
	}

	#[test]
	fn new_attempt_is_pending_with_zero_retries() {
		let schedule = ClassSchedule {
			id: "s1".to_string(),
			day: Day::Monday,
			hour: "10:00".to_string(),
			class_type: ClassType::Wod,
		};
		let opens = Utc.with_ymd_and_hms(2024, 5, 4, 12, 0, 0).unwrap();
		let attempt = BookingAttempt::new(100, &schedule, opens);
		assert_eq!(attempt.status, BookingStatus::Pending);
		assert_eq!(attempt.retry_count, 0);
		assert_eq!(attempt.attempt_time, opens);
		assert!(attempt.id.starts_with("100-L-10:00-Wod-"));
	}
}
