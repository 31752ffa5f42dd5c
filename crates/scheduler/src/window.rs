//! Booking-window arithmetic.
//!
//! The site opens the coming week's slots every Saturday at 12:00 UTC. The
//! scheduler fires five minutes earlier so sessions are warm when the window
//! opens. Both functions are pure; all math is UTC.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

const OPENING_HOUR: u32 = 12;
const OPENING_MINUTE: u32 = 0;
const TRIGGER_HOUR: u32 = 11;
const TRIGGER_MINUTE: u32 = 55;

/// The next instant the booking window opens: the coming Saturday at
/// 12:00 UTC, or a week later when `now` is already at or past it.
pub fn next_opening(now: DateTime<Utc>) -> DateTime<Utc> {
	next_saturday_at(now, OPENING_HOUR, OPENING_MINUTE)
}

/// The next instant the scheduler should fire a batch.
pub fn next_trigger(now: DateTime<Utc>) -> DateTime<Utc> {
	next_saturday_at(now, TRIGGER_HOUR, TRIGGER_MINUTE)
}

fn next_saturday_at(now: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
	let days_ahead = (Weekday::Sat.num_days_from_monday() as i64
		- now.weekday().num_days_from_monday() as i64)
		.rem_euclid(7);
	let candidate = (now.date_naive() + Duration::days(days_ahead))
		.and_hms_opt(hour, minute, 0)
		.expect("constant wall-clock time is in range")
		.and_utc();
	if candidate <= now {
		candidate + Duration::days(7)
	} else {
		candidate
	}
}
