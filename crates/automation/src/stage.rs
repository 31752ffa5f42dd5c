//! Automation stages, used both as the client's state machine position and
//! as the tag on every automation error.

use serde::{Deserialize, Serialize};

/// Position in the login/booking sequence. Errors carry the stage that was
/// being attempted when the expected element never appeared.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	Unauthenticated,
	Authenticating,
	Authenticated,
	NavigatingToBookingPage,
	DaySelected,
	AwaitingSlotOpen,
	BookingSubmitted,
	Confirmed,
	Failed,
}

impl Stage {
	pub fn as_str(&self) -> &'static str {
		match self {
			Stage::Unauthenticated => "unauthenticated",
			Stage::Authenticating => "authenticating",
			Stage::Authenticated => "authenticated",
			Stage::NavigatingToBookingPage => "navigating_to_booking_page",
			Stage::DaySelected => "day_selected",
			Stage::AwaitingSlotOpen => "awaiting_slot_open",
			Stage::BookingSubmitted => "booking_submitted",
			Stage::Confirmed => "confirmed",
			Stage::Failed => "failed",
		}
	}
}

impl std::fmt::Display for Stage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
