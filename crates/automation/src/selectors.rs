//! The site's markup contract, in one place.
//!
//! Every selector here is an implicit wire format with the booking site's
//! pages: form field ids, the confirmation dialog heading, and the CSS
//! classes of the repeating class-card layout. Card and day locators match
//! on visible text of siblings rather than opaque ids, which tolerates
//! unrelated layout churn but breaks if labels or card structure change.

use crate::driver::Locator;

/// Path of the login form, relative to the base URL.
pub const LOGIN_PATH: &str = "/user";
/// Protected page used to probe whether a restored session is still accepted.
pub const SCHEDULE_PATH: &str = "/schedule";

/// Name of the cookie that carries the authenticated session.
pub const AUTH_COOKIE_NAME: &str = ".WBAuth";

/// Heading text of the booking confirmation dialog.
pub const CONFIRMATION_HEADING: &str = "Confirmación Requerida";

pub fn login_email_input() -> Locator {
	Locator::xpath(r#"//input[@id="body_body_CtlLogin_IoEmail"]"#)
}

pub fn login_password_input() -> Locator {
	Locator::xpath(r#"//input[@id="body_body_CtlLogin_IoPassword"]"#)
}

pub fn login_submit_button() -> Locator {
	Locator::xpath(r#"//input[@id="body_body_CtlLogin_CtlAceptar"]"#)
}

/// Post-login "remember this device" prompt; declining keeps the session
/// cookie scoped to this browser context only.
pub fn trust_device_decline() -> Locator {
	Locator::xpath(r#"//input[@id="body_body_CtlConfiar_CtlNoSeguro"]"#)
}

/// Link from the member area into the booking calendar.
pub fn booking_calendar_link() -> Locator {
	Locator::xpath("//a[contains(text(), 'Reservar clases')]")
}

pub fn calendar_container() -> Locator {
	Locator::xpath(r#"//div[@id="calendar"]"#)
}

/// Arrow advancing the calendar to the week being opened for booking.
pub fn next_week_arrow() -> Locator {
	Locator::css("a.next.icon")
}

/// Day tab carrying the single-letter day token (L, M, X, J, V, S, D).
pub fn day_tab(token: &str) -> Locator {
	Locator::xpath(format!(
		r#"//a[@class="dia" or contains(@class, "current")]/span[text()='{token}']/parent::a"#
	))
}

/// Reserve control of the one card whose class-type heading and hour text
/// both match. Card structure: div.clase > … > div.namehour holding
/// h3.entrenamiento (type) and div.hora (hour); the button lives in a
/// sibling actions container.
pub fn reserve_button(class_label: &str, hour: &str) -> Locator {
	Locator::xpath(format!(
		"//div[contains(@class, 'clase')]\
		//div[@class='namehour']\
		[.//h3[contains(@class, 'entrenamiento') and contains(normalize-space(text()), '{class_label}')] \
		and .//div[@class='hora' and text()='{hour}']]\
		/ancestor::div[contains(@class, 'clase')]\
		//button[contains(@class, 'entrenar') and contains(., 'Reservar')]"
	))
}

/// Accept button inside the confirmation dialog, anchored on the heading.
pub fn confirmation_accept() -> Locator {
	Locator::xpath(format!(
		"//div[h4[text()='{CONFIRMATION_HEADING}']]\
		//button[contains(@class, 'button small radius') and text()='Aceptar']"
	))
}
