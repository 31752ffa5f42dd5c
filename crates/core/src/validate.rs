//! Validation of user-supplied booking fields.
//!
//! Malformed input is rejected synchronously, before anything reaches the
//! scheduler or storage.

use thiserror::Error;

use crate::model::{ClassType, Day};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
	#[error("input cannot be empty")]
	Empty,
	#[error("invalid email format")]
	InvalidEmail,
	#[error("password must be at least 4 characters long")]
	PasswordTooShort,
	#[error("invalid day name: {0}")]
	InvalidDay(String),
	#[error("invalid hour, expected HH:MM: {0}")]
	InvalidHour(String),
	#[error("invalid class type: {0}")]
	InvalidClassType(String),
}

/// Light-weight shape check; the site is the real authority on credentials.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
	let email = email.trim();
	if email.is_empty() {
		return Err(ValidationError::Empty);
	}
	let Some((local, domain)) = email.split_once('@') else {
		return Err(ValidationError::InvalidEmail);
	};
	if local.is_empty() || domain.is_empty() || domain.contains('@') {
		return Err(ValidationError::InvalidEmail);
	}
	let Some((host, tld)) = domain.rsplit_once('.') else {
		return Err(ValidationError::InvalidEmail);
	};
	if host.is_empty() || tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
		return Err(ValidationError::InvalidEmail);
	}
	Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
	let trimmed = password.trim();
	if trimmed.is_empty() {
		return Err(ValidationError::Empty);
	}
	// Lenient: the booking site's own policy is unknown.
	if password.len() < 4 {
		return Err(ValidationError::PasswordTooShort);
	}
	Ok(())
}

/// Parses an English day name, case-insensitive.
pub fn parse_day(day: &str) -> Result<Day, ValidationError> {
	let trimmed = day.trim();
	if trimmed.is_empty() {
		return Err(ValidationError::Empty);
	}
	match trimmed.to_ascii_lowercase().as_str() {
		"monday" => Ok(Day::Monday),
		"tuesday" => Ok(Day::Tuesday),
		"wednesday" => Ok(Day::Wednesday),
		"thursday" => Ok(Day::Thursday),
		"friday" => Ok(Day::Friday),
		"saturday" => Ok(Day::Saturday),
		"sunday" => Ok(Day::Sunday),
		_ => Err(ValidationError::InvalidDay(trimmed.to_string())),
	}
}

/// Validates "HH:MM" with a 24h clock, exactly as the class cards render it.
pub fn validate_hour(hour: &str) -> Result<(), ValidationError> {
	let trimmed = hour.trim();
	if trimmed.is_empty() {
		return Err(ValidationError::Empty);
	}
	let bytes = trimmed.as_bytes();
	let well_formed = bytes.len() == 5
		&& bytes[2] == b':'
		&& bytes.iter().enumerate().all(|(i, b)| i == 2 || b.is_ascii_digit());
	if !well_formed {
		return Err(ValidationError::InvalidHour(trimmed.to_string()));
	}
	let hh: u8 = trimmed[..2].parse().map_err(|_| ValidationError::InvalidHour(trimmed.to_string()))?;
	let mm: u8 = trimmed[3..].parse().map_err(|_| ValidationError::InvalidHour(trimmed.to_string()))?;
	if hh > 23 || mm > 59 {
		return Err(ValidationError::InvalidHour(trimmed.to_string()));
	}
	Ok(())
}

/// Parses a class type from user input; accepts label text or a compact
/// lowercase alias.
pub fn parse_class_type(class_type: &str) -> Result<ClassType, ValidationError> {
	let trimmed = class_type.trim();
	if trimmed.is_empty() {
		return Err(ValidationError::Empty);
	}
	match trimmed.to_ascii_lowercase().as_str() {
		"wod" => Ok(ClassType::Wod),
		"open" | "open box" | "openbox" => Ok(ClassType::OpenBox),
		"open total" | "opentotal" => Ok(ClassType::OpenTotal),
		"hyrox" => Ok(ClassType::Hyrox),
		"gymaquinas" => Ok(ClassType::Gymaquinas),
		"pierna/gluteo" | "pierna" => Ok(ClassType::PiernaGluteo),
		"bomberos" => Ok(ClassType::Bomberos),
		_ => Err(ValidationError::InvalidClassType(trimmed.to_string())),
	}
}
