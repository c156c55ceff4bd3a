//! Input validation utilities for the backend service layer.
//!
//! Every check reports a field-level `ValidationErrors` so clients can map
//! failures back onto form inputs. `FieldErrors` collects several checks and
//! reports them together.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;

use crate::error::{Error, Result, ValidationErrors};

/// Mexican phone numbers: optional `+52`, optional two-digit area code, eight digits.
const MEXICAN_PHONE_PATTERN: &str = r"^(\+52\s?)?(\d{2}\s?)?\d{8}$";

static MEXICAN_PHONE: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(MEXICAN_PHONE_PATTERN));

fn invalid(field: &str, message: impl Into<String>) -> Error {
    Error::Validation(ValidationErrors::field(field, message))
}

/// Accumulates field errors across several checks.
///
/// # Examples
/// ```
/// use backend::validation::{FieldErrors, validate_email, validate_person_name};
///
/// let mut errors = FieldErrors::default();
/// errors.check(validate_email("email", "not-an-email"));
/// errors.check(validate_person_name("first_name", "Ana"));
/// assert!(errors.finish().is_err());
/// ```
#[derive(Debug, Default)]
pub struct FieldErrors {
    fields: HashMap<String, String>,
    /// First non-validation failure (oversized upload, storage error).
    other: Option<Error>,
}

impl FieldErrors {
    /// Records the outcome of a check.
    pub fn check(&mut self, result: Result<()>) {
        match result {
            Ok(()) => {}
            Err(Error::Validation(ValidationErrors::Single { field, message })) => {
                self.fields.entry(field).or_insert(message);
            }
            Err(Error::Validation(ValidationErrors::Multiple { fields })) => {
                for (field, message) in fields {
                    self.fields.entry(field).or_insert(message);
                }
            }
            Err(other) => {
                self.other.get_or_insert(other);
            }
        }
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields.entry(field.to_string()).or_insert(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.other.is_none()
    }

    /// Non-validation failures win over field errors and keep their own status.
    pub fn finish(self) -> Result<()> {
        if let Some(other) = self.other {
            return Err(other);
        }
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(ValidationErrors::Multiple { fields: self.fields }))
        }
    }
}

/// Validates email format using comprehensive checks
///
/// # Examples
/// ```
/// use backend::validation::validate_email;
///
/// validate_email("email", "user@example.com").unwrap(); // Valid
/// assert!(validate_email("email", "invalid-email").is_err());
/// ```
pub fn validate_email(field: &str, email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(invalid(field, "Email is required"));
    }

    if email.len() > 255 {
        return Err(invalid(field, "Email is too long (max 255 characters)"));
    }

    let Some((local_part, domain)) = email.split_once('@') else {
        return Err(invalid(field, "Invalid email format"));
    };

    if local_part.is_empty() || local_part.len() > 64 || domain.contains('@') {
        return Err(invalid(field, "Invalid email format"));
    }

    if domain.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid(field, "Invalid email domain"));
    }

    if email.contains("..") {
        return Err(invalid(field, "Email cannot contain consecutive dots"));
    }

    let invalid_chars = ['<', '>', '(', ')', '[', ']', '\\', ',', ';', ':', '"', ' '];
    if let Some(c) = email.chars().find(|c| invalid_chars.contains(c)) {
        return Err(invalid(field, format!("Email cannot contain '{}'", c)));
    }

    Ok(())
}

/// First or last name: 2-100 characters, letters (accents included) and spaces only.
pub fn validate_person_name(field: &str, name: &str) -> Result<()> {
    let name = name.trim();
    let length = name.chars().count();

    if length < 2 || length > 100 {
        return Err(invalid(field, "Must be between 2 and 100 characters"));
    }

    if !name.chars().all(|c| c.is_alphabetic() || c == ' ') {
        return Err(invalid(field, "Can only contain letters and spaces"));
    }

    Ok(())
}

/// Registration password: 6-100 characters with a lowercase, an uppercase letter and a digit.
pub fn validate_password(field: &str, password: &str) -> Result<()> {
    let length = password.chars().count();
    if length < 6 || length > 100 {
        return Err(invalid(field, "Password must be between 6 and 100 characters"));
    }

    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !(has_lower && has_upper && has_digit) {
        return Err(invalid(
            field,
            "Password must contain at least one lowercase letter, one uppercase letter and one number",
        ));
    }

    Ok(())
}

/// Scores a password from 0 to 5: length >= 6, lowercase, uppercase, digit, special character.
pub fn password_strength(password: &str) -> u8 {
    [
        password.chars().count() >= 6,
        password.chars().any(|c| c.is_lowercase()),
        password.chars().any(|c| c.is_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_alphanumeric()),
    ]
    .iter()
    .filter(|met| **met)
    .count() as u8
}

/// Password chosen through the reset flow must score at least 3.
pub fn validate_reset_password(field: &str, password: &str) -> Result<()> {
    if password_strength(password) < 3 {
        return Err(invalid(
            field,
            "Password is too weak: use at least 6 characters mixing upper and lower case, numbers or symbols",
        ));
    }
    Ok(())
}

/// Mexican phone number, spaces and dashes ignored.
pub fn validate_mexican_phone(field: &str, phone: &str) -> Result<()> {
    let regex = MEXICAN_PHONE
        .as_ref()
        .map_err(|e| Error::Internal(format!("Invalid phone pattern: {}", e)))?;

    let compact: String = phone
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect();
    if !regex.is_match(&compact) {
        return Err(invalid(field, "Invalid phone number format"));
    }
    Ok(())
}

/// Contact phone: 10-15 digits once formatting characters are removed.
pub fn validate_contact_phone(field: &str, phone: &str) -> Result<()> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !(10..=15).contains(&digits) {
        return Err(invalid(field, "Phone number must have between 10 and 15 digits"));
    }
    Ok(())
}

pub fn validate_max_length(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(invalid(field, format!("Must be at most {} characters", max)));
    }
    Ok(())
}

pub fn validate_length_between(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let length = value.trim().chars().count();
    if length < min || length > max {
        return Err(invalid(field, format!("Must be between {} and {} characters", min, max)));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + Display>(field: &str, value: T, min: T, max: T) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(field, format!("Must be between {} and {}", min, max)));
    }
    Ok(())
}

/// Trims the value and rejects it when nothing is left.
pub fn required_trimmed(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid(field, "This field is required"));
    }
    Ok(trimmed.to_string())
}

/// Mexican CLABE interbank code: exactly 18 digits.
pub fn validate_clabe(field: &str, clabe: &str) -> Result<()> {
    if clabe.len() != 18 || !clabe.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(field, "CLABE must have exactly 18 digits"));
    }
    Ok(())
}

/// Parses `HH:MM` or `HH:MM:SS` into a time of day.
///
/// # Examples
/// ```
/// use backend::validation::parse_time_of_day;
///
/// let t = parse_time_of_day("start_time", "09:30").unwrap();
/// assert_eq!(t.to_string(), "09:30:00");
/// ```
pub fn parse_time_of_day(field: &str, value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| invalid(field, "Time must use HH:MM or HH:MM:SS format"))
}
