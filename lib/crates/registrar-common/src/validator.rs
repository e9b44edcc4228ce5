//! Pure input validation. No I/O and no state.
//!
//! Every check returns `Ok(())` or a [`ValidationError`] carrying the
//! user-facing reason. [`validate_registration`] runs all three checks and
//! collects every failure so callers can report them together.

use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;

use crate::types::ValidationError;

/// Minimum length of a trimmed display name, in characters.
pub const MIN_NAME_LEN: usize = 2;

/// Maximum length of a trimmed display name, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// Oldest accepted age, in completed years.
pub const MAX_AGE_YEARS: i32 = 150;

pub static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});

/// First character outside the display-name alphabet: letters, combining
/// marks (viramas, decomposed accents), space, apostrophe, hyphen, period.
static NAME_INVALID_CHAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"[^\p{L}\p{M} '.\-]").expect("valid regex")
});

static DATE_SHAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex")
});

const DATE_FORMAT_REASON: &str = "Invalid date format. Use YYYY-MM-DD";

/// Check a display name after trimming surrounding whitespace.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();
    let len = name.chars().count();

    if len == 0 {
        return Err(ValidationError::InvalidName("Name is required".to_string()));
    }
    if len < MIN_NAME_LEN {
        return Err(ValidationError::InvalidName(format!(
            "Name must be at least {MIN_NAME_LEN} characters long"
        )));
    }
    if len > MAX_NAME_LEN {
        return Err(ValidationError::InvalidName(format!(
            "Name must be at most {MAX_NAME_LEN} characters long"
        )));
    }
    if let Some(bad) = NAME_INVALID_CHAR_RE.find(name) {
        return Err(ValidationError::InvalidName(format!(
            "Name contains an invalid character: {:?}",
            bad.as_str()
        )));
    }
    Ok(())
}

/// Check that `email` looks like `local@domain.tld`.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "Email is required".to_string(),
        ));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail(
            "Invalid email format".to_string(),
        ));
    }
    Ok(())
}

/// Check a `YYYY-MM-DD` date of birth against the local calendar date.
pub fn validate_date_of_birth(dob: &str) -> Result<(), ValidationError> {
    validate_date_of_birth_on(dob, Local::now().date_naive())
}

/// Check a `YYYY-MM-DD` date of birth against an explicit `today`.
pub fn validate_date_of_birth_on(dob: &str, today: NaiveDate) -> Result<(), ValidationError> {
    if dob.is_empty() {
        return Err(ValidationError::InvalidDateFormat(
            "Date of birth is required".to_string(),
        ));
    }
    if !DATE_SHAPE_RE.is_match(dob) {
        return Err(ValidationError::InvalidDateFormat(
            DATE_FORMAT_REASON.to_string(),
        ));
    }
    let birth = NaiveDate::parse_from_str(dob, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDateFormat(DATE_FORMAT_REASON.to_string()))?;

    if birth > today {
        return Err(ValidationError::InvalidDateRange(
            "Date of birth cannot be in the future".to_string(),
        ));
    }
    if age_in_years(birth, today) > MAX_AGE_YEARS {
        return Err(ValidationError::InvalidDateRange(format!(
            "Invalid birth date (older than {MAX_AGE_YEARS} years)"
        )));
    }
    Ok(())
}

/// Run every check without short-circuiting.
///
/// Returns all failures in name, email, date order.
pub fn validate_registration(
    name: &str,
    email: &str,
    dob: &str,
) -> Result<(), Vec<ValidationError>> {
    let errors: Vec<ValidationError> = [
        validate_name(name),
        validate_email(email),
        validate_date_of_birth(dob),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Completed years between `birth` and `today` (`birth <= today`).
fn age_in_years(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years
}
