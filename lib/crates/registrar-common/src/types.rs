use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored registration.
///
/// Field names match the columns of the registrations file, so the same
/// struct is used for the CSV rows and for JSON payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email")]
    pub email: String,
    /// Kept as the caller's `YYYY-MM-DD` text, never re-parsed on disk.
    #[serde(rename = "Date_of_Birth")]
    pub date_of_birth: String,
    /// Assigned by the store at insertion (`YYYY-MM-DD HH:MM:SS`).
    #[serde(rename = "Registration_Date")]
    pub registration_date: String,
}

/// Output of a substring search over the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub count: usize,
    pub records: Vec<Registration>,
}

impl SearchResults {
    #[must_use]
    pub fn new(records: Vec<Registration>) -> Self {
        Self {
            count: records.len(),
            records,
        }
    }
}

/// A single failed input check. The payload is the user-facing reason.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("{0}")]
    InvalidName(String),

    #[error("{0}")]
    InvalidEmail(String),

    #[error("{0}")]
    InvalidDateFormat(String),

    #[error("{0}")]
    InvalidDateRange(String),
}

impl ValidationError {
    /// Stable machine-readable code for the failed check.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidName(_) => "invalid_name",
            Self::InvalidEmail(_) => "invalid_email",
            Self::InvalidDateFormat(_) => "invalid_date_format",
            Self::InvalidDateRange(_) => "invalid_date_range",
        }
    }
}

/// Failure outcomes of store operations.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// One or more input checks failed; carries every failure, not just the first.
    #[error("Validation failed: {}", join_reasons(.0))]
    ValidationFailed(Vec<ValidationError>),

    #[error("Email already registered: {email}")]
    DuplicateEmail { email: String },

    #[error("Registrations file {} is unavailable: {source}", path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl RegistrationError {
    /// `true` for outcomes the caller can fix by changing the input.
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        !matches!(self, Self::StorageUnavailable { .. })
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: impl Into<csv::Error>) -> Self {
        Self::StorageUnavailable {
            path: path.into(),
            source: source.into(),
        }
    }
}

fn join_reasons(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
