//! Human-readable text reports for store results.
//!
//! These are what chat tools, the HTTP API and the CLI hand back to a
//! person. The wording is stable; tests and clients match on it.

use std::fmt::Write as _;

use crate::types::{Registration, RegistrationError, SearchResults};

pub const NO_REGISTRATIONS: &str = "No registrations found.";

/// Report for the outcome of an `add`.
#[must_use]
pub fn add_report(result: &Result<Registration, RegistrationError>) -> String {
    match result {
        Ok(record) => format!(
            "SUCCESS: Registered {}\nName: {}\nEmail: {}\nDOB: {}\nRegistered: {}",
            record.name,
            record.name,
            record.email,
            record.date_of_birth,
            record.registration_date,
        ),
        Err(err) => error_report(err),
    }
}

/// Numbered listing of every registration.
#[must_use]
pub fn list_report(result: &Result<Vec<Registration>, RegistrationError>) -> String {
    match result {
        Ok(records) if records.is_empty() => NO_REGISTRATIONS.to_string(),
        Ok(records) => format!("All Registrations:\n\n{}", numbered(records)),
        Err(err) => error_report(err),
    }
}

/// Numbered listing of search matches.
#[must_use]
pub fn search_report(query: &str, result: &Result<SearchResults, RegistrationError>) -> String {
    let query = query.trim();
    match result {
        Ok(found) if found.count == 0 => format!("No registrations match '{query}'."),
        Ok(found) => format!(
            "Found {} registration(s) matching '{query}':\n\n{}",
            found.count,
            numbered(&found.records),
        ),
        Err(err) => error_report(err),
    }
}

/// `ERROR:` report for any store failure.
#[must_use]
pub fn error_report(err: &RegistrationError) -> String {
    match err {
        RegistrationError::ValidationFailed(errors) => {
            let mut msg = "ERROR: Validation failed".to_string();
            for e in errors {
                let _ = write!(msg, "\n- {e}");
            }
            msg
        }
        RegistrationError::DuplicateEmail { .. } => "ERROR: Email already registered".to_string(),
        RegistrationError::StorageUnavailable { source, .. } => {
            format!("ERROR: Storage unavailable: {source}")
        }
    }
}

/// `i. Name | Email | DOB | Registered` lines, 1-based.
fn numbered(records: &[Registration]) -> String {
    let mut out = String::new();
    for (i, r) in records.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} | {} | {} | {}",
            i + 1,
            r.name,
            r.email,
            r.date_of_birth,
            r.registration_date
        );
    }
    out
}
