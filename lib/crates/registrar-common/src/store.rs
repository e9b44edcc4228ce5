//! File-backed registration store.
//!
//! The store owns a single append-only CSV file whose first line is
//! [`HEADER`]. Records are never rewritten or removed; the file handle is
//! opened per call.
//!
//! `add` is a read-check-append sequence. A per-instance mutex serializes
//! it, so threads sharing one `RegistrationStore` cannot register the same
//! email twice. Separate instances or processes writing the same file are
//! not coordinated.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use csv::{ReaderBuilder, Terminator, Writer, WriterBuilder};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::types::{Registration, RegistrationError, SearchResults};
use crate::validator::validate_registration;

/// Column names of the registrations file, in order.
pub const HEADER: [&str; 4] = ["Name", "Email", "Date_of_Birth", "Registration_Date"];

/// Format of the store-assigned `Registration_Date` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default file name used when no path is configured.
pub const DEFAULT_FILE: &str = "user_registrations.csv";

#[derive(Debug)]
pub struct RegistrationStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RegistrationStore {
    /// Open (or create) the store at `path`.
    ///
    /// Missing parent directories are created. The header is written only
    /// when the file is new or empty; existing data is never truncated.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistrationError> {
        let store = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        };
        {
            let _guard = store.write_lock.lock();
            let mut writer = store.appender()?;
            writer.flush().map_err(|e| store.unavailable(e))?;
        }
        debug!(path = %store.path.display(), "registration store ready");
        Ok(store)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate and append a new registration.
    ///
    /// All input checks run before the duplicate check, and every failed
    /// check is reported. Nothing is written unless the call succeeds.
    pub fn add(
        &self,
        name: &str,
        email: &str,
        dob: &str,
    ) -> Result<Registration, RegistrationError> {
        let name = name.trim();
        let email = email.trim();

        if let Err(errors) = validate_registration(name, email, dob) {
            warn!(
                email,
                failures = errors.len(),
                "registration rejected: validation failed"
            );
            return Err(RegistrationError::ValidationFailed(errors));
        }

        let _guard = self.write_lock.lock();

        let existing = self.list()?;
        let needle = email.to_lowercase();
        if existing
            .iter()
            .any(|r| r.email.trim().to_lowercase() == needle)
        {
            warn!(email, "registration rejected: email already registered");
            return Err(RegistrationError::DuplicateEmail {
                email: email.to_string(),
            });
        }

        let record = Registration {
            name: name.to_string(),
            email: email.to_string(),
            date_of_birth: dob.to_string(),
            registration_date: next_timestamp(Local::now().naive_local(), existing.last()),
        };

        let mut writer = self.appender()?;
        writer
            .serialize(&record)
            .map_err(|e| self.unavailable(e))?;
        writer.flush().map_err(|e| self.unavailable(e))?;

        info!(
            email = %record.email,
            registered_at = %record.registration_date,
            "registration stored"
        );
        Ok(record)
    }

    /// Every stored record in insertion order.
    ///
    /// A missing or header-only file is an empty store, not an error.
    pub fn list(&self) -> Result<Vec<Registration>, RegistrationError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "registrations file absent, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.unavailable(e)),
        };

        let records = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file)
            .deserialize::<Registration>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.unavailable(e))?;

        debug!(count = records.len(), "registrations loaded");
        Ok(records)
    }

    /// Case-insensitive substring match on name or email.
    pub fn search(&self, query: &str) -> Result<SearchResults, RegistrationError> {
        let query = query.trim().to_lowercase();
        let records = self
            .list()?
            .into_iter()
            .filter(|r| {
                r.name.to_lowercase().contains(&query) || r.email.to_lowercase().contains(&query)
            })
            .collect();
        Ok(SearchResults::new(records))
    }

    /// Case-insensitive exact match on email.
    pub fn email_exists(&self, email: &str) -> Result<bool, RegistrationError> {
        let needle = email.trim().to_lowercase();
        Ok(self
            .list()?
            .iter()
            .any(|r| r.email.trim().to_lowercase() == needle))
    }

    /// Open the file for appending, writing the header first if it is empty.
    /// A last line without a terminator is closed before anything is appended.
    /// Callers must hold `write_lock`.
    fn appender(&self) -> Result<Writer<File>, RegistrationError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.unavailable(e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.unavailable(e))?;
        let is_empty = file.metadata().map_err(|e| self.unavailable(e))?.len() == 0;

        if !is_empty && !ends_with_terminator(&mut file).map_err(|e| self.unavailable(e))? {
            file.write_all(b"\n").map_err(|e| self.unavailable(e))?;
            warn!(path = %self.path.display(), "registrations file lacked a final newline");
        }

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(file);
        if is_empty {
            writer
                .write_record(HEADER)
                .map_err(|e| self.unavailable(e))?;
            info!(path = %self.path.display(), "registrations file initialised");
        }
        Ok(writer)
    }

    fn unavailable(&self, source: impl Into<csv::Error>) -> RegistrationError {
        RegistrationError::storage(self.path.clone(), source)
    }
}

/// Whether the last byte of a non-empty file is `\n` or `\r`.
fn ends_with_terminator(file: &mut File) -> io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(matches!(last[0], b'\n' | b'\r'))
}

/// Current local time, clamped so it never precedes the last stored record.
///
/// Wall-clock steps backwards (DST fall-back, NTP corrections) would
/// otherwise break the non-decreasing order of `Registration_Date`. An
/// unparseable previous timestamp is ignored.
fn next_timestamp(now: NaiveDateTime, last: Option<&Registration>) -> String {
    let floor = last.and_then(|r| {
        NaiveDateTime::parse_from_str(&r.registration_date, TIMESTAMP_FORMAT).ok()
    });
    floor
        .map_or(now, |floor| now.max(floor))
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::ValidationError;
    use chrono::NaiveDateTime;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, RegistrationStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RegistrationStore::open(dir.path().join(DEFAULT_FILE)).unwrap();
        (dir, store)
    }

    fn file_contents(store: &RegistrationStore) -> String {
        fs::read_to_string(store.path()).unwrap()
    }

    #[test]
    fn open_writes_header_once() {
        let (_dir, store) = temp_store();
        assert_eq!(
            file_contents(&store),
            "Name,Email,Date_of_Birth,Registration_Date\n"
        );

        let reopened = RegistrationStore::open(store.path()).unwrap();
        assert_eq!(
            file_contents(&reopened),
            "Name,Email,Date_of_Birth,Registration_Date\n"
        );
    }

    #[test]
    fn open_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("regs.csv");
        let store = RegistrationStore::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn open_never_truncates_existing_data() {
        let (_dir, store) = temp_store();
        store
            .add("John Doe", "john@example.com", "1990-01-15")
            .unwrap();
        let before = file_contents(&store);

        let reopened = RegistrationStore::open(store.path()).unwrap();
        assert_eq!(file_contents(&reopened), before);
        assert_eq!(reopened.list().unwrap().len(), 1);
    }

    #[test]
    fn open_fails_on_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as the registrations file.
        let err = RegistrationStore::open(dir.path()).unwrap_err();
        assert!(matches!(err, RegistrationError::StorageUnavailable { .. }));
        assert!(!err.is_user_correctable());
    }

    #[test]
    fn fresh_store_lists_empty() {
        let (_dir, store) = temp_store();
        assert_eq!(store.list().unwrap(), Vec::new());
    }

    #[test]
    fn add_then_list_returns_stored_record() {
        let (_dir, store) = temp_store();
        let added = store
            .add("John Doe", "john@example.com", "1990-01-15")
            .unwrap();

        assert_eq!(added.name, "John Doe");
        assert_eq!(added.email, "john@example.com");
        assert_eq!(added.date_of_birth, "1990-01-15");
        NaiveDateTime::parse_from_str(&added.registration_date, TIMESTAMP_FORMAT)
            .expect("timestamp in store format");

        assert_eq!(store.list().unwrap(), vec![added.clone()]);
        let found = store.search("john@example.com").unwrap();
        assert_eq!(found.records, vec![added]);
    }

    #[test]
    fn add_trims_name_and_email() {
        let (_dir, store) = temp_store();
        let added = store
            .add("  Jane Roe ", " jane@example.com\t", "1985-07-04")
            .unwrap();
        assert_eq!(added.name, "Jane Roe");
        assert_eq!(added.email, "jane@example.com");
        assert_eq!(store.list().unwrap()[0], added);
    }

    #[test]
    fn add_rejects_bad_date_format_without_writing() {
        let (_dir, store) = temp_store();
        let before = file_contents(&store);

        for dob in ["15-01-1990", "1990/01/15"] {
            let err = store.add("John Doe", "john@example.com", dob).unwrap_err();
            match err {
                RegistrationError::ValidationFailed(errors) => {
                    assert_eq!(errors.len(), 1);
                    assert!(matches!(errors[0], ValidationError::InvalidDateFormat(_)));
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(file_contents(&store), before);
    }

    #[test]
    fn add_rejects_future_date_without_writing() {
        let (_dir, store) = temp_store();
        let before = file_contents(&store);

        let err = store
            .add("John Doe", "john@example.com", "2999-01-01")
            .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::ValidationFailed(ref errors)
                if matches!(errors[..], [ValidationError::InvalidDateRange(_)])
        ));
        assert_eq!(file_contents(&store), before);
    }

    #[test]
    fn add_reports_all_validation_failures() {
        let (_dir, store) = temp_store();
        let err = store.add("J", "not-an-email", "yesterday").unwrap_err();
        let RegistrationError::ValidationFailed(errors) = err else {
            panic!("expected validation failure");
        };
        let codes: Vec<_> = errors.iter().map(ValidationError::code).collect();
        assert_eq!(codes, ["invalid_name", "invalid_email", "invalid_date_format"]);
    }

    #[test]
    fn duplicate_email_is_case_insensitive() {
        let (_dir, store) = temp_store();
        store
            .add("John Doe", "john@example.com", "1990-01-15")
            .unwrap();
        let before = file_contents(&store);

        let err = store
            .add("Jane", "JOHN@EXAMPLE.COM", "1990-01-15")
            .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::DuplicateEmail { ref email } if email == "JOHN@EXAMPLE.COM"
        ));
        assert_eq!(file_contents(&store), before);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn validation_is_reported_before_duplicates() {
        let (_dir, store) = temp_store();
        store
            .add("John Doe", "john@example.com", "1990-01-15")
            .unwrap();

        let err = store
            .add("Jane", "john@example.com", "2999-01-01")
            .unwrap_err();
        assert!(matches!(err, RegistrationError::ValidationFailed(_)));
    }

    #[test]
    fn email_exists_matches_exactly_ignoring_case() {
        let (_dir, store) = temp_store();
        store
            .add("John Doe", "john@example.com", "1990-01-15")
            .unwrap();

        assert!(store.email_exists("john@example.com").unwrap());
        assert!(store.email_exists(" John@Example.COM ").unwrap());
        assert!(!store.email_exists("john@example.co").unwrap());
        assert!(!store.email_exists("ohn@example.com").unwrap());
    }

    #[test]
    fn search_matches_name_substring() {
        let (_dir, store) = temp_store();
        store.add("John Doe", "john@x.com", "1990-01-15").unwrap();
        store.add("Jane Roe", "jane@x.com", "1992-03-10").unwrap();

        let results = store.search("doe").unwrap();
        assert_eq!(results.count, 1);
        assert_eq!(results.records[0].name, "John Doe");
    }

    #[test]
    fn search_matches_email_and_keeps_insertion_order() {
        let (_dir, store) = temp_store();
        store.add("John Doe", "john@x.com", "1990-01-15").unwrap();
        store.add("Jane Roe", "jane@y.com", "1992-03-10").unwrap();
        store.add("Jim Poe", "jim@x.com", "1970-12-31").unwrap();

        let results = store.search("  @X.COM ").unwrap();
        let names: Vec<_> = results.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["John Doe", "Jim Poe"]);
        assert_eq!(results.count, 2);

        assert_eq!(store.search("nobody").unwrap().count, 0);
        assert_eq!(store.search("").unwrap().count, 3);
    }

    #[test]
    fn list_is_idempotent() {
        let (_dir, store) = temp_store();
        store.add("John Doe", "john@x.com", "1990-01-15").unwrap();
        store.add("Jane Roe", "jane@x.com", "1992-03-10").unwrap();

        assert_eq!(store.list().unwrap(), store.list().unwrap());
    }

    #[test]
    fn timestamps_do_not_decrease_in_append_order() {
        let (_dir, store) = temp_store();
        for (i, name) in ["Ann Lee", "Bob Lee", "Cat Lee"].iter().enumerate() {
            store
                .add(name, &format!("user{i}@example.com"), "1990-01-15")
                .unwrap();
        }
        let stamps: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.registration_date)
            .collect();
        let mut sorted = stamps.clone();
        sorted.sort();
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn timestamps_never_precede_the_last_stored_record() {
        let (_dir, store) = temp_store();
        fs::write(
            store.path(),
            "Name,Email,Date_of_Birth,Registration_Date\n\
             Ann Lee,ann@x.com,1990-01-15,2999-12-31 23:59:59\n",
        )
        .unwrap();

        let added = store.add("Bob Lee", "bob@x.com", "1990-01-15").unwrap();
        assert_eq!(added.registration_date, "2999-12-31 23:59:59");

        let stamps: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.registration_date)
            .collect();
        assert_eq!(stamps, ["2999-12-31 23:59:59", "2999-12-31 23:59:59"]);
    }

    #[test]
    fn next_timestamp_keeps_a_later_clock_reading() {
        let now = NaiveDateTime::parse_from_str("2024-11-03 01:00:00", TIMESTAMP_FORMAT).unwrap();
        let earlier = Registration {
            name: "Ann Lee".to_string(),
            email: "ann@x.com".to_string(),
            date_of_birth: "1990-01-15".to_string(),
            registration_date: "2024-11-03 00:59:59".to_string(),
        };
        assert_eq!(next_timestamp(now, Some(&earlier)), "2024-11-03 01:00:00");
        assert_eq!(next_timestamp(now, None), "2024-11-03 01:00:00");

        let garbled = Registration {
            registration_date: "yesterday".to_string(),
            ..earlier
        };
        assert_eq!(next_timestamp(now, Some(&garbled)), "2024-11-03 01:00:00");
    }

    #[test]
    fn add_after_header_without_newline_keeps_the_record() {
        let (_dir, store) = temp_store();
        fs::write(store.path(), "Name,Email,Date_of_Birth,Registration_Date").unwrap();

        let added = store.add("John Doe", "john@x.com", "1990-01-15").unwrap();
        assert_eq!(store.list().unwrap(), vec![added]);
        assert!(
            file_contents(&store)
                .starts_with("Name,Email,Date_of_Birth,Registration_Date\nJohn Doe,")
        );
    }

    #[test]
    fn add_after_row_without_newline_keeps_both_records() {
        let (_dir, store) = temp_store();
        fs::write(
            store.path(),
            "Name,Email,Date_of_Birth,Registration_Date\n\
             Ann Lee,ann@x.com,1990-01-15,2024-01-01 09:00:00",
        )
        .unwrap();

        store.add("Bob Lee", "bob@x.com", "1991-02-20").unwrap();
        let names: Vec<_> = store.list().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["Ann Lee", "Bob Lee"]);
    }

    #[test]
    fn add_after_crlf_row_appends_no_blank_line() {
        let (_dir, store) = temp_store();
        let seeded = "Name,Email,Date_of_Birth,Registration_Date\r\n\
                      Ann Lee,ann@x.com,1990-01-15,2024-01-01 09:00:00\r\n";
        fs::write(store.path(), seeded).unwrap();

        store.add("Bob Lee", "bob@x.com", "1991-02-20").unwrap();
        let contents = file_contents(&store);
        assert!(contents.starts_with(&format!("{seeded}Bob Lee,bob@x.com,1991-02-20,")));
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn punctuated_names_round_trip_through_the_file() {
        let (_dir, store) = temp_store();
        let added = store
            .add("Anne-Marie O'Neil Jr.", "anne.oneil@x.com", "1980-05-05")
            .unwrap();
        assert!(file_contents(&store).contains("Anne-Marie O'Neil Jr.,anne.oneil@x.com,"));
        assert_eq!(store.list().unwrap(), vec![added]);
    }

    #[test]
    fn missing_file_lists_empty_and_add_restores_header() {
        let (_dir, store) = temp_store();
        fs::remove_file(store.path()).unwrap();

        assert!(store.list().unwrap().is_empty());
        assert!(!store.email_exists("john@x.com").unwrap());

        store.add("John Doe", "john@x.com", "1990-01-15").unwrap();
        let contents = file_contents(&store);
        assert!(contents.starts_with("Name,Email,Date_of_Birth,Registration_Date\n"));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn reads_quoted_fields_written_elsewhere() {
        let (_dir, store) = temp_store();
        fs::write(
            store.path(),
            "Name,Email,Date_of_Birth,Registration_Date\r\n\
             \"Doe, John\",john@x.com,1990-01-15,2024-01-01 09:00:00\r\n",
        )
        .unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Doe, John");
        assert_eq!(records[0].registration_date, "2024-01-01 09:00:00");
    }

    #[test]
    fn malformed_rows_surface_as_storage_errors() {
        let (_dir, store) = temp_store();
        fs::write(
            store.path(),
            "Name,Email,Date_of_Birth,Registration_Date\nonly,two\n",
        )
        .unwrap();

        let err = store.list().unwrap_err();
        assert!(matches!(err, RegistrationError::StorageUnavailable { .. }));
    }

    #[test]
    fn concurrent_adds_of_one_email_store_a_single_record() {
        let (_dir, store) = temp_store();

        let outcomes: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| store.add("John Doe", "john@x.com", "1990-01-15")))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let successes = outcomes.iter().filter(|o| o.is_ok()).count();
        let duplicates = outcomes
            .iter()
            .filter(|o| matches!(o, Err(RegistrationError::DuplicateEmail { .. })))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
