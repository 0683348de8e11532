//! Crash-recovery journal
//!
//! An append-only side file recording one line per successfully sent message.
//! If a batch run crashes partway through, the journal shows which messages
//! already went out.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use thiserror::Error;

use super::report::DispatchResult;

/// Errors from admitting a journal path
#[derive(Debug, Error)]
pub enum JournalError {
    /// The file already exists and has contents
    #[error("journal file {} already has contents", .path.display())]
    Conflict {
        /// The rejected path
        path: PathBuf,
    },

    /// The path could not be checked or created
    #[error("journal file {} is not accessible", .path.display())]
    AccessDenied {
        /// The rejected path
        path: PathBuf,

        /// The underlying filesystem error
        #[source]
        source: io::Error,
    },
}

/// Handle to an admitted journal file
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Journal {
    /// Admit `path` as the journal for a new batch run
    ///
    /// The file must not exist yet (it is created empty) or must exist with a
    /// length of zero. A non-empty file is a leftover from an earlier run and
    /// fails with [`JournalError::Conflict`]; any filesystem error fails with
    /// [`JournalError::AccessDenied`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, JournalError> {
        let path = path.into();

        match fs::metadata(&path) {
            Ok(meta) if meta.len() > 0 => Err(JournalError::Conflict { path }),
            Ok(_) => Ok(Self::resume(path)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                match OpenOptions::new().write(true).create_new(true).open(&path) {
                    Ok(_) => Ok(Self::resume(path)),
                    Err(source) => Err(JournalError::AccessDenied { path, source }),
                }
            }
            Err(source) => Err(JournalError::AccessDenied { path, source }),
        }
    }

    /// Attach to a journal that a coordinating parent already admitted
    ///
    /// Skips the precondition check; used by workers that receive the path
    /// after the batch has started and the canary may already have written.
    pub fn resume(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The journal file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one newline-terminated record
    ///
    /// The line is written with a single call on a file opened in append
    /// mode, so concurrent appenders (other threads through this handle, or
    /// worker processes with their own handle) never interleave partial
    /// lines.
    pub fn append(&self, record: &DispatchResult) -> io::Result<()> {
        let line = format!("{record}\n");

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn record(subject: &str) -> DispatchResult {
        DispatchResult {
            sender: "a@x.com".to_string(),
            reply_to: String::new(),
            subject: subject.to_string(),
            to: vec!["b@x.com".to_string()],
            cc: vec![],
            bcc: vec![],
        }
    }

    #[test]
    fn test_open_creates_a_missing_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("journal.txt");

        let journal = Journal::open(&path)?;

        assert!(journal.path().exists());
        assert_eq!(fs::metadata(&path)?.len(), 0);

        Ok(())
    }

    #[test]
    fn test_open_accepts_an_existing_empty_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("journal.txt");
        fs::write(&path, "")?;

        assert!(Journal::open(&path).is_ok());

        Ok(())
    }

    #[test]
    fn test_open_rejects_a_non_empty_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("journal.txt");
        fs::write(&path, "left over from a previous run\n")?;

        let result = Journal::open(&path);

        assert!(matches!(result, Err(JournalError::Conflict { .. })));

        Ok(())
    }

    #[test]
    fn test_open_reports_an_unusable_path_as_access_denied() {
        let result = Journal::open("/no/such/directory/journal.txt");

        assert!(matches!(result, Err(JournalError::AccessDenied { .. })));
    }

    #[test]
    fn test_append_writes_one_line_per_record() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("journal.txt");

        let journal = Journal::open(&path)?;
        journal.append(&record("first"))?;
        journal.append(&record("second"))?;

        let contents = fs::read_to_string(&path)?;
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("first"));
        assert!(lines[1].contains("second"));
        assert!(contents.ends_with('\n'));

        Ok(())
    }

    #[test]
    fn test_resume_appends_without_the_precondition() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("journal.txt");

        let journal = Journal::open(&path)?;
        journal.append(&record("canary"))?;

        let resumed = Journal::resume(&path);
        resumed.append(&record("pooled"))?;

        let contents = fs::read_to_string(&path)?;
        assert_eq!(contents.lines().count(), 2);

        Ok(())
    }
}
