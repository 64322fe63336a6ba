use std::{
    fs::{File, OpenOptions},
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::domain::FeedbackRecord;

pub const HEADER: [&str; 3] = ["text", "predicted", "correct"];

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("I/O error on feedback log {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to encode feedback row for {}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
}

/// Append-only CSV log of user verdicts.
///
/// Rows are never rewritten. Concurrent writers rely on the OS append
/// semantics; each call issues a single write.
#[derive(Debug, Clone)]
pub struct FeedbackStore {
    path: PathBuf,
}

impl FeedbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the log containing only the header if it does not exist yet.
    pub fn ensure_exists(&self) -> Result<(), FeedbackError> {
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => return Ok(()),
            Err(err) => return Err(self.io_error(err)),
        };

        let header = self.encode(None, true)?;
        file.write_all(&header).map_err(|err| self.io_error(err))?;
        tracing::info!(target: "feedback", path = %self.path.display(), "feedback log created");
        Ok(())
    }

    pub fn append(&self, record: &FeedbackRecord) -> Result<(), FeedbackError> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|err| self.io_error(err))?;

        let needs_header = is_empty(&file).map_err(|err| self.io_error(err))?;
        let payload = self.encode(Some(record), needs_header)?;
        file.write_all(&payload).map_err(|err| self.io_error(err))?;

        tracing::info!(
            target: "feedback",
            predicted = %record.predicted,
            correct = %record.correct,
            header_written = needs_header,
            "feedback saved"
        );
        Ok(())
    }

    fn encode(
        &self,
        record: Option<&FeedbackRecord>,
        with_header: bool,
    ) -> Result<Vec<u8>, FeedbackError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        if with_header {
            writer
                .write_record(HEADER)
                .map_err(|source| self.csv_error(source))?;
        }
        if let Some(record) = record {
            writer
                .serialize(record)
                .map_err(|source| self.csv_error(source))?;
        }

        writer
            .into_inner()
            .map_err(|err| self.io_error(io::Error::new(ErrorKind::Other, err.to_string())))
    }

    fn io_error(&self, source: io::Error) -> FeedbackError {
        FeedbackError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> FeedbackError {
        FeedbackError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

fn is_empty(file: &File) -> io::Result<bool> {
    Ok(file.metadata()?.len() == 0)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::domain::Label;

    use super::*;

    fn record(text: &str, predicted: &str, correct: Label) -> FeedbackRecord {
        FeedbackRecord {
            text: text.to_string(),
            predicted: predicted.to_string(),
            correct,
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn ensure_exists_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::new(dir.path().join("feedback.csv"));

        for _ in 0..3 {
            store.ensure_exists().unwrap();
        }

        assert_eq!(fs::read_to_string(store.path()).unwrap(), "text,predicted,correct\n");
    }

    #[test]
    fn ensure_exists_leaves_existing_rows_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::new(dir.path().join("feedback.csv"));
        store.ensure_exists().unwrap();
        store.append(&record("hi", "ham", Label::Real)).unwrap();

        store.ensure_exists().unwrap();

        assert_eq!(read_rows(store.path()).len(), 2);
    }

    #[test]
    fn appends_rows_in_arrival_order_with_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::new(dir.path().join("feedback.csv"));
        store.ensure_exists().unwrap();

        store.append(&record("first", "spam", Label::Spam)).unwrap();
        store.append(&record("second", "ham", Label::Real)).unwrap();
        store.append(&record("second", "ham", Label::Real)).unwrap();

        let rows = read_rows(store.path());
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], HEADER);
        assert_eq!(rows[1], ["first", "spam", "spam"]);
        assert_eq!(rows[2], ["second", "ham", "real"]);
        assert_eq!(rows[3], rows[2]);
    }

    #[test]
    fn hello_marked_real_produces_plain_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::new(dir.path().join("feedback.csv"));
        store.ensure_exists().unwrap();

        store.append(&record("hello", "ham", Label::Real)).unwrap();

        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "text,predicted,correct\nhello,ham,real\n"
        );
    }

    #[test]
    fn empty_existing_file_gets_header_before_first_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback.csv");
        fs::write(&path, "").unwrap();
        let store = FeedbackStore::new(&path);

        store.append(&record("x", "spam", Label::Spam)).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "text,predicted,correct\nx,spam,spam\n"
        );
    }

    #[test]
    fn quotes_fields_with_commas_quotes_and_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::new(dir.path().join("feedback.csv"));
        let text = "SIX chances to win CASH! From 100 to 20,000 pounds\nsay \"hi\"";

        store.append(&record(text, "spam", Label::Spam)).unwrap();

        let rows = read_rows(store.path());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], text);
    }

    #[test]
    fn logged_rows_read_back_as_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::new(dir.path().join("feedback.csv"));
        store.ensure_exists().unwrap();
        let written = [
            record("claim, now", "spam", Label::Real),
            record("NASA launches rover", "ham", Label::Real),
        ];
        for row in &written {
            store.append(row).unwrap();
        }

        let mut reader = csv::Reader::from_path(store.path()).unwrap();
        let read: Vec<FeedbackRecord> = reader.deserialize().map(|r| r.unwrap()).collect();

        assert_eq!(read, written);
    }

    #[test]
    fn write_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::new(dir.path().join("missing").join("feedback.csv"));

        let err = store.append(&record("x", "spam", Label::Spam)).unwrap_err();
        assert!(matches!(err, FeedbackError::Io { .. }));
    }
}
