//! Last-resort crash record, used when the product log itself cannot be
//! trusted.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::warn;

use crate::fmt::file_timestamp;

/// Append-only crash record file.
///
/// Every record opens, writes, flushes and closes the file, so nothing is
/// held open between crashes and records survive an abrupt exit.
#[derive(Debug, Clone)]
pub struct Tombstone {
    path: PathBuf,
    app_name: String,
}

impl Tombstone {
    pub fn new(path: impl Into<PathBuf>, app_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            app_name: app_name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders one record: a leading newline, the application name, the
    /// timestamp and the message.
    pub fn render_at(&self, timestamp: NaiveDateTime, last_words: &str) -> String {
        format!(
            "\nHere lies the departed {} {}: {}",
            self.app_name,
            file_timestamp(timestamp),
            last_words
        )
    }

    /// Appends a record with the current local time.
    pub fn epitaph(&self, last_words: &str) -> io::Result<()> {
        let record = self.render_at(Local::now().naive_local(), last_words);
        warn!(path = %self.path.display(), record = last_words, "tombstone record written");

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(record.as_bytes())?;
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_render_record() {
        let tombstone = Tombstone::new("/tmp/x", "BigBrother");
        let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 1)
            .unwrap();
        assert_eq!(
            tombstone.render_at(ts, "disk full"),
            "\nHere lies the departed BigBrother 09-03-2024 07.05.01: disk full"
        );
    }

    #[test]
    fn test_epitaph_appends_records() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("crash/BB-TOMBSTONE.txt");
        let tombstone = Tombstone::new(&path, "BigBrother");

        tombstone.epitaph("first").unwrap();
        tombstone.epitaph("second").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("Here lies the departed BigBrother").count(), 2);
        assert!(content.starts_with('\n'));
        let first = content.find(": first").unwrap();
        let second = content.find(": second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_epitaph_reports_failure() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "").unwrap();

        let tombstone = Tombstone::new(blocker.join("BB-TOMBSTONE.txt"), "BigBrother");
        assert!(tombstone.epitaph("lost").is_err());
    }
}
