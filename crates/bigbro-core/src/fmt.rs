//! Line and file-name formatting for the product log.
//!
//! Every record in a `BB …txt` file is a single UTF-8 line of the form
//! `<timestamp> <CATEGORY> <message>\n`, where the timestamp is local time in
//! ISO-8601 with second precision. All functions here are pure apart from the
//! `*_now` helpers that read the local clock.

use chrono::{Local, NaiveDateTime};
use uuid::Uuid;

/// Application identity written on tombstone records.
pub const APP_NAME: &str = "BigBrother";

/// File name of the crash file inside the log directory.
pub const TOMBSTONE_FILE_NAME: &str = "BB-TOMBSTONE.txt";

/// Category tag of a product-log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    Trace,
    Debug,
    Audit,
    Error,
}

impl LogCategory {
    /// Tag as it appears in the log file.
    pub fn tag(self) -> &'static str {
        match self {
            LogCategory::Trace => "BB-TRACE",
            LogCategory::Debug => "BB-DEBUG",
            LogCategory::Audit => "BB-AUDIT",
            LogCategory::Error => "BB-ERROR",
        }
    }
}

impl std::fmt::Display for LogCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// Log lines
// ---------------------------------------------------------------------------

/// Renders a newline-terminated log line stamped with the given local time.
pub fn format_line_at(timestamp: NaiveDateTime, category: LogCategory, message: &str) -> String {
    let mut line = String::with_capacity(32 + message.len());
    line.push_str(&timestamp.format("%Y-%m-%dT%H:%M:%S").to_string());
    line.push(' ');
    line.push_str(category.tag());
    line.push(' ');
    line.push_str(message);
    line.push('\n');
    line
}

/// Renders a log line stamped with the current local time.
pub fn format_line(category: LogCategory, message: &str) -> String {
    format_line_at(Local::now().naive_local(), category, message)
}

// ---------------------------------------------------------------------------
// File names
// ---------------------------------------------------------------------------

/// Human-readable timestamp used in dated file names and tombstone records:
/// `dd-MM-yyyy HH.mm.ss`.
pub fn file_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format("%d-%m-%Y %H.%M.%S").to_string()
}

/// Name of the temporary start-up log file: `BBT <random-token>.txt`.
pub fn temp_log_file_name() -> String {
    format!("BBT {}.txt", Uuid::new_v4())
}

/// Name of the settled log file: `BB <dd-MM-yyyy HH.mm.ss>.txt`.
pub fn dated_log_file_name(timestamp: NaiveDateTime) -> String {
    format!("BB {}.txt", file_timestamp(timestamp))
}

/// [`dated_log_file_name`] for the current local time.
pub fn dated_log_file_name_now() -> String {
    dated_log_file_name(Local::now().naive_local())
}
