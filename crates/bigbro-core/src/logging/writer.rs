//! Thread-safe append-only product log with rename-in-place rotation.

use std::error::Error;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, trace, warn};

use super::LogError;
use crate::fmt::{LogCategory, dated_log_file_name_now, format_line, temp_log_file_name};

/// Currently open log file.
struct ActiveFile {
    path: PathBuf,
    file: File,
}

/// Moves `from` to `to` by copying, for when a rename cannot cross
/// filesystems. The copy is opened for appending before `from` is removed,
/// so an error leaves `from` in place and still the live file.
fn copy_and_reopen(from: &Path, to: &Path) -> io::Result<File> {
    fs::copy(from, to)?;
    let file = match OpenOptions::new().append(true).open(to) {
        Ok(file) => file,
        Err(e) => {
            let _ = fs::remove_file(to);
            return Err(e);
        }
    };
    if let Err(e) = fs::remove_file(from) {
        warn!(path = %from.display(), error = %e, "cannot remove log left behind by copy");
    }
    Ok(file)
}

/// Product-log writer shared by every sampling task.
///
/// All writes and the rotation itself go through one mutex, so lines from
/// concurrent callers are never interleaved and no line is lost or duplicated
/// across a rotation.
pub struct RotatingLogWriter {
    active: Mutex<ActiveFile>,
    trace_enabled: AtomicBool,
    debug_enabled: AtomicBool,
}

/// Creates the parent directory if needed and opens `path` for appending.
fn open_append(path: &Path) -> Result<File, LogError> {
    let open_err = |source| LogError::Open {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(open_err)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(open_err)
}

impl RotatingLogWriter {
    /// Opens (or creates) the log file at `path` in append mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        let file = open_append(&path)?;
        debug!(path = %path.display(), "product log opened");
        Ok(Self {
            active: Mutex::new(ActiveFile { path, file }),
            trace_enabled: AtomicBool::new(true),
            debug_enabled: AtomicBool::new(true),
        })
    }

    /// Opens a fresh log file with a random temporary name inside `dir`.
    pub fn open_temporary(dir: impl AsRef<Path>) -> Result<Self, LogError> {
        Self::open(dir.as_ref().join(temp_log_file_name()))
    }

    fn lock(&self) -> MutexGuard<'_, ActiveFile> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Path of the file currently being written.
    pub fn path(&self) -> PathBuf {
        self.lock().path.clone()
    }

    pub fn set_trace_enabled(&self, enabled: bool) {
        self.trace_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn set_debug_enabled(&self, enabled: bool) {
        self.debug_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Whether lines of `category` are currently written.
    ///
    /// AUDIT and ERROR lines are always written.
    pub fn is_enabled(&self, category: LogCategory) -> bool {
        match category {
            LogCategory::Trace => self.trace_enabled.load(Ordering::Relaxed),
            LogCategory::Debug => self.debug_enabled.load(Ordering::Relaxed),
            LogCategory::Audit | LogCategory::Error => true,
        }
    }

    /// Appends one already formatted line and flushes it.
    pub fn write_line(&self, line: &str) -> Result<(), LogError> {
        let mut active = self.lock();
        Self::append(&mut active.file, line)
    }

    fn append(file: &mut File, line: &str) -> Result<(), LogError> {
        file.write_all(line.as_bytes()).map_err(LogError::Write)?;
        file.flush().map_err(LogError::Write)?;
        trace!(target: "bigbro::product", "{}", line.trim_end());
        Ok(())
    }

    /// Formats and appends one line. Disabled categories are a no-op.
    pub fn log(&self, category: LogCategory, message: &str) -> Result<(), LogError> {
        if !self.is_enabled(category) {
            return Ok(());
        }
        self.write_line(&format_line(category, message))
    }

    pub fn trace(&self, message: &str) -> Result<(), LogError> {
        self.log(LogCategory::Trace, message)
    }

    pub fn debug(&self, message: &str) -> Result<(), LogError> {
        self.log(LogCategory::Debug, message)
    }

    pub fn audit(&self, message: &str) -> Result<(), LogError> {
        self.log(LogCategory::Audit, message)
    }

    pub fn error(&self, message: &str) -> Result<(), LogError> {
        self.log(LogCategory::Error, message)
    }

    /// Appends several messages of one category without other writers'
    /// lines in between.
    pub fn log_all(&self, category: LogCategory, messages: &[String]) -> Result<(), LogError> {
        if !self.is_enabled(category) || messages.is_empty() {
            return Ok(());
        }
        let lines: Vec<String> = messages
            .iter()
            .map(|m| format_line(category, m))
            .collect();
        self.write_lines(&lines)
    }

    /// Appends already formatted lines under a single lock acquisition.
    pub fn write_lines(&self, lines: &[String]) -> Result<(), LogError> {
        let mut active = self.lock();
        for line in lines {
            Self::append(&mut active.file, line)?;
        }
        Ok(())
    }

    /// Writes an error and every error in its `source()` chain as ERROR
    /// lines, the nested ones prefixed with `Inner(n)`.
    pub fn log_error_chain(&self, err: &(dyn Error + 'static)) -> Result<(), LogError> {
        let mut messages = vec![err.to_string()];
        let mut depth = 1;
        let mut source = err.source();
        while let Some(inner) = source {
            messages.push(format!("Inner({}) {}", depth, inner));
            depth += 1;
            source = inner.source();
        }
        self.log_all(LogCategory::Error, &messages)
    }

    /// Moves the current log file to `new_path` and continues writing there.
    ///
    /// Writers block for the duration; on failure the writer keeps its
    /// current file.
    pub fn rotate(&self, new_path: impl AsRef<Path>) -> Result<(), LogError> {
        let new_path = new_path.as_ref().to_path_buf();
        let mut active = self.lock();

        if !active.path.exists() {
            return Err(LogError::SourceMissing(active.path.clone()));
        }
        active.file.flush().map_err(LogError::Write)?;

        let rotate_err = |source| LogError::Rotate {
            from: active.path.clone(),
            to: new_path.clone(),
            source,
        };
        if let Some(parent) = new_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(rotate_err)?;
        }
        let copied = match fs::rename(&active.path, &new_path) {
            Ok(()) => None,
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                Some(copy_and_reopen(&active.path, &new_path).map_err(rotate_err)?)
            }
            Err(e) => return Err(rotate_err(e)),
        };

        let from = std::mem::replace(&mut active.path, new_path);
        active.file = match copied {
            Some(file) => file,
            // After a plain rename the old handle already points at the new
            // name, so a failed reopen still leaves a usable writer.
            None => open_append(&active.path)?,
        };

        info!(
            from = %from.display(),
            to = %active.path.display(),
            "product log rotated"
        );
        Ok(())
    }

    /// Rotates to `BB <timestamp>.txt` in the current file's directory and
    /// returns the new path.
    pub fn rotate_to_dated(&self) -> Result<PathBuf, LogError> {
        let dir = self
            .path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let new_path = dir.join(dated_log_file_name_now());
        self.rotate(&new_path)?;
        Ok(new_path)
    }

    pub fn flush(&self) -> Result<(), LogError> {
        self.lock().file.flush().map_err(LogError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_open_creates_directory_and_appends() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs/nested/BB.txt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "existing\n").unwrap();

        let writer = RotatingLogWriter::open(&path).unwrap();
        writer.write_line("second\n").unwrap();
        assert_eq!(read(&path), "existing\nsecond\n");

        let fresh = tmp.path().join("other/dir/BB.txt");
        RotatingLogWriter::open(&fresh).unwrap();
        assert!(fresh.exists());
    }

    #[test]
    fn test_open_temporary_uses_random_name() {
        let tmp = TempDir::new().unwrap();
        let a = RotatingLogWriter::open_temporary(tmp.path()).unwrap();
        let b = RotatingLogWriter::open_temporary(tmp.path()).unwrap();

        let name = a.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("BBT "));
        assert!(name.ends_with(".txt"));
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_open_fails_on_unwritable_location() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "").unwrap();

        let result = RotatingLogWriter::open(blocker.join("BB.txt"));
        assert!(matches!(result, Err(LogError::Open { .. })));
    }

    #[test]
    fn test_category_lines_and_filters() {
        let tmp = TempDir::new().unwrap();
        let writer = RotatingLogWriter::open(tmp.path().join("BB.txt")).unwrap();

        writer.trace("t1").unwrap();
        writer.debug("d1").unwrap();
        writer.audit("a1").unwrap();
        writer.error("e1").unwrap();

        writer.set_trace_enabled(false);
        writer.set_debug_enabled(false);
        writer.trace("t2").unwrap();
        writer.debug("d2").unwrap();
        writer.audit("a2").unwrap();
        writer.error("e2").unwrap();

        let content = read(&writer.path());
        let tags: Vec<&str> = content
            .lines()
            .map(|l| l.split(' ').nth(1).unwrap())
            .collect();
        assert_eq!(
            tags,
            vec!["BB-TRACE", "BB-DEBUG", "BB-AUDIT", "BB-ERROR", "BB-AUDIT", "BB-ERROR"]
        );
        assert!(!content.contains("t2"));
        assert!(!content.contains("d2"));
    }

    #[test]
    fn test_log_error_chain() {
        let tmp = TempDir::new().unwrap();
        let writer = RotatingLogWriter::open(tmp.path().join("BB.txt")).unwrap();

        let err = LogError::Open {
            path: PathBuf::from("/nowhere"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        writer.log_error_chain(&err).unwrap();

        let content = read(&writer.path());
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("BB-ERROR cannot open log file /nowhere: denied"));
        assert!(lines[1].ends_with("BB-ERROR Inner(1) denied"));
    }

    #[test]
    fn test_rotate_preserves_content_and_continues() {
        let tmp = TempDir::new().unwrap();
        let writer = RotatingLogWriter::open_temporary(tmp.path()).unwrap();
        let temp_path = writer.path();

        writer.write_line("before\n").unwrap();
        let dated = tmp.path().join("BB 01-01-2024 10.00.00.txt");
        writer.rotate(&dated).unwrap();
        writer.write_line("after\n").unwrap();

        assert!(!temp_path.exists());
        assert_eq!(writer.path(), dated);
        assert_eq!(read(&dated), "before\nafter\n");
    }

    #[test]
    fn test_rotate_to_dated_stays_in_directory() {
        let tmp = TempDir::new().unwrap();
        let writer = RotatingLogWriter::open_temporary(tmp.path()).unwrap();
        writer.audit("hello").unwrap();

        let dated = writer.rotate_to_dated().unwrap();
        assert_eq!(dated.parent().unwrap(), tmp.path());
        let name = dated.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("BB ") && !name.starts_with("BBT "));
        assert!(read(&dated).contains("BB-AUDIT hello"));
    }

    #[test]
    fn test_rotate_missing_source_keeps_writer() {
        let tmp = TempDir::new().unwrap();
        let writer = RotatingLogWriter::open(tmp.path().join("BB.txt")).unwrap();
        fs::remove_file(writer.path()).unwrap();

        let result = writer.rotate(tmp.path().join("BB2.txt"));
        assert!(matches!(result, Err(LogError::SourceMissing(_))));
        assert_eq!(writer.path(), tmp.path().join("BB.txt"));
        assert!(!tmp.path().join("BB2.txt").exists());
    }

    #[test]
    fn test_concurrent_writers_during_rotation() {
        let tmp = TempDir::new().unwrap();
        let writer = Arc::new(RotatingLogWriter::open_temporary(tmp.path()).unwrap());

        let handles: Vec<_> = ["A", "B"]
            .into_iter()
            .map(|id| {
                let writer = Arc::clone(&writer);
                thread::spawn(move || {
                    for i in 0..1000 {
                        writer.write_line(&format!("{}-{:04}\n", id, i)).unwrap();
                    }
                })
            })
            .collect();

        thread::sleep(std::time::Duration::from_millis(5));
        let dated = tmp.path().join("BB rotated.txt");
        writer.rotate(&dated).unwrap();

        for handle in handles {
            handle.join().unwrap();
        }

        let content = read(&dated);
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2000);
        for id in ["A", "B"] {
            let mine: Vec<&str> = lines
                .iter()
                .copied()
                .filter(|l| l.starts_with(id))
                .collect();
            let expected: Vec<String> = (0..1000).map(|i| format!("{}-{:04}", id, i)).collect();
            assert_eq!(mine, expected);
        }
    }

    #[test]
    fn test_two_writers_on_same_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("BB.txt");

        let handles: Vec<_> = ["X", "Y"]
            .into_iter()
            .map(|id| {
                let writer = RotatingLogWriter::open(&path).unwrap();
                thread::spawn(move || {
                    for i in 0..1000 {
                        writer
                            .log(LogCategory::Debug, &format!("{}-{:04}", id, i))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = read(&path);
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2000);
        for line in &lines {
            assert!(line.contains(" BB-DEBUG "), "{line}");
            assert!(line.ends_with(|c: char| c.is_ascii_digit()), "{line}");
        }
        for id in ["X", "Y"] {
            let tag = format!(" BB-DEBUG {}-", id);
            assert_eq!(lines.iter().filter(|l| l.contains(&tag)).count(), 1000);
        }
    }

    #[test]
    fn test_copy_and_reopen_moves_live_file() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("BBT a.txt");
        let to = tmp.path().join("BB b.txt");
        fs::write(&from, "first\n").unwrap();

        let mut file = copy_and_reopen(&from, &to).unwrap();
        file.write_all(b"second\n").unwrap();

        assert!(!from.exists());
        assert_eq!(read(&to), "first\nsecond\n");
    }

    #[test]
    fn test_copy_and_reopen_failure_keeps_source() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("BBT a.txt");
        fs::write(&from, "first\n").unwrap();
        fs::write(tmp.path().join("blocker"), "").unwrap();

        let result = copy_and_reopen(&from, &tmp.path().join("blocker").join("BB b.txt"));
        assert!(result.is_err());
        assert_eq!(read(&from), "first\n");
    }
}
