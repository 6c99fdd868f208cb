//! One independently scheduled sampling task.

use std::any::Any;
use std::collections::BTreeSet;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, warn};

use super::TaskConfig;
use crate::collector::{CollectError, Providers};
use crate::fmt::LogCategory;
use crate::logging::{RotatingLogWriter, Tombstone};
use crate::model::{SampleCategory, Snapshot};

/// Result of one firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Completed,
    /// A previous tick of the same task was still running.
    Skipped,
}

/// Counters for one task since it was created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    pub ticks: u64,
    pub skipped: u64,
    pub category_failures: u64,
    pub tombstone_entries: u64,
}

#[derive(Default)]
struct Counters {
    ticks: AtomicU64,
    skipped: AtomicU64,
    category_failures: AtomicU64,
    tombstone_entries: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn load(&self) -> TaskStats {
        TaskStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            category_failures: self.category_failures.load(Ordering::Relaxed),
            tombstone_entries: self.tombstone_entries.load(Ordering::Relaxed),
        }
    }
}

/// Clears the in-progress flag when the tick ends, including by unwinding.
struct InProgress<'a>(&'a AtomicBool);

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A sampling task: refreshes its snapshot from the providers and writes
/// every enabled category to the product log.
///
/// At most one tick runs at a time; a firing that arrives while a tick is
/// still running is dropped.
pub struct SamplingTask {
    config: Mutex<Arc<TaskConfig>>,
    snapshot: Mutex<Snapshot>,
    providers: Providers,
    writer: Arc<RotatingLogWriter>,
    tombstone: Arc<Tombstone>,
    in_progress: AtomicBool,
    counters: Counters,
}

impl SamplingTask {
    pub fn new(
        config: TaskConfig,
        providers: Providers,
        writer: Arc<RotatingLogWriter>,
        tombstone: Arc<Tombstone>,
    ) -> Self {
        Self {
            config: Mutex::new(Arc::new(config)),
            snapshot: Mutex::new(Snapshot::new()),
            providers,
            writer,
            tombstone,
            in_progress: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> Arc<TaskConfig> {
        Arc::clone(&self.config.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn name(&self) -> String {
        self.config().name().to_string()
    }

    pub fn stats(&self) -> TaskStats {
        self.counters.load()
    }

    /// Copy of the most recently refreshed snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.lock_snapshot().clone()
    }

    /// Whether a tick is currently running.
    pub fn is_ticking(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Replaces the configuration and resets the snapshot to empty.
    ///
    /// The caller must make sure the task is not being fired.
    pub fn reconfigure(&self, config: TaskConfig) {
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
        *self.lock_snapshot() = Snapshot::new();
    }

    fn lock_snapshot(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one refresh-and-emit cycle.
    ///
    /// Provider and write failures stay inside their category. A panic
    /// anywhere in the cycle is recorded on the tombstone and the tick ends
    /// normally. The only error returned is a failure to write the tombstone.
    pub fn tick(&self) -> io::Result<TickOutcome> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            Counters::bump(&self.counters.skipped);
            debug!(task = %self.name(), "previous tick still running, firing skipped");
            return Ok(TickOutcome::Skipped);
        }
        let _guard = InProgress(&self.in_progress);

        let config = self.config();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run(&config)));
        Counters::bump(&self.counters.ticks);

        match result {
            Ok(outcome) => outcome?,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(task = config.name(), reason = %message, "tick panicked");
                self.bury(&format!("{}: {}", config.name(), message))?;
            }
        }
        Ok(TickOutcome::Completed)
    }

    fn run(&self, config: &TaskConfig) -> io::Result<()> {
        let mut snapshot = self.lock_snapshot();
        let mut failed = BTreeSet::new();

        for category in config.categories() {
            if let Err(e) = self.refresh(&mut snapshot, category) {
                snapshot.clear(category);
                failed.insert(category);
                self.category_failed(config, category, &e)?;
            }
        }

        for category in config.categories() {
            if failed.contains(&category) {
                continue;
            }
            let messages = snapshot.render(category, config.print_threads());
            if let Err(e) = self.writer.log_all(LogCategory::Debug, &messages) {
                self.category_failed(config, category, &e)?;
            }
        }
        Ok(())
    }

    fn refresh(&self, snapshot: &mut Snapshot, category: SampleCategory) -> Result<(), CollectError> {
        match category {
            SampleCategory::ComPorts => {
                snapshot.com_ports = self.providers.com_ports.com_ports()?;
            }
            SampleCategory::Processes => {
                snapshot.processes = self.providers.processes.processes()?;
            }
            SampleCategory::UsbDevices => {
                snapshot.usb_devices = self.providers.usb_devices.usb_devices()?;
            }
            SampleCategory::Diagnostics => {
                snapshot.diagnostics = self.providers.diagnostics.diagnostics()?;
            }
        }
        Ok(())
    }

    /// Reports a category-local failure on the product log, or on the
    /// tombstone when the product log cannot take it.
    fn category_failed(
        &self,
        config: &TaskConfig,
        category: SampleCategory,
        err: &(dyn std::error::Error + 'static),
    ) -> io::Result<()> {
        Counters::bump(&self.counters.category_failures);
        warn!(task = config.name(), %category, error = %err, "category failed");

        let message = format!("{} {}: {}", config.name(), category, err);
        if let Err(write_err) = self.writer.error(&message) {
            self.bury(&format!("{} (log unavailable: {})", message, write_err))?;
        }
        Ok(())
    }

    fn bury(&self, last_words: &str) -> io::Result<()> {
        Counters::bump(&self.counters.tombstone_entries);
        self.tombstone.epitaph(last_words)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{
        FailingProvider, FixedComPorts, FixedProcesses, PanickingProvider, SlowProvider,
    };
    use crate::model::ProcessInfo;
    use std::fs;
    use std::path::Path;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        writer: Arc<RotatingLogWriter>,
        tombstone: Arc<Tombstone>,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let writer = Arc::new(RotatingLogWriter::open(tmp.path().join("BB.txt")).unwrap());
            let tombstone = Arc::new(Tombstone::new(
                tmp.path().join("BB-TOMBSTONE.txt"),
                "BigBrother",
            ));
            Self {
                _tmp: tmp,
                writer,
                tombstone,
            }
        }

        fn task(&self, config: TaskConfig, providers: Providers) -> SamplingTask {
            SamplingTask::new(
                config,
                providers,
                Arc::clone(&self.writer),
                Arc::clone(&self.tombstone),
            )
        }

        fn log(&self) -> String {
            fs::read_to_string(self.writer.path()).unwrap()
        }

        fn tombstone_entries(&self) -> usize {
            read_or_empty(self.tombstone.path())
                .matches("Here lies the departed")
                .count()
        }
    }

    fn read_or_empty(path: &Path) -> String {
        fs::read_to_string(path).unwrap_or_default()
    }

    fn config(categories: &[SampleCategory]) -> TaskConfig {
        TaskConfig::builder("T")
            .categories(categories.iter().copied())
            .build()
            .unwrap()
    }

    #[test]
    fn test_com_ports_single_line() {
        let fx = Fixture::new();
        let providers = Providers::unavailable()
            .with_com_ports(FixedComPorts(vec!["COM1".into(), "COM4".into()]));
        let task = fx.task(config(&[SampleCategory::ComPorts]), providers);

        assert_eq!(task.tick().unwrap(), TickOutcome::Completed);

        let log = fx.log();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("BB-DEBUG COM1 | COM4"));
    }

    #[test]
    fn test_process_block_with_threads() {
        let fx = Fixture::new();
        let app = ProcessInfo::with_thread_ids("app.exe", "\\app.exe", 10, 2, 1, &[5, 6]);
        let providers = Providers::unavailable().with_processes(FixedProcesses(vec![app]));
        let config = TaskConfig::builder("IF")
            .category(SampleCategory::Processes)
            .print_threads_for("app.exe")
            .build()
            .unwrap();
        let task = fx.task(config, providers);

        task.tick().unwrap();

        let log = fx.log();
        assert!(log.contains(
            "\nName: app.exe\nFull Path: \\app.exe\nPID: 10\nThread Count: 2\nParent Process PID: 1\nThread TIDs: 5 | 6\n"
        ));
    }

    #[test]
    fn test_unavailable_categories_still_emit() {
        let fx = Fixture::new();
        let task = fx.task(
            config(&[SampleCategory::UsbDevices, SampleCategory::Diagnostics]),
            Providers::unavailable(),
        );

        task.tick().unwrap();
        assert_eq!(fx.log().matches("BB-DEBUG").count(), 2);
    }

    #[test]
    fn test_failed_category_does_not_block_others() {
        let fx = Fixture::new();
        let providers = Providers::unavailable()
            .with_com_ports(FailingProvider::new())
            .with_processes(FixedProcesses(vec![ProcessInfo::with_thread_ids(
                "svc", "/svc", 7, 1, 1, &[7],
            )]));
        let task = fx.task(
            config(&[SampleCategory::ComPorts, SampleCategory::Processes]),
            providers,
        );

        task.tick().unwrap();

        let log = fx.log();
        assert!(log.contains("BB-ERROR T com: com port provider failed"));
        assert!(log.contains("Name: svc"));
        assert_eq!(task.stats().category_failures, 1);
        assert_eq!(fx.tombstone_entries(), 0);
    }

    #[test]
    fn test_failing_provider_never_reaches_tombstone() {
        let fx = Fixture::new();
        let failing = FailingProvider::new();
        let providers = Providers::unavailable().with_com_ports(failing.clone());
        let task = fx.task(config(&[SampleCategory::ComPorts]), providers);

        for _ in 0..100 {
            assert_eq!(task.tick().unwrap(), TickOutcome::Completed);
        }

        assert_eq!(failing.calls(), 100);
        assert_eq!(fx.tombstone_entries(), 0);
        assert_eq!(task.stats().ticks, 100);
        assert_eq!(task.stats().tombstone_entries, 0);
    }

    #[test]
    fn test_panic_is_buried_once_per_tick() {
        let fx = Fixture::new();
        let providers = Providers::unavailable().with_com_ports(PanickingProvider {
            message: "port enumeration exploded",
        });
        let task = fx.task(config(&[SampleCategory::ComPorts]), providers);

        for _ in 0..3 {
            assert_eq!(task.tick().unwrap(), TickOutcome::Completed);
        }

        assert_eq!(fx.tombstone_entries(), 3);
        let record = read_or_empty(fx.tombstone.path());
        assert!(record.contains(": T: port enumeration exploded"));
        assert!(!task.is_ticking());
        assert_eq!(task.stats().tombstone_entries, 3);
    }

    #[test]
    fn test_snapshot_replaced_each_tick() {
        let fx = Fixture::new();
        let task = fx.task(
            config(&[SampleCategory::ComPorts]),
            Providers::unavailable().with_com_ports(FixedComPorts(vec!["COM1".into()])),
        );
        task.tick().unwrap();
        assert_eq!(task.snapshot().com_ports.len(), 1);

        task.reconfigure(config(&[SampleCategory::Processes]));
        assert_eq!(task.snapshot(), Snapshot::new());
        assert!(task.config().is_enabled(SampleCategory::Processes));
    }

    #[test]
    fn test_overlapping_tick_is_skipped() {
        let fx = Fixture::new();
        let slow = SlowProvider::new(Duration::from_millis(200));
        let task = Arc::new(fx.task(
            config(&[SampleCategory::ComPorts]),
            Providers::unavailable().with_com_ports(slow.clone()),
        ));

        let first = {
            let task = Arc::clone(&task);
            thread::spawn(move || task.tick().unwrap())
        };
        while !task.is_ticking() {
            thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(task.tick().unwrap(), TickOutcome::Skipped);
        assert_eq!(first.join().unwrap(), TickOutcome::Completed);
        assert_eq!(slow.calls(), 1);
        assert_eq!(task.stats().skipped, 1);
    }

    #[test]
    fn test_disabled_debug_suppresses_samples() {
        let fx = Fixture::new();
        fx.writer.set_debug_enabled(false);
        let task = fx.task(
            config(&[SampleCategory::ComPorts]),
            Providers::unavailable().with_com_ports(FixedComPorts(vec!["COM1".into()])),
        );
        task.tick().unwrap();
        assert!(fx.log().is_empty());
    }
}
