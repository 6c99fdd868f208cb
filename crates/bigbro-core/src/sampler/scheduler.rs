//! Multi-rate scheduler: one timer thread per started task.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::{ConfigError, SamplingTask, TaskConfig, TaskStats, TickOutcome};
use crate::collector::Providers;
use crate::logging::{RotatingLogWriter, Tombstone};

/// Scheduler-level failures.
#[derive(Debug)]
pub enum SchedulerError {
    /// The handle does not belong to this scheduler.
    UnknownTask,
    AlreadyStarted(String),
    /// The task must be stopped first.
    StillRunning(String),
    Config(ConfigError),
    /// The timer thread could not be created.
    Spawn(io::Error),
}

impl std::fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerError::UnknownTask => f.write_str("unknown task handle"),
            SchedulerError::AlreadyStarted(name) => write!(f, "task {} is already started", name),
            SchedulerError::StillRunning(name) => write!(f, "task {} is still running", name),
            SchedulerError::Config(e) => write!(f, "invalid task configuration: {}", e),
            SchedulerError::Spawn(e) => write!(f, "cannot start timer thread: {}", e),
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchedulerError::Config(e) => Some(e),
            SchedulerError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for SchedulerError {
    fn from(e: ConfigError) -> Self {
        SchedulerError::Config(e)
    }
}

/// Opaque reference to a task registered with a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(usize);

/// Stop signal shared between the scheduler and one timer thread.
#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    cvar: Condvar,
}

impl StopSignal {
    fn stop(&self) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.cvar.notify_all();
    }

    /// Sleeps until `deadline`. Returns false if stopped first.
    fn wait_until(&self, deadline: Instant) -> bool {
        let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *stopped {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            stopped = self
                .cvar
                .wait_timeout(stopped, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

struct Timer {
    signal: Arc<StopSignal>,
    thread: JoinHandle<()>,
}

struct Slot {
    task: Arc<SamplingTask>,
    timer: Option<Timer>,
}

/// Counts one tick thread from spawn request until the thread finishes.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owns the sampling tasks and fires each one on its own schedule.
///
/// Every started task has a dedicated timer thread, and every firing runs
/// on a short-lived thread of its own, so a slow tick never delays another
/// task. Overlapping firings of the same task are dropped by the task.
pub struct Scheduler {
    writer: Arc<RotatingLogWriter>,
    tombstone: Arc<Tombstone>,
    providers: Providers,
    slots: Vec<Slot>,
    ticks_in_flight: Arc<AtomicUsize>,
}

impl Scheduler {
    /// Creates a scheduler whose tasks share `writer`, `tombstone` and
    /// `providers`.
    pub fn new(
        writer: Arc<RotatingLogWriter>,
        tombstone: Arc<Tombstone>,
        providers: Providers,
    ) -> Self {
        Self {
            writer,
            tombstone,
            providers,
            slots: Vec::new(),
            ticks_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Registers a task in the stopped state.
    pub fn add_task(&mut self, config: TaskConfig) -> TaskHandle {
        debug!(task = config.name(), "task registered");
        let task = SamplingTask::new(
            config,
            self.providers.clone(),
            Arc::clone(&self.writer),
            Arc::clone(&self.tombstone),
        );
        self.slots.push(Slot {
            task: Arc::new(task),
            timer: None,
        });
        TaskHandle(self.slots.len() - 1)
    }

    pub fn handles(&self) -> impl Iterator<Item = TaskHandle> + '_ {
        (0..self.slots.len()).map(TaskHandle)
    }

    pub fn find(&self, name: &str) -> Option<TaskHandle> {
        self.slots
            .iter()
            .position(|slot| slot.task.config().name() == name)
            .map(TaskHandle)
    }

    fn slot(&self, handle: TaskHandle) -> Result<&Slot, SchedulerError> {
        self.slots.get(handle.0).ok_or(SchedulerError::UnknownTask)
    }

    fn slot_mut(&mut self, handle: TaskHandle) -> Result<&mut Slot, SchedulerError> {
        self.slots.get_mut(handle.0).ok_or(SchedulerError::UnknownTask)
    }

    pub fn task(&self, handle: TaskHandle) -> Result<&Arc<SamplingTask>, SchedulerError> {
        Ok(&self.slot(handle)?.task)
    }

    pub fn is_running(&self, handle: TaskHandle) -> Result<bool, SchedulerError> {
        Ok(self.slot(handle)?.timer.is_some())
    }

    pub fn stats(&self, handle: TaskHandle) -> Result<TaskStats, SchedulerError> {
        Ok(self.slot(handle)?.task.stats())
    }

    /// Starts firing the task after its due time, then once per period.
    pub fn start(&mut self, handle: TaskHandle) -> Result<(), SchedulerError> {
        let writer = Arc::clone(&self.writer);
        let in_flight = Arc::clone(&self.ticks_in_flight);
        let slot = self.slot_mut(handle)?;
        let config = slot.task.config();
        if slot.timer.is_some() {
            return Err(SchedulerError::AlreadyStarted(config.name().to_string()));
        }

        let signal = Arc::new(StopSignal::default());
        let thread = spawn_timer(Arc::clone(&slot.task), Arc::clone(&signal), in_flight, &config)
            .map_err(SchedulerError::Spawn)?;
        slot.timer = Some(Timer { signal, thread });

        info!(
            task = config.name(),
            due_ms = config.due_time().as_millis() as u64,
            period_ms = config.period().as_millis() as u64,
            "task started"
        );
        let line = format!(
            "Log generator started: {} | {}ms",
            config.name(),
            config.period().as_millis()
        );
        if let Err(e) = writer.debug(&line) {
            warn!(task = config.name(), error = %e, "cannot write lifecycle line");
        }
        Ok(())
    }

    /// Cancels future firings. A tick already running is left to finish.
    ///
    /// Stopping a task that is not running is a no-op.
    pub fn stop(&mut self, handle: TaskHandle) -> Result<(), SchedulerError> {
        let writer = Arc::clone(&self.writer);
        let slot = self.slot_mut(handle)?;
        let Some(timer) = slot.timer.take() else {
            return Ok(());
        };
        let name = slot.task.name();

        timer.signal.stop();
        if timer.thread.join().is_err() {
            warn!(task = %name, "timer thread panicked");
        }

        info!(task = %name, "task stopped");
        if let Err(e) = writer.debug(&format!("Log generator stopped: {}", name)) {
            warn!(task = %name, error = %e, "cannot write lifecycle line");
        }
        Ok(())
    }

    /// Replaces a stopped task's configuration and empties its snapshot.
    pub fn reconfigure(&mut self, handle: TaskHandle, config: TaskConfig) -> Result<(), SchedulerError> {
        let slot = self.slot(handle)?;
        if slot.timer.is_some() {
            return Err(SchedulerError::StillRunning(slot.task.name()));
        }
        info!(task = %slot.task.name(), new_name = config.name(), "task reconfigured");
        slot.task.reconfigure(config);
        Ok(())
    }

    /// Stops, reconfigures and starts the task again.
    pub fn restart(&mut self, handle: TaskHandle, config: TaskConfig) -> Result<(), SchedulerError> {
        self.stop(handle)?;
        self.reconfigure(handle, config)?;
        self.start(handle)
    }

    /// Runs one tick on the calling thread, outside the timer.
    pub fn tick_now(&self, handle: TaskHandle) -> Result<TickOutcome, SchedulerError> {
        let task = &self.slot(handle)?.task;
        Ok(run_tick(task))
    }

    /// Stops every running task.
    pub fn stop_all(&mut self) {
        for handle in (0..self.slots.len()).map(TaskHandle) {
            if let Err(e) = self.stop(handle) {
                warn!(error = %e, "failed to stop task");
            }
        }
    }

    /// Number of tick threads that have been spawned and not yet finished.
    pub fn ticks_in_flight(&self) -> usize {
        self.ticks_in_flight.load(Ordering::SeqCst)
    }

    /// Waits up to `timeout` for every tick thread to finish. Returns false
    /// if some are still running when the time is up.
    ///
    /// Stopped tasks fire no new ticks, so after [`Scheduler::stop_all`]
    /// this bounds the wait for the last product log lines.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.ticks_in_flight() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(IDLE_POLL_INTERVAL);
        }
        true
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            if let Some(timer) = slot.timer.take() {
                timer.signal.stop();
                let _ = timer.thread.join();
            }
        }
    }
}

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

fn spawn_timer(
    task: Arc<SamplingTask>,
    signal: Arc<StopSignal>,
    in_flight: Arc<AtomicUsize>,
    config: &TaskConfig,
) -> io::Result<JoinHandle<()>> {
    let due_time = config.due_time();
    let period = config.period();
    let name = config.name().to_string();

    thread::Builder::new()
        .name(format!("bb-timer-{}", name))
        .spawn(move || {
            let mut next = Instant::now() + due_time;
            while signal.wait_until(next) {
                fire(&task, &name, &in_flight);

                next += period;
                let now = Instant::now();
                while next <= now {
                    next += period;
                }
            }
            debug!(task = %name, "timer exited");
        })
}

/// Runs one tick on its own thread so the timer keeps its cadence.
fn fire(task: &Arc<SamplingTask>, name: &str, in_flight: &Arc<AtomicUsize>) {
    let task = Arc::clone(task);
    let guard = InFlight::enter(in_flight);
    let spawned = thread::Builder::new()
        .name(format!("bb-tick-{}", name))
        .spawn(move || {
            let _guard = guard;
            run_tick(&task);
        });
    if let Err(e) = spawned {
        warn!(task = name, error = %e, "cannot spawn tick thread, firing dropped");
    }
}

/// Ticks the task. A tombstone that cannot be written leaves no diagnostic
/// path, so the process exits.
fn run_tick(task: &SamplingTask) -> TickOutcome {
    match task.tick() {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(task = %task.name(), error = %e, "tombstone unwritable, terminating");
            std::process::exit(1);
        }
    }
}
