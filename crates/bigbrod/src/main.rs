//! bigbrod - on-device diagnostic agent.
//!
//! Periodically samples serial ports, processes, USB devices and system
//! diagnostics at several independent rates and appends timestamped lines to
//! a product log. Startup logging goes to a temporary file that is renamed to
//! a dated name once the agent has settled.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[cfg(target_os = "linux")]
use bigbro_core::collector::{RealFs, system_providers};
use bigbro_core::collector::Providers;
use bigbro_core::fmt::{APP_NAME, TOMBSTONE_FILE_NAME};
use bigbro_core::logging::{LogError, RotatingLogWriter, Tombstone, spawn_settle_rename};
use bigbro_core::sampler::{SampleCategory, Scheduler, SchedulerError, TaskConfig};

/// On-device diagnostic agent.
#[derive(Parser, Debug)]
#[command(name = "bigbrod", about = "On-device diagnostic agent", version)]
struct Args {
    /// Directory for product log files. Created if missing.
    #[arg(short, long, default_value = "./logs")]
    log_dir: PathBuf,

    /// Crash record file. Defaults to BB-TOMBSTONE.txt in the log directory.
    #[arg(long, value_name = "PATH")]
    tombstone: Option<PathBuf>,

    /// Seconds before the temporary log file is renamed to its dated name.
    #[arg(long, default_value = "20")]
    rename_delay: u64,

    /// Sampling task as NAME:DUE_MS:PERIOD_MS:CATEGORIES, where CATEGORIES
    /// is a comma list of com, proc, usb, diag. A task with no categories is
    /// registered but not started. Repeat for several tasks.
    #[arg(long = "task", value_name = "SPEC", value_parser = parse_task_spec)]
    tasks: Vec<TaskSpec>,

    /// Also list thread IDs for processes with this name. Repeatable.
    #[arg(long = "print-threads", value_name = "NAME")]
    print_threads: Vec<String>,

    /// Path to proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: PathBuf,

    /// Path to sysfs (for testing/mocking).
    #[arg(long, default_value = "/sys")]
    sys_path: PathBuf,

    /// Do not write BB-TRACE lines.
    #[arg(long)]
    no_trace: bool,

    /// Do not write BB-DEBUG lines.
    #[arg(long)]
    no_debug: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Task as given on the command line, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TaskSpec {
    name: String,
    due_ms: u64,
    period_ms: u64,
    categories: Vec<SampleCategory>,
}

/// Parses `NAME:DUE_MS:PERIOD_MS:CATEGORIES`.
fn parse_task_spec(s: &str) -> Result<TaskSpec, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let [name, due, period, categories] = parts.as_slice() else {
        return Err(format!(
            "invalid task '{}': expected NAME:DUE_MS:PERIOD_MS:CATEGORIES",
            s
        ));
    };

    let due_ms = due
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid due time '{}': {}", due, e))?;
    let period_ms = period
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid period '{}': {}", period, e))?;
    let categories = categories
        .split(',')
        .filter(|c| !c.trim().is_empty())
        .map(|c| SampleCategory::parse(c).ok_or_else(|| format!("unknown category '{}'", c)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TaskSpec {
        name: name.trim().to_string(),
        due_ms,
        period_ms,
        categories,
    })
}

/// Tasks used when none are given on the command line.
fn default_task_specs() -> Vec<TaskSpec> {
    vec![
        TaskSpec {
            name: "SF".into(),
            due_ms: 0,
            period_ms: 1000,
            categories: Vec::new(),
        },
        TaskSpec {
            name: "F".into(),
            due_ms: 1,
            period_ms: 5000,
            categories: vec![SampleCategory::ComPorts],
        },
        TaskSpec {
            name: "IF".into(),
            due_ms: 2,
            period_ms: 30000,
            categories: vec![SampleCategory::Processes],
        },
    ]
}

/// Builds validated task configurations from the command line.
fn task_configs(args: &Args) -> Result<Vec<TaskConfig>, SchedulerError> {
    let specs = if args.tasks.is_empty() {
        default_task_specs()
    } else {
        args.tasks.clone()
    };

    specs
        .into_iter()
        .map(|spec| {
            let mut builder = TaskConfig::builder(spec.name)
                .due_time(Duration::from_millis(spec.due_ms))
                .period(Duration::from_millis(spec.period_ms))
                .categories(spec.categories);
            for name in &args.print_threads {
                builder = builder.print_threads_for(name.as_str());
            }
            builder.build().map_err(SchedulerError::from)
        })
        .collect()
}

/// Picks the providers available on this platform.
fn platform_providers(args: &Args) -> Providers {
    #[cfg(target_os = "linux")]
    {
        system_providers(RealFs::new(), &args.proc_path, &args.sys_path)
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = args;
        warn!("no system providers on this platform, all categories will be empty");
        Providers::unavailable()
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Grace period for ticks still writing when shutdown begins.
const SHUTDOWN_TICK_TIMEOUT: Duration = Duration::from_secs(5);

fn tombstone_path(args: &Args) -> PathBuf {
    args.tombstone
        .clone()
        .unwrap_or_else(|| args.log_dir.join(TOMBSTONE_FILE_NAME))
}

/// Opens the product log under a temporary name with the category filters
/// from the command line applied.
fn open_product_log(args: &Args) -> Result<RotatingLogWriter, LogError> {
    let writer = RotatingLogWriter::open_temporary(&args.log_dir)?;
    writer.set_trace_enabled(!args.no_trace);
    writer.set_debug_enabled(!args.no_debug);
    Ok(writer)
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    info!(
        "bigbrod {} ({}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BIGBRO_GIT_SHA")
    );
    info!(
        "Config: log_dir={}, rename_delay={}s, proc={}, sys={}",
        args.log_dir.display(),
        args.rename_delay,
        args.proc_path.display(),
        args.sys_path.display()
    );

    let tombstone = Arc::new(Tombstone::new(tombstone_path(&args), APP_NAME));

    let writer = match open_product_log(&args) {
        Ok(writer) => Arc::new(writer),
        Err(e) => {
            error!("Cannot open product log: {}", e);
            if let Err(te) = tombstone.epitaph(&e.to_string()) {
                error!("Cannot write tombstone {}: {}", tombstone.path().display(), te);
            }
            std::process::exit(1);
        }
    };
    info!("Product log: {}", writer.path().display());

    let started = format!(
        "{} {} started {}",
        APP_NAME,
        env!("CARGO_PKG_VERSION"),
        Local::now().format("%d-%m-%Y %H:%M:%S")
    );
    if let Err(e) = writer.audit(&started) {
        warn!("Cannot write startup line: {}", e);
    }

    let configs = match task_configs(&args) {
        Ok(configs) => configs,
        Err(e) => {
            error!("{}", e);
            if let Err(we) = writer.log_error_chain(&e) {
                warn!("Cannot log configuration error: {}", we);
            }
            std::process::exit(2);
        }
    };

    let mut scheduler = Scheduler::new(
        Arc::clone(&writer),
        Arc::clone(&tombstone),
        platform_providers(&args),
    );
    for config in configs {
        let idle = config.is_idle();
        let name = config.name().to_string();
        let handle = scheduler.add_task(config);
        if idle {
            debug!("Task {} registered without categories, not started", name);
            continue;
        }
        if let Err(e) = scheduler.start(handle) {
            error!("Cannot start task {}: {}", name, e);
            if let Err(we) = writer.log_error_chain(&e) {
                warn!("Cannot log start failure: {}", we);
            }
        }
    }

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let settle = match spawn_settle_rename(
        Arc::clone(&writer),
        Arc::clone(&tombstone),
        Duration::from_secs(args.rename_delay),
        Arc::clone(&running),
    ) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Cannot start log rename thread, keeping temporary name: {}", e);
            None
        }
    };

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    info!("Shutting down...");
    scheduler.stop_all();
    if !scheduler.wait_idle(SHUTDOWN_TICK_TIMEOUT) {
        warn!(
            "{} tick(s) still running after {}s, product log may be incomplete",
            scheduler.ticks_in_flight(),
            SHUTDOWN_TICK_TIMEOUT.as_secs()
        );
    }

    if let Some(handle) = settle
        && handle.join().is_err()
    {
        warn!("Log rename thread panicked");
    }
    if let Err(e) = writer.flush() {
        error!("Failed to flush product log: {}", e);
    }

    info!("Shutdown complete, product log at {}", writer.path().display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigbro_core::collector::mock::FixedComPorts;

    #[test]
    fn test_parse_task_spec() {
        let spec = parse_task_spec("IF:2:30000:proc,com").unwrap();
        assert_eq!(
            spec,
            TaskSpec {
                name: "IF".into(),
                due_ms: 2,
                period_ms: 30000,
                categories: vec![SampleCategory::Processes, SampleCategory::ComPorts],
            }
        );
    }

    #[test]
    fn test_parse_task_spec_without_categories() {
        let spec = parse_task_spec("SF:0:1000:").unwrap();
        assert!(spec.categories.is_empty());
    }

    #[test]
    fn test_parse_task_spec_errors() {
        assert!(parse_task_spec("F:1:5000").is_err());
        assert!(parse_task_spec("F:x:5000:com").is_err());
        assert!(parse_task_spec("F:1:-5:com").is_err());
        assert!(
            parse_task_spec("F:1:5000:gps")
                .unwrap_err()
                .contains("unknown category")
        );
    }

    #[test]
    fn test_default_tasks() {
        let args = Args::try_parse_from(["bigbrod"]).unwrap();
        let configs = task_configs(&args).unwrap();

        let names: Vec<&str> = configs.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["SF", "F", "IF"]);
        assert!(configs[0].is_idle());
        assert_eq!(configs[1].period(), Duration::from_secs(5));
        assert!(configs[1].is_enabled(SampleCategory::ComPorts));
        assert_eq!(configs[2].due_time(), Duration::from_millis(2));
        assert!(configs[2].is_enabled(SampleCategory::Processes));
        assert_eq!(args.rename_delay, 20);
    }

    #[test]
    fn test_custom_tasks_and_print_threads() {
        let args = Args::try_parse_from([
            "bigbrod",
            "--task",
            "diag:0:250:diag,usb",
            "--print-threads",
            "app.bin",
        ])
        .unwrap();
        let configs = task_configs(&args).unwrap();

        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].period(), Duration::from_millis(250));
        assert!(configs[0].print_threads().contains("app.bin"));
        let order: Vec<SampleCategory> = configs[0].categories().collect();
        assert_eq!(
            order,
            vec![SampleCategory::UsbDevices, SampleCategory::Diagnostics]
        );
    }

    #[test]
    fn test_zero_period_rejected() {
        let args = Args::try_parse_from(["bigbrod", "--task", "F:0:0:com"]).unwrap();
        assert!(matches!(
            task_configs(&args),
            Err(SchedulerError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_task_rejected_by_cli() {
        assert!(Args::try_parse_from(["bigbrod", "--task", "F:1"]).is_err());
    }

    #[test]
    fn test_tombstone_path_default_and_override() {
        let args = Args::try_parse_from(["bigbrod", "-l", "/var/log/bb"]).unwrap();
        assert_eq!(
            tombstone_path(&args),
            PathBuf::from("/var/log/bb").join(TOMBSTONE_FILE_NAME)
        );

        let args =
            Args::try_parse_from(["bigbrod", "--tombstone", "/data/crash.txt"]).unwrap();
        assert_eq!(tombstone_path(&args), PathBuf::from("/data/crash.txt"));
    }

    #[test]
    fn test_product_log_lifecycle() {
        let tmp = tempfile::TempDir::new().unwrap();
        let log_dir = tmp.path().join("logs");
        let args = Args::try_parse_from([
            "bigbrod",
            "-l",
            log_dir.to_str().unwrap(),
            "--no-trace",
            "--task",
            "F:0:1000:com",
        ])
        .unwrap();

        let writer = Arc::new(open_product_log(&args).unwrap());
        let temp_path = writer.path().to_path_buf();
        assert_eq!(temp_path.parent(), Some(log_dir.as_path()));
        let temp_name = temp_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(temp_name.starts_with("BBT "));

        writer.trace("hidden").unwrap();
        writer.audit("agent up").unwrap();

        let tombstone = Arc::new(Tombstone::new(tombstone_path(&args), APP_NAME));
        let providers =
            Providers::unavailable().with_com_ports(FixedComPorts(vec!["COM3".into()]));
        let mut scheduler = Scheduler::new(Arc::clone(&writer), tombstone, providers);
        let configs = task_configs(&args).unwrap();
        assert_eq!(configs.len(), 1);
        let handle = scheduler.add_task(configs.into_iter().next().unwrap());
        scheduler.tick_now(handle).unwrap();

        let dated = writer.rotate_to_dated().unwrap();
        assert_eq!(dated.parent(), Some(log_dir.as_path()));
        assert!(!temp_path.exists());

        writer.debug("after rename").unwrap();
        writer.flush().unwrap();
        let content = std::fs::read_to_string(&dated).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].ends_with("BB-AUDIT agent up"));
        assert!(lines.iter().any(|l| l.ends_with("BB-DEBUG COM3")));
        assert!(lines.last().unwrap().ends_with("BB-DEBUG after rename"));
        assert!(!content.contains("hidden"));
        assert!(!tombstone_path(&args).exists());
    }
}
