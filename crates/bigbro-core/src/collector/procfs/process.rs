//! Process provider reading `/proc/[pid]/` and `/proc/[pid]/task/`.

use crate::collector::procfs::parser::{parse_cmdline_exe, parse_proc_status};
use crate::collector::providers::{CollectError, ProcessProvider};
use crate::collector::traits::FileSystem;
use crate::model::{ProcessInfo, ThreadInfo};
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// Lists processes and their threads from a procfs tree.
///
/// Processes are returned in ascending PID order and threads in ascending TID
/// order, so consecutive ticks render in a stable order.
pub struct ProcfsProcessProvider<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
}

/// Outcome of reading a single process.
enum ProcessRead {
    Found(ProcessInfo),
    /// Process exited between listing and reading.
    Gone,
}

impl<F: FileSystem> ProcfsProcessProvider<F> {
    /// Creates a new process provider.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    /// Reads one process by PID.
    pub fn collect_process(&self, pid: u32) -> Result<Option<ProcessInfo>, CollectError> {
        match self.read_process(pid)? {
            ProcessRead::Found(info) => Ok(Some(info)),
            ProcessRead::Gone => Ok(None),
        }
    }

    fn read_process(&self, pid: u32) -> Result<ProcessRead, CollectError> {
        let proc_dir = self.proc_path.join(pid.to_string());

        let Ok(status_content) = self.fs.read_to_string(&proc_dir.join("status")) else {
            return Ok(ProcessRead::Gone);
        };
        let status = parse_proc_status(&status_content)
            .map_err(|e| CollectError::Parse(format!("pid {}: {}", pid, e.message)))?;

        let full_path = self.full_path(&proc_dir);
        let tids = self.numeric_entries(&proc_dir.join("task")).unwrap_or_default();
        let threads = tids.into_iter().map(|tid| ThreadInfo::new(tid, pid)).collect();

        Ok(ProcessRead::Found(ProcessInfo::new(
            status.name,
            full_path,
            pid,
            status.threads,
            status.ppid,
            threads,
        )))
    }

    /// Resolves the executable path: `exe` link first, then the first
    /// `cmdline` argument, else empty (kernel threads).
    fn full_path(&self, proc_dir: &Path) -> String {
        if let Ok(target) = self.fs.read_link(&proc_dir.join("exe")) {
            return target.display().to_string();
        }
        self.fs
            .read_to_string(&proc_dir.join("cmdline"))
            .ok()
            .and_then(|content| parse_cmdline_exe(&content))
            .unwrap_or_default()
    }

    /// Numeric directory entries (PIDs or TIDs), sorted ascending.
    fn numeric_entries(&self, dir: &Path) -> Result<Vec<u32>, CollectError> {
        let mut ids: Vec<u32> = self
            .fs
            .read_dir(dir)?
            .iter()
            .filter_map(|entry| entry.file_name().and_then(|n| n.to_str()))
            .filter_map(|name| name.parse::<u32>().ok())
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

impl<F: FileSystem> ProcessProvider for ProcfsProcessProvider<F> {
    /// Processes that disappear during collection are silently skipped.
    fn processes(&self) -> Result<Vec<ProcessInfo>, CollectError> {
        let pids = self.numeric_entries(&self.proc_path)?;
        let mut processes = Vec::with_capacity(pids.len());

        for pid in pids {
            match self.read_process(pid) {
                Ok(ProcessRead::Found(info)) => processes.push(info),
                Ok(ProcessRead::Gone) => trace!(pid, "process exited during collection"),
                Err(e) => warn!(pid, error = %e, "failed to collect process"),
            }
        }

        Ok(processes)
    }
}
