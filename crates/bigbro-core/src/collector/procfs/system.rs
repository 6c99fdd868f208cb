//! Diagnostics provider reading system-wide `/proc` files.

use crate::collector::procfs::parser::{parse_loadavg, parse_meminfo, parse_uptime};
use crate::collector::providers::{CollectError, DiagnosticsProvider};
use crate::collector::traits::FileSystem;
use crate::model::DiagnosticsRecord;
use std::path::PathBuf;

/// Reads uptime, load average and memory from `/proc`.
///
/// `meminfo` is required; uptime and load average are left empty when their
/// files are missing or malformed.
pub struct ProcfsDiagnosticsProvider<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
}

impl<F: FileSystem> ProcfsDiagnosticsProvider<F> {
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    fn read(&self, name: &str) -> Result<String, CollectError> {
        Ok(self.fs.read_to_string(&self.proc_path.join(name))?)
    }
}

impl<F: FileSystem> DiagnosticsProvider for ProcfsDiagnosticsProvider<F> {
    fn diagnostics(&self) -> Result<DiagnosticsRecord, CollectError> {
        let mem = parse_meminfo(&self.read("meminfo")?)
            .map_err(|e| CollectError::Parse(format!("meminfo: {}", e.message)))?;

        let uptime_secs = self
            .read("uptime")
            .ok()
            .and_then(|c| parse_uptime(&c).ok());
        let load_average = self
            .read("loadavg")
            .ok()
            .and_then(|c| parse_loadavg(&c).ok());

        Ok(DiagnosticsRecord {
            uptime_secs,
            load_average,
            mem_total_kb: mem.mem_total,
            mem_available_kb: mem.mem_available,
        })
    }
}
