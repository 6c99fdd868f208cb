//! Serial port discovery via `/sys/class/tty`.

use crate::collector::providers::{CollectError, ComPortProvider};
use crate::collector::traits::FileSystem;
use crate::model::ComPortInfo;
use std::path::PathBuf;

/// Lists serial ports that are backed by a device.
///
/// Virtual terminals have no `device` entry and are skipped. Ports on the
/// `platform` bus are the legacy 8250 placeholders the kernel registers
/// whether or not a UART is present; they are skipped too.
pub struct SysfsComPortProvider<F: FileSystem> {
    fs: F,
    sys_path: PathBuf,
}

impl<F: FileSystem> SysfsComPortProvider<F> {
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `sys_path` - Base path to sysfs (usually "/sys")
    pub fn new(fs: F, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            sys_path: sys_path.into(),
        }
    }
}

impl<F: FileSystem> ComPortProvider for SysfsComPortProvider<F> {
    fn com_ports(&self) -> Result<Vec<ComPortInfo>, CollectError> {
        let tty_dir = self.sys_path.join("class/tty");
        let mut names = Vec::new();

        for entry in self.fs.read_dir(&tty_dir)? {
            let device = entry.join("device");
            if !self.fs.exists(&device) {
                continue;
            }
            let subsystem = self
                .fs
                .read_link(&device.join("subsystem"))
                .ok()
                .and_then(|target| target.file_name().map(|n| n.to_string_lossy().into_owned()));
            if subsystem.as_deref() == Some("platform") {
                continue;
            }
            if let Some(name) = entry.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names.into_iter().map(ComPortInfo::new).collect())
    }
}
