//! Data providers for the four sample categories.
//!
//! Sampling tasks never talk to the OS directly; they call one narrow provider
//! trait per category. The Linux implementations read `/proc` and `/sys`
//! through the [`FileSystem`] abstraction so they can be tested against an
//! in-memory tree.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                          Providers                             │
//! │  ComPortProvider   ProcessProvider   UsbDeviceProvider   Diag… │
//! └───────┬──────────────────┬─────────────────┬──────────────┬────┘
//!         │                  │                 │              │
//!  ┌──────▼───────┐  ┌───────▼───────┐ ┌───────▼──────┐ ┌─────▼──────┐
//!  │ SysfsComPort │  │ ProcfsProcess │ │ SysfsUsb     │ │ ProcfsDiag │
//!  │ /sys/class/  │  │ /proc/[pid]/  │ │ /sys/bus/usb │ │ /proc/*    │
//!  └──────┬───────┘  └───────┬───────┘ └───────┬──────┘ └─────┬──────┘
//!         └──────────────────┴────────┬────────┴──────────────┘
//!                              ┌──────▼──────┐
//!                              │  FileSystem │ (trait)
//!                              └──────┬──────┘
//!                       ┌─────────────┴─────────────┐
//!                ┌──────▼──────┐             ┌──────▼──────┐
//!                │   RealFs    │             │   MockFs    │
//!                └─────────────┘             └─────────────┘
//! ```
//!
//! Categories without a platform implementation use [`Unavailable`], which
//! returns empty values.
//!
//! # Usage
//!
//! ```
//! use bigbro_core::collector::{MockFs, system_providers};
//!
//! let providers = system_providers(MockFs::typical_system(), "/proc", "/sys");
//! let processes = providers.processes.processes().unwrap();
//! assert!(!processes.is_empty());
//! ```

pub mod mock;
pub mod procfs;
mod providers;
pub mod sysfs;
pub mod traits;

pub use mock::MockFs;
pub use procfs::{ProcfsDiagnosticsProvider, ProcfsProcessProvider};
pub use providers::{
    CollectError, ComPortProvider, DiagnosticsProvider, ProcessProvider, Providers, Unavailable,
    UsbDeviceProvider,
};
pub use sysfs::{SysfsComPortProvider, SysfsUsbDeviceProvider};
pub use traits::{FileSystem, RealFs};

use std::path::PathBuf;

/// Builds the procfs/sysfs-backed provider set.
///
/// # Arguments
/// * `fs` - Filesystem implementation (real or mock)
/// * `proc_path` - Base path to proc filesystem (usually "/proc")
/// * `sys_path` - Base path to sysfs (usually "/sys")
pub fn system_providers<F>(
    fs: F,
    proc_path: impl Into<PathBuf>,
    sys_path: impl Into<PathBuf>,
) -> Providers
where
    F: FileSystem + Clone + 'static,
{
    let proc_path = proc_path.into();
    let sys_path = sys_path.into();
    Providers::unavailable()
        .with_com_ports(SysfsComPortProvider::new(fs.clone(), sys_path.clone()))
        .with_processes(ProcfsProcessProvider::new(fs.clone(), proc_path.clone()))
        .with_usb_devices(SysfsUsbDeviceProvider::new(fs.clone(), sys_path))
        .with_diagnostics(ProcfsDiagnosticsProvider::new(fs, proc_path))
}
