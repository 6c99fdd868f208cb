//! Provider interfaces consumed by sampling tasks.
//!
//! Each sample category has its own narrow trait. A task only ever calls the
//! provider of a category it has enabled, and a failing provider affects only
//! that category for the current tick.

use std::sync::Arc;

use crate::model::{ComPortInfo, DiagnosticsRecord, ProcessInfo, UsbDeviceInfo};

/// Error type for provider failures.
#[derive(Debug)]
pub enum CollectError {
    /// I/O error reading system files.
    Io(std::io::Error),
    /// Parse error in system files.
    Parse(String),
    /// The data source does not exist on this host.
    Unavailable(String),
    /// Any other provider-specific failure.
    Other(String),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
            CollectError::Unavailable(what) => write!(f, "{} is not available", what),
            CollectError::Other(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CollectError {
    fn from(e: std::io::Error) -> Self {
        CollectError::Io(e)
    }
}

/// Supplies the names of connected serial ports, in a stable order.
pub trait ComPortProvider: Send + Sync {
    fn com_ports(&self) -> Result<Vec<ComPortInfo>, CollectError>;
}

/// Supplies running processes with their threads, in a stable order.
pub trait ProcessProvider: Send + Sync {
    fn processes(&self) -> Result<Vec<ProcessInfo>, CollectError>;
}

/// Supplies connected USB devices.
pub trait UsbDeviceProvider: Send + Sync {
    fn usb_devices(&self) -> Result<Vec<UsbDeviceInfo>, CollectError>;
}

/// Supplies general system diagnostics.
pub trait DiagnosticsProvider: Send + Sync {
    fn diagnostics(&self) -> Result<DiagnosticsRecord, CollectError>;
}

/// Provider for data that is not yet available on this platform.
///
/// Always succeeds with an empty value, so a real implementation can replace
/// it without any change to tasks or the scheduler.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

impl ComPortProvider for Unavailable {
    fn com_ports(&self) -> Result<Vec<ComPortInfo>, CollectError> {
        Ok(Vec::new())
    }
}

impl ProcessProvider for Unavailable {
    fn processes(&self) -> Result<Vec<ProcessInfo>, CollectError> {
        Ok(Vec::new())
    }
}

impl UsbDeviceProvider for Unavailable {
    fn usb_devices(&self) -> Result<Vec<UsbDeviceInfo>, CollectError> {
        Ok(Vec::new())
    }
}

impl DiagnosticsProvider for Unavailable {
    fn diagnostics(&self) -> Result<DiagnosticsRecord, CollectError> {
        Ok(DiagnosticsRecord::default())
    }
}

/// The set of providers a sampling task reads from.
///
/// Cloning is cheap; all tasks of a scheduler share the same provider objects.
#[derive(Clone)]
pub struct Providers {
    pub com_ports: Arc<dyn ComPortProvider>,
    pub processes: Arc<dyn ProcessProvider>,
    pub usb_devices: Arc<dyn UsbDeviceProvider>,
    pub diagnostics: Arc<dyn DiagnosticsProvider>,
}

impl Providers {
    /// Every category backed by [`Unavailable`].
    pub fn unavailable() -> Self {
        Self {
            com_ports: Arc::new(Unavailable),
            processes: Arc::new(Unavailable),
            usb_devices: Arc::new(Unavailable),
            diagnostics: Arc::new(Unavailable),
        }
    }

    pub fn with_com_ports(mut self, provider: impl ComPortProvider + 'static) -> Self {
        self.com_ports = Arc::new(provider);
        self
    }

    pub fn with_processes(mut self, provider: impl ProcessProvider + 'static) -> Self {
        self.processes = Arc::new(provider);
        self
    }

    pub fn with_usb_devices(mut self, provider: impl UsbDeviceProvider + 'static) -> Self {
        self.usb_devices = Arc::new(provider);
        self
    }

    pub fn with_diagnostics(mut self, provider: impl DiagnosticsProvider + 'static) -> Self {
        self.diagnostics = Arc::new(provider);
        self
    }
}

impl Default for Providers {
    fn default() -> Self {
        Self::unavailable()
    }
}
