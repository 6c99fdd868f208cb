//! Sample data model.
//!
//! These are the in-memory values a sampling task refreshes on every tick and
//! renders into product-log messages. Nothing here is persisted in structured
//! form; only the rendered text reaches disk.

mod device;
mod diagnostics;
mod process;
mod snapshot;

pub use device::{ComPortInfo, UsbDeviceInfo, render_com_ports, render_usb_devices};
pub use diagnostics::DiagnosticsRecord;
pub use process::{ProcessInfo, ThreadInfo, link_threads};
pub use snapshot::Snapshot;

/// Kind of data a sampling task can collect.
///
/// The declaration order is the fixed refresh and emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SampleCategory {
    ComPorts,
    Processes,
    UsbDevices,
    Diagnostics,
}

impl SampleCategory {
    /// All categories in emission order.
    pub const ALL: [SampleCategory; 4] = [
        SampleCategory::ComPorts,
        SampleCategory::Processes,
        SampleCategory::UsbDevices,
        SampleCategory::Diagnostics,
    ];

    /// Short name used on the command line and in operational logs.
    pub fn as_str(self) -> &'static str {
        match self {
            SampleCategory::ComPorts => "com",
            SampleCategory::Processes => "proc",
            SampleCategory::UsbDevices => "usb",
            SampleCategory::Diagnostics => "diag",
        }
    }

    /// Parses a short name as produced by [`SampleCategory::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "com" => Some(SampleCategory::ComPorts),
            "proc" => Some(SampleCategory::Processes),
            "usb" => Some(SampleCategory::UsbDevices),
            "diag" => Some(SampleCategory::Diagnostics),
            _ => None,
        }
    }
}

impl std::fmt::Display for SampleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
