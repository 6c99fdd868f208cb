//! bigbro-core - on-device diagnostic agent library.
//!
//! Provides:
//! - `fmt` - product-log line and file-name formatting
//! - `model` - sample data (ports, processes, USB devices, diagnostics) and its rendering
//! - `collector` - provider interfaces, Linux procfs/sysfs implementations, test doubles
//! - `logging` - rotating product-log writer and the crash tombstone
//! - `sampler` - task configuration, sampling tasks and the multi-rate scheduler

pub mod collector;
pub mod fmt;
pub mod logging;
pub mod model;
pub mod sampler;
