//! Providers backed by the Linux `/proc` filesystem.
//!
//! This module provides parsers and providers for reading process and
//! system information from the `/proc` virtual filesystem.

pub mod parser;
pub mod process;
pub mod system;

pub use process::ProcfsProcessProvider;
pub use system::ProcfsDiagnosticsProvider;
