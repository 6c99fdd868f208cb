//! Scripted providers for tests.

use crate::collector::providers::{
    CollectError, ComPortProvider, DiagnosticsProvider, ProcessProvider, UsbDeviceProvider,
};
use crate::model::{ComPortInfo, DiagnosticsRecord, ProcessInfo, UsbDeviceInfo};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Always reports the same serial ports.
#[derive(Debug, Clone, Default)]
pub struct FixedComPorts(pub Vec<String>);

impl ComPortProvider for FixedComPorts {
    fn com_ports(&self) -> Result<Vec<ComPortInfo>, CollectError> {
        Ok(self.0.iter().map(ComPortInfo::new).collect())
    }
}

/// Always reports the same processes.
#[derive(Debug, Clone, Default)]
pub struct FixedProcesses(pub Vec<ProcessInfo>);

impl ProcessProvider for FixedProcesses {
    fn processes(&self) -> Result<Vec<ProcessInfo>, CollectError> {
        Ok(self.0.clone())
    }
}

/// Returns an error from every call and counts the calls.
#[derive(Debug, Clone, Default)]
pub struct FailingProvider {
    calls: Arc<AtomicUsize>,
}

impl FailingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self, what: &str) -> CollectError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        CollectError::Other(format!("{} provider failed", what))
    }
}

impl ComPortProvider for FailingProvider {
    fn com_ports(&self) -> Result<Vec<ComPortInfo>, CollectError> {
        Err(self.fail("com port"))
    }
}

impl ProcessProvider for FailingProvider {
    fn processes(&self) -> Result<Vec<ProcessInfo>, CollectError> {
        Err(self.fail("process"))
    }
}

impl UsbDeviceProvider for FailingProvider {
    fn usb_devices(&self) -> Result<Vec<UsbDeviceInfo>, CollectError> {
        Err(self.fail("usb"))
    }
}

impl DiagnosticsProvider for FailingProvider {
    fn diagnostics(&self) -> Result<DiagnosticsRecord, CollectError> {
        Err(self.fail("diagnostics"))
    }
}

/// Panics on every call with a fixed message.
#[derive(Debug, Clone)]
pub struct PanickingProvider {
    pub message: &'static str,
}

impl ComPortProvider for PanickingProvider {
    fn com_ports(&self) -> Result<Vec<ComPortInfo>, CollectError> {
        panic!("{}", self.message)
    }
}

impl ProcessProvider for PanickingProvider {
    fn processes(&self) -> Result<Vec<ProcessInfo>, CollectError> {
        panic!("{}", self.message)
    }
}

/// Blocks for a fixed delay per call and tracks how many calls overlap.
#[derive(Debug, Clone, Default)]
pub struct SlowProvider {
    delay: Duration,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl SlowProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    /// Number of calls started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ComPortProvider for SlowProvider {
    fn com_ports(&self) -> Result<Vec<ComPortInfo>, CollectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![ComPortInfo::new("SLOW")])
    }
}
