//! Per-task sample snapshot.

use std::collections::HashSet;

use super::device::{ComPortInfo, UsbDeviceInfo, render_com_ports, render_usb_devices};
use super::diagnostics::DiagnosticsRecord;
use super::process::ProcessInfo;
use super::SampleCategory;

/// Most recently refreshed values for one sampling task.
///
/// Each field is replaced wholesale on refresh; nothing from a previous tick
/// is merged into the new value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub com_ports: Vec<ComPortInfo>,
    pub processes: Vec<ProcessInfo>,
    pub usb_devices: Vec<UsbDeviceInfo>,
    pub diagnostics: DiagnosticsRecord,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets one category to its empty value.
    pub fn clear(&mut self, category: SampleCategory) {
        match category {
            SampleCategory::ComPorts => self.com_ports = Vec::new(),
            SampleCategory::Processes => self.processes = Vec::new(),
            SampleCategory::UsbDevices => self.usb_devices = Vec::new(),
            SampleCategory::Diagnostics => self.diagnostics = DiagnosticsRecord::default(),
        }
    }

    /// Renders one category into log messages.
    ///
    /// Ports and USB devices always produce exactly one message (possibly
    /// empty). Each process produces one message framed by newlines, with a
    /// thread list when its name is in `print_threads`. Diagnostics produce one
    /// message starting with a newline.
    pub fn render(&self, category: SampleCategory, print_threads: &HashSet<String>) -> Vec<String> {
        match category {
            SampleCategory::ComPorts => vec![render_com_ports(&self.com_ports)],
            SampleCategory::Processes => self
                .processes
                .iter()
                .map(|p| format!("\n{}\n", p.render(print_threads.contains(&p.name))))
                .collect(),
            SampleCategory::UsbDevices => vec![render_usb_devices(&self.usb_devices)],
            SampleCategory::Diagnostics => vec![format!("\n{}", self.diagnostics.render())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> Snapshot {
        Snapshot {
            com_ports: vec![ComPortInfo::new("COM1"), ComPortInfo::new("COM4")],
            processes: vec![
                ProcessInfo::with_thread_ids("app.exe", "\\app.exe", 10, 2, 1, &[5, 6]),
                ProcessInfo::with_thread_ids("svc.exe", "\\svc.exe", 11, 1, 1, &[7]),
            ],
            usb_devices: vec![UsbDeviceInfo::new("1-1", "usb:v0403p6001", "FT232R")],
            diagnostics: DiagnosticsRecord {
                mem_total_kb: Some(1024),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_render_com_ports_single_message() {
        let msgs = populated().render(SampleCategory::ComPorts, &HashSet::new());
        assert_eq!(msgs, vec!["COM1 | COM4".to_string()]);
    }

    #[test]
    fn test_render_processes_respects_print_threads() {
        let print: HashSet<String> = ["app.exe".to_string()].into_iter().collect();
        let msgs = populated().render(SampleCategory::Processes, &print);
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].starts_with("\nName: app.exe\n"));
        assert!(msgs[0].ends_with("Thread TIDs: 5 | 6\n"));
        assert!(!msgs[1].contains("Thread TIDs"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let snap = populated();
        let print: HashSet<String> = ["svc.exe".to_string()].into_iter().collect();
        for category in SampleCategory::ALL {
            assert_eq!(snap.render(category, &print), snap.render(category, &print));
        }
    }

    #[test]
    fn test_render_empty_snapshot() {
        let snap = Snapshot::new();
        let none = HashSet::new();
        assert_eq!(snap.render(SampleCategory::ComPorts, &none), vec![String::new()]);
        assert!(snap.render(SampleCategory::Processes, &none).is_empty());
        assert_eq!(snap.render(SampleCategory::UsbDevices, &none), vec![String::new()]);
        assert_eq!(snap.render(SampleCategory::Diagnostics, &none), vec!["\n".to_string()]);
    }

    #[test]
    fn test_clear_resets_only_one_category() {
        let mut snap = populated();
        snap.clear(SampleCategory::Processes);
        assert!(snap.processes.is_empty());
        assert_eq!(snap.com_ports.len(), 2);
        snap.clear(SampleCategory::Diagnostics);
        assert!(snap.diagnostics.is_empty());
    }
}
