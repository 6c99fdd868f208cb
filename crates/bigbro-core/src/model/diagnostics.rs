//! General system diagnostics (uptime, load, memory).

/// Point-in-time system diagnostics.
///
/// Every field is optional: a provider fills in what the platform exposes and
/// the "not yet available" provider returns the empty record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosticsRecord {
    /// Seconds since boot.
    pub uptime_secs: Option<f64>,
    /// 1, 5 and 15 minute load averages.
    pub load_average: Option<[f64; 3]>,
    pub mem_total_kb: Option<u64>,
    pub mem_available_kb: Option<u64>,
}

impl DiagnosticsRecord {
    pub fn is_empty(&self) -> bool {
        self.uptime_secs.is_none()
            && self.load_average.is_none()
            && self.mem_total_kb.is_none()
            && self.mem_available_kb.is_none()
    }

    /// One line per present field; empty string for an empty record.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        if let Some(uptime) = self.uptime_secs {
            lines.push(format!("Uptime: {:.2}s", uptime));
        }
        if let Some([one, five, fifteen]) = self.load_average {
            lines.push(format!("Load Average: {:.2} {:.2} {:.2}", one, five, fifteen));
        }
        if let Some(total) = self.mem_total_kb {
            lines.push(format!("Memory Total: {} kB", total));
        }
        if let Some(available) = self.mem_available_kb {
            lines.push(format!("Memory Available: {} kB", available));
        }
        lines.join("\n")
    }
}
