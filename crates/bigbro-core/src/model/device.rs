//! Serial port and USB device records.

/// A serial (COM) port, e.g. `COM1` or `ttyUSB0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComPortInfo {
    pub name: String,
}

impl ComPortInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Joins port names with `" | "`; empty string when there are none.
pub fn render_com_ports(ports: &[ComPortInfo]) -> String {
    ports
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// A USB device connected at sampling time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDeviceInfo {
    pub device_id: String,
    pub pnp_device_id: String,
    pub description: String,
}

impl UsbDeviceInfo {
    pub fn new(
        device_id: impl Into<String>,
        pnp_device_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            pnp_device_id: pnp_device_id.into(),
            description: description.into(),
        }
    }

    /// Three-line device block.
    pub fn render(&self) -> String {
        format!(
            "Device ID: {}\nPnp Device ID: {}\nDescription: {}",
            self.device_id, self.pnp_device_id, self.description
        )
    }
}

/// Device blocks separated by newlines; empty string when there are none.
pub fn render_usb_devices(devices: &[UsbDeviceInfo]) -> String {
    devices
        .iter()
        .map(UsbDeviceInfo::render)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_com_ports() {
        let ports = vec![ComPortInfo::new("COM1"), ComPortInfo::new("COM4")];
        assert_eq!(render_com_ports(&ports), "COM1 | COM4");
        assert_eq!(render_com_ports(&ports[..1]), "COM1");
        assert_eq!(render_com_ports(&[]), "");
    }

    #[test]
    fn test_render_usb_devices() {
        let devices = vec![
            UsbDeviceInfo::new("1-1", "usb:v046DpC52B", "Unifying Receiver"),
            UsbDeviceInfo::new("1-2", "usb:v0403p6001", "FT232R USB UART"),
        ];
        let text = render_usb_devices(&devices);
        assert_eq!(text.lines().count(), 6);
        assert!(text.starts_with("Device ID: 1-1\n"));
        assert!(text.ends_with("Description: FT232R USB UART"));
        assert_eq!(render_usb_devices(&[]), "");
    }
}
