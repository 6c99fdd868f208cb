//! USB device discovery via `/sys/bus/usb/devices`.

use crate::collector::providers::{CollectError, UsbDeviceProvider};
use crate::collector::traits::FileSystem;
use crate::model::UsbDeviceInfo;
use std::path::{Path, PathBuf};

/// Lists USB devices (root hubs included, interfaces excluded).
///
/// The PnP identifier uses the Windows `USB\VID_xxxx&PID_yyyy[\serial]`
/// layout.
pub struct SysfsUsbDeviceProvider<F: FileSystem> {
    fs: F,
    sys_path: PathBuf,
}

impl<F: FileSystem> SysfsUsbDeviceProvider<F> {
    pub fn new(fs: F, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            sys_path: sys_path.into(),
        }
    }

    fn attr(&self, device: &Path, name: &str) -> Option<String> {
        self.fs
            .read_to_string(&device.join(name))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

impl<F: FileSystem> UsbDeviceProvider for SysfsUsbDeviceProvider<F> {
    fn usb_devices(&self) -> Result<Vec<UsbDeviceInfo>, CollectError> {
        let devices_dir = self.sys_path.join("bus/usb/devices");
        let mut entries = self.fs.read_dir(&devices_dir)?;
        entries.sort();

        let mut devices = Vec::new();
        for entry in entries {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            // "1-1:1.0" style entries are interfaces of a device
            if name.contains(':') {
                continue;
            }
            let Some(vendor) = self.attr(&entry, "idVendor") else {
                continue;
            };
            let product_id = self.attr(&entry, "idProduct").unwrap_or_default();

            let mut pnp = format!(
                "USB\\VID_{}&PID_{}",
                vendor.to_uppercase(),
                product_id.to_uppercase()
            );
            if let Some(serial) = self.attr(&entry, "serial") {
                pnp.push('\\');
                pnp.push_str(&serial);
            }

            let description = self
                .attr(&entry, "product")
                .or_else(|| self.attr(&entry, "manufacturer"))
                .unwrap_or_else(|| "Unknown device".to_string());

            devices.push(UsbDeviceInfo::new(name, pnp, description));
        }

        Ok(devices)
    }
}
