//! Providers backed by the Linux `/sys` filesystem.

mod tty;
mod usb;

pub use tty::SysfsComPortProvider;
pub use usb::SysfsUsbDeviceProvider;
