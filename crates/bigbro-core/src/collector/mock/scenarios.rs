//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` and `/sys` states for the
//! process, diagnostics, serial port and USB providers.

use super::filesystem::MockFs;

impl MockFs {
    /// Creates a typical embedded system.
    ///
    /// Includes: init (PID 1) with one thread, a bash shell, an application
    /// under test with three threads, a kernel thread without an `exe` link,
    /// two real serial ports plus one placeholder UART, and two USB devices
    /// behind a root hub.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        // System-wide files
        fs.add_file("/proc/uptime", "12345.67 98765.43\n");
        fs.add_file("/proc/loadavg", "0.15 0.10 0.05 1/150 1234\n");
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
",
        );

        // Processes
        fs.add_process(1, "systemd", "/usr/lib/systemd/systemd", 0, &[1]);
        fs.add_process(2, "kthreadd", "", 0, &[2]);
        fs.add_process(1000, "bash", "/usr/bin/bash", 1, &[1000]);
        fs.add_process(1200, "app.bin", "/opt/app/app.bin", 1000, &[1200, 1201, 1202]);

        fs.add_serial_ports();
        fs.add_usb_devices();
        fs
    }

    /// Creates a system where `/proc` exists but holds no processes and the
    /// system files are missing.
    pub fn empty_system() -> Self {
        let mut fs = Self::new();
        fs.add_dir("/proc");
        fs.add_dir("/sys/class/tty");
        fs.add_dir("/sys/bus/usb/devices");
        fs
    }

    /// Creates a system with a process that exits between the directory
    /// listing and the status read (directory present, files gone).
    pub fn with_vanishing_process() -> Self {
        let mut fs = Self::typical_system();
        fs.add_dir("/proc/4000");
        fs
    }

    fn add_serial_ports(&mut self) {
        // Virtual consoles have no backing device
        self.add_dir("/sys/class/tty/tty0");
        self.add_dir("/sys/class/tty/console");

        // On-board UART
        self.add_dir("/sys/class/tty/ttyAMA0/device");
        self.add_link(
            "/sys/class/tty/ttyAMA0/device/subsystem",
            "../../../bus/amba",
        );

        // USB serial adapter
        self.add_dir("/sys/class/tty/ttyUSB0/device");
        self.add_link(
            "/sys/class/tty/ttyUSB0/device/subsystem",
            "../../../../../../bus/usb-serial",
        );

        // Legacy 8250 placeholder registered without hardware
        self.add_dir("/sys/class/tty/ttyS0/device");
        self.add_link(
            "/sys/class/tty/ttyS0/device/subsystem",
            "../../../bus/platform",
        );
    }

    fn add_usb_devices(&mut self) {
        // Root hub
        self.add_file("/sys/bus/usb/devices/usb1/idVendor", "1d6b\n");
        self.add_file("/sys/bus/usb/devices/usb1/idProduct", "0002\n");
        self.add_file("/sys/bus/usb/devices/usb1/product", "xHCI Host Controller\n");

        // FTDI serial adapter with serial number
        self.add_file("/sys/bus/usb/devices/1-1/idVendor", "0403\n");
        self.add_file("/sys/bus/usb/devices/1-1/idProduct", "6001\n");
        self.add_file("/sys/bus/usb/devices/1-1/product", "FT232R USB UART\n");
        self.add_file("/sys/bus/usb/devices/1-1/serial", "A50285BI\n");

        // Interface of the adapter, not a device
        self.add_file("/sys/bus/usb/devices/1-1:1.0/bInterfaceClass", "ff\n");

        // Device without product string
        self.add_file("/sys/bus/usb/devices/1-2/idVendor", "046d\n");
        self.add_file("/sys/bus/usb/devices/1-2/idProduct", "c52b\n");
        self.add_file("/sys/bus/usb/devices/1-2/manufacturer", "Logitech\n");
    }
}
