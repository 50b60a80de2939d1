//! Serial device access.
//!
//! The relay talks to the device through the [`SerialDevice`] trait so the
//! pumps can be exercised against [`FakeSerialDevice`] (and `mockall` mocks in
//! unit tests) instead of real hardware.
//!
//! # Two handles, one device
//!
//! The device→client pump only reads and the client→device pump only writes.
//! [`SerialHandle`] therefore holds two independent handles to the same port
//! (the native backend obtains the second with `try_clone`).  Each is behind
//! its own mutex, which is never contended because each direction has exactly
//! one actor.
//!
//! # Non-blocking reads
//!
//! [`SerialHandle::read_available`] first asks the driver how many bytes it
//! already holds and only then reads exactly that many, so it never waits for
//! the device.  Writes may block for up to the driver timeout and are moved
//! to Tokio's blocking pool.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use serialport::{DataBits, FlowControl, Parity, SerialPortType, StopBits};
use tracing::{debug, info};

use crate::domain::TunnelConfig;
use crate::infrastructure::error::TunnelError;

pub mod fake;

pub use fake::FakeSerialDevice;

/// Minimal byte-level contract the relay needs from a serial device.
#[cfg_attr(test, mockall::automock)]
pub trait SerialDevice {
    /// Number of received bytes waiting in the driver.
    fn bytes_to_read(&mut self) -> io::Result<u32>;

    /// Reads into `buf`, returning how many bytes were copied.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes all of `data` to the device.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;
}

/// A boxed device that can move between tasks and the blocking pool.
pub type BoxedSerialDevice = Box<dyn SerialDevice + Send>;

/// Shared access to one open serial device.
///
/// Cloning is cheap and yields another handle to the same device.
#[derive(Clone)]
pub struct SerialHandle {
    name: Arc<str>,
    reader: Arc<Mutex<BoxedSerialDevice>>,
    writer: Arc<Mutex<BoxedSerialDevice>>,
}

impl std::fmt::Debug for SerialHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SerialHandle {
    /// Wraps a reading and a writing handle to the same device.
    pub fn new(name: &str, reader: BoxedSerialDevice, writer: BoxedSerialDevice) -> Self {
        Self {
            name: Arc::from(name),
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// Device identifier used in log messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads every byte the driver currently holds into `buf`.
    ///
    /// `buf` is cleared first and resized to the number of bytes read.
    /// Returns `Ok(0)` immediately when nothing is pending.
    pub fn read_available(&self, buf: &mut Vec<u8>) -> io::Result<usize> {
        buf.clear();
        let mut device = lock_device(&self.reader)?;

        let pending = device.bytes_to_read()? as usize;
        if pending == 0 {
            return Ok(0);
        }

        buf.resize(pending, 0);
        let n = match device.read(buf) {
            Ok(n) => n,
            // The driver reported data but handed none over; treat as idle.
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => 0,
            Err(e) => return Err(e),
        };
        buf.truncate(n);
        Ok(n)
    }

    /// Writes `data` to the device on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns the driver's error, or an error if the blocking task panicked.
    pub async fn write_all(&self, data: Vec<u8>) -> io::Result<()> {
        let writer = Arc::clone(&self.writer);
        tokio::task::spawn_blocking(move || {
            let mut device = lock_device(&writer)?;
            device.write_all(&data)
        })
        .await
        .map_err(|e| io::Error::other(format!("serial write task failed: {e}")))?
    }
}

fn lock_device(
    device: &Mutex<BoxedSerialDevice>,
) -> io::Result<MutexGuard<'_, BoxedSerialDevice>> {
    device
        .lock()
        .map_err(|_| io::Error::other("serial device lock poisoned"))
}

// ── Native backend ────────────────────────────────────────────────────────────

/// [`SerialDevice`] backed by the `serialport` crate.
pub struct NativeSerialDevice {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialDevice for NativeSerialDevice {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.port.bytes_to_read().map_err(io::Error::from)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut self.port, buf)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut self.port, data)
    }
}

/// Opens the configured serial device as 8N1 without flow control.
///
/// # Errors
///
/// Returns [`TunnelError::SerialOpen`] if the device cannot be opened or its
/// handle cannot be duplicated.
pub fn open_serial(config: &TunnelConfig) -> Result<SerialHandle, TunnelError> {
    let device = config.serial_device.as_str();
    let open_error = |source| TunnelError::SerialOpen {
        device: device.to_string(),
        source,
    };

    let port = serialport::new(device, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(config.serial_write_timeout)
        .open()
        .map_err(open_error)?;
    let writer = port.try_clone().map_err(open_error)?;

    info!("serial device {device} open at {} baud", config.baud_rate);

    Ok(SerialHandle::new(
        device,
        Box::new(NativeSerialDevice { port }),
        Box::new(NativeSerialDevice { port: writer }),
    ))
}

// ── Port enumeration ──────────────────────────────────────────────────────────

/// A serial port present on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortListing {
    pub name: String,
    pub description: String,
}

/// Lists the serial ports of this machine, sorted by name.
///
/// # Errors
///
/// Returns [`TunnelError::PortEnumeration`] if the OS query fails.
pub fn list_ports() -> Result<Vec<PortListing>, TunnelError> {
    let mut ports: Vec<PortListing> = serialport::available_ports()
        .map_err(TunnelError::PortEnumeration)?
        .into_iter()
        .map(|p| PortListing {
            description: describe_port_type(&p.port_type),
            name: p.port_name,
        })
        .collect();
    ports.sort_by(|a, b| a.name.cmp(&b.name));
    debug!("found {} serial port(s)", ports.len());
    Ok(ports)
}

fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .or_else(|| usb.manufacturer.clone())
            .unwrap_or_else(|| format!("USB device {:04x}:{:04x}", usb.vid, usb.pid)),
        SerialPortType::PciPort => "PCI serial port".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth serial port".to_string(),
        SerialPortType::Unknown => "no description".to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
