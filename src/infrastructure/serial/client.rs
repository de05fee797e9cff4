use crate::core::link::{Link, LinkOpener};
use crate::domain::error::{FluidComError, FluidComResult};
use serde::Serialize;
use serialport::{SerialPort, SerialPortType};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, info};

/// Blocking read timeout on the port; reads are gated on `bytes_to_read`
/// so this only bounds a misbehaving driver.
const PORT_TIMEOUT: Duration = Duration::from_millis(100);

/// Serial port opened 8N1 without flow control.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    pub fn open(port_name: &str, baud_rate: u32) -> FluidComResult<Self> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(PORT_TIMEOUT)
            .open()?;

        info!("Serial port {} opened at {} baud", port_name, baud_rate);
        Ok(Self { port })
    }

    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl Link for SerialLink {
    fn write_all(&mut self, bytes: &[u8]) -> FluidComResult<()> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_available(&mut self, max_len: usize) -> FluidComResult<Vec<u8>> {
        let available = self.port.bytes_to_read()? as usize;
        let len = available.min(max_len);
        if len == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; len];
        let n = match self.port.read(&mut buffer) {
            Ok(n) => n,
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => 0,
            Err(e) => return Err(e.into()),
        };
        buffer.truncate(n);
        Ok(buffer)
    }

    fn clear(&mut self) -> FluidComResult<()> {
        self.port.clear(serialport::ClearBuffer::All)?;
        Ok(())
    }
}

/// Opens [`SerialLink`]s for baud-rate probing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialOpener;

impl LinkOpener for SerialOpener {
    fn open(&mut self, port: &str, baud_rate: u32) -> FluidComResult<Box<dyn Link>> {
        debug!("Opening {} at {} baud", port, baud_rate);
        Ok(Box::new(SerialLink::open(port, baud_rate)?))
    }
}

/// A serial port visible to the system.
#[derive(Debug, Clone, Serialize)]
pub struct PortInfo {
    pub name: String,
    pub kind: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
}

impl From<serialport::SerialPortInfo> for PortInfo {
    fn from(info: serialport::SerialPortInfo) -> Self {
        let (kind, manufacturer, product, serial_number) = match info.port_type {
            SerialPortType::UsbPort(usb) => (
                format!("usb {:04x}:{:04x}", usb.vid, usb.pid),
                usb.manufacturer,
                usb.product,
                usb.serial_number,
            ),
            SerialPortType::PciPort => ("pci".to_string(), None, None, None),
            SerialPortType::BluetoothPort => ("bluetooth".to_string(), None, None, None),
            SerialPortType::Unknown => ("unknown".to_string(), None, None, None),
        };
        Self {
            name: info.port_name,
            kind,
            manufacturer,
            product,
            serial_number,
        }
    }
}

/// List serial ports, sorted by name.
pub fn list_ports() -> FluidComResult<Vec<PortInfo>> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()
        .map_err(FluidComError::from)?
        .into_iter()
        .map(PortInfo::from)
        .collect();
    ports.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_ports_does_not_panic() {
        // Enumeration may fail on hosts without serial support
        if let Ok(ports) = list_ports() {
            for port in &ports {
                assert!(!port.name.is_empty());
            }
        }
    }

    #[test]
    fn test_open_missing_port_fails() {
        let mut opener = SerialOpener;
        assert!(opener.open("/dev/fluidcom-does-not-exist", 9600).is_err());
    }
}
