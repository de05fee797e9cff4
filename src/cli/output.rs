use crate::cli::args::OutputFormat;
use crate::core::device::DeviceInfo;
use crate::core::protocol::Reply;
use crate::core::session::{Session, SessionStatistics};
use crate::domain::config::{DeviceConfig, FluidComConfig};
use crate::infrastructure::serial::PortInfo;
use serde::Serialize;
use std::io;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_ports(&self, ports: &[PortInfo]) -> Result<(), OutputError>;
    fn write_connection(&self, connection: &ConnectionSummary) -> Result<(), OutputError>;
    fn write_reply(&self, reply: &Reply) -> Result<(), OutputError>;
    fn write_device_info(&self, info: &DeviceInfo) -> Result<(), OutputError>;
    fn write_config(&self, config: &FluidComConfig) -> Result<(), OutputError>;
    fn write_devices(&self, devices: &[DeviceConfig]) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::FluidComError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Where a session ended up after probing
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSummary {
    pub session_id: String,
    pub port: String,
    pub baud_rate: u32,
    pub address: u8,
    pub state: String,
    pub statistics: SessionStatistics,
}

impl From<&Session> for ConnectionSummary {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id().to_string(),
            port: session.port().to_string(),
            baud_rate: session.baud_rate(),
            address: session.address().value(),
            state: session.state().to_string(),
            statistics: session.statistics().clone(),
        }
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), OutputError> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_ports(&self, ports: &[PortInfo]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                if ports.is_empty() {
                    println!("No serial ports found");
                }
                for port in ports {
                    match &port.product {
                        Some(product) => println!("{} ({}, {})", port.name, port.kind, product),
                        None => println!("{} ({})", port.name, port.kind),
                    }
                }
            }
            OutputFormat::Json => self.print_json(ports)?,
            OutputFormat::Table => {
                if !ports.is_empty() {
                    let rows: Vec<PortTableRow> = ports.iter().map(PortTableRow::from).collect();
                    println!("{}", Table::new(rows));
                }
            }
        }
        Ok(())
    }

    fn write_connection(&self, connection: &ConnectionSummary) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("Device found:");
                println!("  Port: {}", connection.port);
                println!("  Baud rate: {}", connection.baud_rate);
                println!("  Address: {:#04x}", connection.address);
                println!("  Session: {}", connection.session_id);
            }
            OutputFormat::Json => self.print_json(connection)?,
            OutputFormat::Table => {
                println!("{}", Table::new(vec![ConnectionTableRow::from(connection)]));
            }
        }
        Ok(())
    }

    fn write_reply(&self, reply: &Reply) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("Reply from {:#04x}:", reply.address);
                println!("  Status: {}", reply.status);
                println!("  Parameter: {} ({:#06x})", reply.parameter, reply.parameter);
            }
            OutputFormat::Json => self.print_json(reply)?,
            OutputFormat::Table => {
                println!("{}", Table::new(vec![ReplyTableRow::from(reply)]));
            }
        }
        Ok(())
    }

    fn write_device_info(&self, info: &DeviceInfo) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("Device Details:");
                println!("  Family: {}", info.family);
                println!("  Address: {:#04x}", info.address);
                println!("  RS232 baud rate: {}", info.rs232_baud_rate);
                println!("  RS485 baud rate: {}", info.rs485_baud_rate);
                println!("  Firmware version: {:#06x}", info.firmware_version);
                println!("  Motor status: {}", info.motor_status);
            }
            OutputFormat::Json => self.print_json(info)?,
            OutputFormat::Table => {
                println!("{}", Table::new(vec![DeviceInfoRow::from(info)]));
            }
        }
        Ok(())
    }

    fn write_config(&self, config: &FluidComConfig) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("FluidCom Configuration:");
                println!("  Log level: {}", config.global.log_level);
                println!("  Query timeout: {}ms", config.global.query_timeout_ms);
                println!("  Reply timeout: {}ms", config.global.reply_timeout_ms);
                println!("  Poll interval: {}ms", config.global.poll_interval_ms);

                if !config.devices.is_empty() {
                    println!("  Devices:");
                    for device in &config.devices {
                        let desc = if device.description.is_empty() { "No description" } else { &device.description };
                        println!("    {}: {}", device.name, desc);
                    }
                }
            }
            OutputFormat::Json => self.print_json(config)?,
            OutputFormat::Table => {
                if !config.devices.is_empty() {
                    let rows: Vec<DeviceTableRow> = config.devices.iter().map(DeviceTableRow::from).collect();
                    println!("{}", Table::new(rows));
                }
            }
        }
        Ok(())
    }

    fn write_devices(&self, devices: &[DeviceConfig]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                for device in devices {
                    println!("Device: {}", device.name);
                    let desc = if device.description.is_empty() { "No description" } else { &device.description };
                    println!("  Description: {}", desc);
                    println!("  Family: {}", device.family);
                    println!("  Port: {}", device.port);
                    println!("  Address: {:#04x}", device.address);
                    println!();
                }
            }
            OutputFormat::Json => self.print_json(devices)?,
            OutputFormat::Table => {
                if !devices.is_empty() {
                    let rows: Vec<DeviceTableRow> = devices.iter().map(DeviceTableRow::from).collect();
                    println!("{}", Table::new(rows));
                }
            }
        }
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct PortTableRow {
    name: String,
    kind: String,
    product: String,
}

impl From<&PortInfo> for PortTableRow {
    fn from(port: &PortInfo) -> Self {
        Self {
            name: port.name.clone(),
            kind: port.kind.clone(),
            product: port.product.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct ConnectionTableRow {
    port: String,
    baud: u32,
    address: String,
    session: String,
}

impl From<&ConnectionSummary> for ConnectionTableRow {
    fn from(connection: &ConnectionSummary) -> Self {
        Self {
            port: connection.port.clone(),
            baud: connection.baud_rate,
            address: format!("{:#04x}", connection.address),
            session: connection.session_id.clone(),
        }
    }
}

#[derive(Tabled)]
struct ReplyTableRow {
    address: String,
    status: String,
    parameter: u16,
}

impl From<&Reply> for ReplyTableRow {
    fn from(reply: &Reply) -> Self {
        Self {
            address: format!("{:#04x}", reply.address),
            status: reply.status.to_string(),
            parameter: reply.parameter,
        }
    }
}

#[derive(Tabled)]
struct DeviceInfoRow {
    family: String,
    address: String,
    rs232: u32,
    rs485: u32,
    firmware: String,
    motor: String,
}

impl From<&DeviceInfo> for DeviceInfoRow {
    fn from(info: &DeviceInfo) -> Self {
        Self {
            family: info.family.to_string(),
            address: format!("{:#04x}", info.address),
            rs232: info.rs232_baud_rate,
            rs485: info.rs485_baud_rate,
            firmware: format!("{:#06x}", info.firmware_version),
            motor: info.motor_status.to_string(),
        }
    }
}

/// Table row for device configuration
#[derive(Tabled)]
struct DeviceTableRow {
    name: String,
    family: String,
    port: String,
    address: String,
    description: String,
}

impl From<&DeviceConfig> for DeviceTableRow {
    fn from(device: &DeviceConfig) -> Self {
        Self {
            name: device.name.clone(),
            family: device.family.to_string(),
            port: device.port.clone(),
            address: format!("{:#04x}", device.address),
            description: device.description.clone(),
        }
    }
}
