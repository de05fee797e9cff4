//! Device capabilities on top of a session.
//!
//! A [`Device`] owns one [`Session`] and the [`CommandTable`] for its family.
//! Plunger and valve operations are reached through short-lived views that
//! borrow both, so a multichannel pump exposes each without sharing a session
//! between two owners.

mod plunger;
mod valve;

pub use plunger::Plunger;
pub use valve::Valve;

use crate::core::protocol::{
    baud_rate_from_code, baud_rate_to_code, Address, Command, CommandTable, DeviceFamily,
    FactoryCommand, Reply, ReplyStatus,
};
use crate::core::session::Session;
use crate::domain::error::{FluidComError, FluidComResult};
use serde::Serialize;
use tracing::debug;

/// Plunger travel of a single-channel syringe pump, in steps.
pub const SYRINGE_PUMP_MAX_STEPS: u16 = 12000;
/// Plunger travel of a multichannel syringe pump, in steps.
pub const MULTICHANNEL_MAX_STEPS: u16 = 6000;

/// Physical limits used to reject out-of-range requests before they are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceOptions {
    /// Number of valve ports, when known.
    pub port_count: Option<u16>,
    /// Full plunger travel in steps.
    pub max_plunger_steps: u16,
}

impl DeviceOptions {
    pub fn for_family(family: DeviceFamily) -> Self {
        let max_plunger_steps = match family {
            DeviceFamily::MultichannelSyringePump => MULTICHANNEL_MAX_STEPS,
            _ => SYRINGE_PUMP_MAX_STEPS,
        };
        Self {
            port_count: None,
            max_plunger_steps,
        }
    }

    pub fn with_port_count(mut self, port_count: u16) -> Self {
        self.port_count = Some(port_count);
        self
    }

    pub fn with_max_plunger_steps(mut self, steps: u16) -> Self {
        self.max_plunger_steps = steps;
        self
    }
}

/// Identity and link settings reported by a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub family: DeviceFamily,
    pub address: u16,
    pub rs232_baud_rate: u32,
    pub rs485_baud_rate: u32,
    pub firmware_version: u16,
    pub motor_status: ReplyStatus,
}

pub struct Device {
    session: Session,
    table: CommandTable,
    options: DeviceOptions,
}

impl Device {
    pub fn new(session: Session, family: DeviceFamily, options: DeviceOptions) -> Self {
        Self {
            session,
            table: CommandTable::for_family(family),
            options,
        }
    }

    pub fn family(&self) -> DeviceFamily {
        self.table.family()
    }

    pub fn options(&self) -> &DeviceOptions {
        &self.options
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Plunger operations. Fails on a device with no plunger.
    pub fn plunger(&mut self) -> FluidComResult<Plunger<'_>> {
        if self.family() == DeviceFamily::RotaryValve {
            return Err(self.unsupported("plunger"));
        }
        Ok(Plunger::new(
            &mut self.session,
            &self.table,
            self.options.max_plunger_steps,
        ))
    }

    /// Valve operations. Fails on a device with no valve.
    pub fn valve(&mut self) -> FluidComResult<Valve<'_>> {
        if self.family() == DeviceFamily::SyringePump {
            return Err(self.unsupported("valve"));
        }
        Ok(Valve::new(
            &mut self.session,
            &self.table,
            self.options.port_count,
        ))
    }

    pub fn address(&mut self) -> FluidComResult<u16> {
        query(&mut self.session, &self.table, Command::GetAddress)
    }

    pub fn rs232_baud_rate(&mut self) -> FluidComResult<u32> {
        let code = query(&mut self.session, &self.table, Command::GetRs232BaudRate)?;
        decode_baud_rate(code)
    }

    pub fn rs485_baud_rate(&mut self) -> FluidComResult<u32> {
        let code = query(&mut self.session, &self.table, Command::GetRs485BaudRate)?;
        decode_baud_rate(code)
    }

    pub fn firmware_version(&mut self) -> FluidComResult<u16> {
        query(&mut self.session, &self.table, Command::GetFirmwareVersion)
    }

    /// Change the bus address. Takes effect on the device's next power cycle.
    pub fn set_address(&mut self, address: Address) -> FluidComResult<()> {
        self.factory(FactoryCommand::Address, u32::from(address.value()))
    }

    pub fn set_rs232_baud_rate(&mut self, baud_rate: u32) -> FluidComResult<()> {
        let code = encode_baud_rate(baud_rate)?;
        self.factory(FactoryCommand::Rs232BaudRate, code)
    }

    pub fn set_rs485_baud_rate(&mut self, baud_rate: u32) -> FluidComResult<()> {
        let code = encode_baud_rate(baud_rate)?;
        self.factory(FactoryCommand::Rs485BaudRate, code)
    }

    fn factory(&mut self, command: FactoryCommand, param: u32) -> FluidComResult<()> {
        debug!("Factory command: {:?} (param {})", command, param);
        self.session
            .send_factory(command.code(), param, true, false)?;
        Ok(())
    }

    /// Ask the device whether its motor is running. A busy motor comes back
    /// as `Ok(ReplyStatus::MotorBusy)`, not as an error.
    pub fn motor_status(&mut self) -> FluidComResult<ReplyStatus> {
        let code = self.table.code(Command::GetMotorStatus)?;
        Ok(self.session.query_raw(code, 0)?.status)
    }

    pub fn info(&mut self) -> FluidComResult<DeviceInfo> {
        Ok(DeviceInfo {
            family: self.family(),
            address: self.address()?,
            rs232_baud_rate: self.rs232_baud_rate()?,
            rs485_baud_rate: self.rs485_baud_rate()?,
            firmware_version: self.firmware_version()?,
            motor_status: self.motor_status()?,
        })
    }

    /// Whether the last no-wait command is still awaiting its reply.
    pub fn is_busy(&mut self) -> FluidComResult<bool> {
        self.session.is_busy()
    }

    /// Block until the last no-wait command replies.
    pub fn wait(&mut self) -> FluidComResult<Reply> {
        self.session.wait_for_reply(false)
    }

    /// Stop any motion immediately.
    pub fn halt(&mut self) -> FluidComResult<Reply> {
        let code = self.table.code(Command::Halt)?;
        self.session.cancel(code)
    }

    fn unsupported(&self, capability: &str) -> FluidComError {
        FluidComError::UnsupportedCommand {
            command: capability.to_string(),
            family: self.family().to_string(),
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("family", &self.family())
            .field("options", &self.options)
            .field("session", &self.session)
            .finish()
    }
}

fn decode_baud_rate(code: u16) -> FluidComResult<u32> {
    baud_rate_from_code(code)
        .ok_or_else(|| FluidComError::InvalidParameter(format!("Unknown baud rate code {}", code)))
}

fn encode_baud_rate(baud_rate: u32) -> FluidComResult<u32> {
    baud_rate_to_code(baud_rate)
        .map(u32::from)
        .ok_or_else(|| FluidComError::InvalidParameter(format!("Unsupported baud rate {}", baud_rate)))
}

/// Send a blocking query and return the reply parameter.
pub(crate) fn query(
    session: &mut Session,
    table: &CommandTable,
    command: Command,
) -> FluidComResult<u16> {
    debug!("Query: {}", command);
    let code = table.code(command)?;
    let reply = session
        .send_common(code, 0, true, false)?
        .ok_or(FluidComError::ReplyTimeout {
            timeout_ms: session.timeouts().reply.as_millis() as u64,
        })?;
    Ok(reply.parameter)
}

/// Send an action command. Returns the reply when `wait` is set.
pub(crate) fn act(
    session: &mut Session,
    table: &CommandTable,
    command: Command,
    param: u16,
    wait: bool,
) -> FluidComResult<Option<Reply>> {
    debug!("Action: {} (param {}, wait {})", command, param, wait);
    let code = table.code(command)?;
    session.send_common(code, param, wait, false)
}
