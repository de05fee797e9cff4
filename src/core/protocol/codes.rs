//! Command codes.
//!
//! A handful of codes mean the same thing on every device; the rest depend on
//! the device family and sometimes collide (0x4D aspirates on a single-channel
//! pump but reports valve status on a multichannel one). Lookups go through a
//! [`CommandTable`] built once per device: the protocol-wide layer first, then
//! the family layer, later entries replacing earlier ones.

use crate::domain::error::{FluidComError, FluidComResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Baud rates a device may be configured for, in probing order.
pub const STANDARD_BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

/// Family of device sharing one command vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceFamily {
    RotaryValve,
    SyringePump,
    MultichannelSyringePump,
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceFamily::RotaryValve => write!(f, "rotary valve"),
            DeviceFamily::SyringePump => write!(f, "syringe pump"),
            DeviceFamily::MultichannelSyringePump => write!(f, "multichannel syringe pump"),
        }
    }
}

/// Commands sent in common frames, named by what they do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // Queries
    GetAddress,
    GetRs232BaudRate,
    GetRs485BaudRate,
    GetCanBaudRate,
    GetPowerOnResetState,
    GetCanDestinationAddress,
    GetSubdivision,
    GetMaxSpeed,
    GetCurrentChannel,
    GetFirmwareVersion,
    GetMotorStatus,
    GetValveStatus,
    GetPlungerPosition,
    SyncPlungerPosition,
    // Actions
    Halt,
    ResetPlunger,
    ForcedReset,
    SetSpeed,
    MovePlungerAbsolute,
    DispenseSteps,
    AspirateSteps,
    ValveClockwiseSteps,
    ValveCounterClockwiseSteps,
    ValveToPort,
    ResetValve,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Codes sent in factory frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FactoryCommand {
    Address = 0x00,
    Rs232BaudRate = 0x01,
    Rs485BaudRate = 0x02,
    CanBaudRate = 0x03,
    PowerOnReset = 0x0E,
    CanDestinationAddress = 0x10,
    MulticastChannel1Address = 0x50,
    MulticastChannel2Address = 0x51,
    MulticastChannel3Address = 0x52,
    MulticastChannel4Address = 0x53,
    ParameterLock = 0xFC,
    FactoryReset = 0xFF,
}

impl FactoryCommand {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Decode the parameter of a baud-rate query reply.
pub fn baud_rate_from_code(code: u16) -> Option<u32> {
    STANDARD_BAUD_RATES.get(usize::from(code)).copied()
}

/// Encode a baud rate for a baud-rate factory command.
pub fn baud_rate_to_code(baud_rate: u32) -> Option<u16> {
    STANDARD_BAUD_RATES
        .iter()
        .position(|&b| b == baud_rate)
        .map(|i| i as u16)
}

const PROTOCOL_CODES: &[(Command, u8)] = &[
    (Command::GetAddress, 0x20),
    (Command::GetRs232BaudRate, 0x21),
    (Command::GetRs485BaudRate, 0x22),
    (Command::GetCanBaudRate, 0x23),
    (Command::GetPowerOnResetState, 0x2E),
    (Command::GetCanDestinationAddress, 0x30),
    (Command::GetFirmwareVersion, 0x3F),
    (Command::GetMotorStatus, 0x4A),
    (Command::Halt, 0x49),
];

const ROTARY_VALVE_CODES: &[(Command, u8)] = &[
    (Command::GetCurrentChannel, 0x3E),
    (Command::ValveClockwiseSteps, 0x42),
    (Command::ValveCounterClockwiseSteps, 0x43),
    (Command::ValveToPort, 0x44),
    (Command::ResetValve, 0x45),
];

const SYRINGE_PUMP_CODES: &[(Command, u8)] = &[
    (Command::GetSubdivision, 0x25),
    (Command::GetMaxSpeed, 0x27),
    (Command::GetCurrentChannel, 0x3E),
    (Command::GetPlungerPosition, 0x66),
    (Command::SyncPlungerPosition, 0x67),
    (Command::DispenseSteps, 0x42),
    (Command::AspirateSteps, 0x4D),
    (Command::ResetPlunger, 0x45),
    (Command::SetSpeed, 0x4B),
    (Command::MovePlungerAbsolute, 0x4E),
    (Command::ForcedReset, 0x4F),
];

const MULTICHANNEL_SYRINGE_PUMP_CODES: &[(Command, u8)] = &[
    (Command::GetCurrentChannel, 0xAE),
    (Command::GetValveStatus, 0x4D),
    (Command::GetPlungerPosition, 0x66),
    (Command::SyncPlungerPosition, 0x67),
    (Command::ValveClockwiseSteps, 0x42),
    (Command::ValveCounterClockwiseSteps, 0x43),
    (Command::ValveToPort, 0x44),
    (Command::ResetValve, 0x4C),
    (Command::ResetPlunger, 0x45),
    (Command::SetSpeed, 0x4B),
    (Command::MovePlungerAbsolute, 0x4E),
    (Command::ForcedReset, 0x4F),
];

/// Code of a command that means the same on every family, if it is one.
/// Usable before the device family is known, e.g. while probing a link.
pub fn protocol_code(command: Command) -> Option<u8> {
    PROTOCOL_CODES
        .iter()
        .find(|(c, _)| *c == command)
        .map(|(_, code)| *code)
}

/// Immutable command-to-code lookup for one device family.
#[derive(Debug, Clone)]
pub struct CommandTable {
    family: DeviceFamily,
    codes: HashMap<Command, u8>,
}

impl CommandTable {
    pub fn for_family(family: DeviceFamily) -> Self {
        let overlay = match family {
            DeviceFamily::RotaryValve => ROTARY_VALVE_CODES,
            DeviceFamily::SyringePump => SYRINGE_PUMP_CODES,
            DeviceFamily::MultichannelSyringePump => MULTICHANNEL_SYRINGE_PUMP_CODES,
        };

        let codes = PROTOCOL_CODES
            .iter()
            .chain(overlay.iter())
            .copied()
            .collect();

        Self { family, codes }
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    pub fn supports(&self, command: Command) -> bool {
        self.codes.contains_key(&command)
    }

    pub fn code(&self, command: Command) -> FluidComResult<u8> {
        self.codes
            .get(&command)
            .copied()
            .ok_or_else(|| FluidComError::UnsupportedCommand {
                command: command.to_string(),
                family: self.family.to_string(),
            })
    }
}
