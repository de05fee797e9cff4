use serde::{Deserialize, Serialize};
use std::fmt;

/// Contents of the STATUS byte of a reply frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplyStatus {
    NormalState,
    FrameError,
    ParameterError,
    OptocouplerError,
    MotorBusy,
    MotorStalled,
    UnknownLocation,
    CommandRejected,
    IllegalLocation,
    TaskExecution,
    UnknownError,
}

impl ReplyStatus {
    /// Map a wire status code. Codes the protocol does not define are
    /// reported as `UnknownError`.
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => ReplyStatus::NormalState,
            0x01 => ReplyStatus::FrameError,
            0x02 => ReplyStatus::ParameterError,
            0x03 => ReplyStatus::OptocouplerError,
            0x04 => ReplyStatus::MotorBusy,
            0x05 => ReplyStatus::MotorStalled,
            0x06 => ReplyStatus::UnknownLocation,
            0x07 => ReplyStatus::CommandRejected,
            0x08 => ReplyStatus::IllegalLocation,
            0xFE => ReplyStatus::TaskExecution,
            _ => ReplyStatus::UnknownError,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            ReplyStatus::NormalState => 0x00,
            ReplyStatus::FrameError => 0x01,
            ReplyStatus::ParameterError => 0x02,
            ReplyStatus::OptocouplerError => 0x03,
            ReplyStatus::MotorBusy => 0x04,
            ReplyStatus::MotorStalled => 0x05,
            ReplyStatus::UnknownLocation => 0x06,
            ReplyStatus::CommandRejected => 0x07,
            ReplyStatus::IllegalLocation => 0x08,
            ReplyStatus::TaskExecution => 0xFE,
            ReplyStatus::UnknownError => 0xFF,
        }
    }

    pub fn is_normal(self) -> bool {
        self == ReplyStatus::NormalState
    }
}

impl fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReplyStatus::NormalState => "normal state",
            ReplyStatus::FrameError => "frame error",
            ReplyStatus::ParameterError => "parameter error",
            ReplyStatus::OptocouplerError => "optocoupler error",
            ReplyStatus::MotorBusy => "motor busy",
            ReplyStatus::MotorStalled => "motor stalled",
            ReplyStatus::UnknownLocation => "unknown location",
            ReplyStatus::CommandRejected => "command rejected",
            ReplyStatus::IllegalLocation => "illegal location",
            ReplyStatus::TaskExecution => "task execution pending",
            ReplyStatus::UnknownError => "unknown error",
        };
        write!(f, "{} ({:#04x})", name, self.code())
    }
}
