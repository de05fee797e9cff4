use crate::core::protocol::ReplyStatus;
use thiserror::Error;

/// FluidCom unified error type
#[derive(Error, Debug)]
pub enum FluidComError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid device address: {0} (valid range is 0-127)")]
    InvalidAddress(u8),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("A command is already in flight; use force to override")]
    CommandInFlight,

    #[error("No reply is pending on this session")]
    NoReplyPending,

    #[error("Connection failed: no device found at address {address} on port '{port}' (tried baud rates {baud_rates:?})")]
    NoDeviceFound {
        port: String,
        address: u8,
        baud_rates: Vec<u32>,
    },

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("Device replied with error status: {0}")]
    DeviceError(ReplyStatus),

    #[error("Timed out after {timeout_ms}ms waiting for a reply")]
    ReplyTimeout { timeout_ms: u64 },

    #[error("Command {command} is not supported by {family} devices")]
    UnsupportedCommand { command: String, family: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    Output(String),
}

/// Broad classes of failure, one per corrective action a caller can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The device understood the frame and refused it: fix the parameters.
    DeviceRejected,
    /// The device or the session is still working on a previous command: keep polling.
    DeviceBusy,
    /// Nothing usable came back over the link: re-establish the connection.
    LinkFailure,
    /// Bytes arrived but did not form a valid frame.
    ProtocolViolation,
    /// The caller asked for something invalid before anything hit the wire.
    Usage,
}

impl FluidComError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FluidComError::DeviceError(ReplyStatus::MotorBusy)
            | FluidComError::DeviceError(ReplyStatus::TaskExecution)
            | FluidComError::CommandInFlight => ErrorCategory::DeviceBusy,
            FluidComError::DeviceError(_) => ErrorCategory::DeviceRejected,
            FluidComError::Serial(_)
            | FluidComError::Io(_)
            | FluidComError::NoDeviceFound { .. }
            | FluidComError::ReplyTimeout { .. } => ErrorCategory::LinkFailure,
            FluidComError::MalformedFrame(_) | FluidComError::ChecksumMismatch { .. } => {
                ErrorCategory::ProtocolViolation
            }
            _ => ErrorCategory::Usage,
        }
    }
}

pub type FluidComResult<T> = Result<T, FluidComError>;
