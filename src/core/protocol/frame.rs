//! Binary frame encoding and decoding.
//!
//! Outbound common frame (8 bytes):
//! `STX ADDR CMD B3 B4 ETX CHK_LO CHK_HI`
//!
//! Outbound factory frame (14 bytes):
//! `STX ADDR CMD PWD0..PWD3 P0..P3 ETX CHK_LO CHK_HI`
//!
//! Reply frame (8 bytes):
//! `STX ADDR STATUS PARAM_LO PARAM_HI ETX CHK_LO CHK_HI`
//!
//! All multi-byte fields are little-endian. The checksum is the sum of every
//! preceding byte, modulo 65536.

use crate::core::protocol::ReplyStatus;
use crate::domain::error::{FluidComError, FluidComResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const STX: u8 = 0xCC;
pub const ETX: u8 = 0xDD;

/// Password embedded in every factory command frame.
pub const FACTORY_PASSWORD: u32 = 0xFFEE_BBAA;

pub const COMMON_FRAME_LEN: usize = 8;
pub const FACTORY_FRAME_LEN: usize = 14;
pub const REPLY_FRAME_LEN: usize = 8;

/// Highest device slot addressable over the binary protocol.
pub const MAX_ADDRESS: u8 = 127;

/// Bus address of a single device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Address(u8);

impl Address {
    pub fn new(value: u8) -> FluidComResult<Self> {
        if value > MAX_ADDRESS {
            return Err(FluidComError::InvalidAddress(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Address {
    type Error = FluidComError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Address::new(value)
    }
}

impl From<Address> for u8 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// How `decode_reply` treats a non-normal status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMode {
    /// Any status other than `NormalState` becomes `FluidComError::DeviceError`.
    Strict,
    /// The status is returned as-is. Used for busy polling, where `MotorBusy`
    /// is an answer rather than a failure.
    Raw,
}

/// A decoded reply frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub address: u8,
    pub status: ReplyStatus,
    pub parameter: u16,
}

/// Sum of all bytes, modulo 65536.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

fn seal(mut body: Vec<u8>) -> Vec<u8> {
    let sum = checksum(&body);
    body.extend_from_slice(&sum.to_le_bytes());
    body
}

/// Encode a common (non-privileged) command frame.
pub fn encode_common(address: Address, command: u8, param: u16) -> Vec<u8> {
    let [lo, hi] = param.to_le_bytes();
    let mut body = Vec::with_capacity(COMMON_FRAME_LEN);
    body.extend_from_slice(&[STX, address.value(), command, lo, hi, ETX]);
    seal(body)
}

/// Encode a factory command frame. The password is normally
/// [`FACTORY_PASSWORD`].
pub fn encode_factory(address: Address, command: u8, password: u32, param: u32) -> Vec<u8> {
    let mut body = Vec::with_capacity(FACTORY_FRAME_LEN);
    body.extend_from_slice(&[STX, address.value(), command]);
    body.extend_from_slice(&password.to_le_bytes());
    body.extend_from_slice(&param.to_le_bytes());
    body.push(ETX);
    seal(body)
}

/// Decode and validate a reply frame.
///
/// Length is checked first, then the checksum, then the frame markers, and
/// only then is the status interpreted.
pub fn decode_reply(bytes: &[u8], mode: StatusMode) -> FluidComResult<Reply> {
    if bytes.len() != REPLY_FRAME_LEN {
        return Err(FluidComError::MalformedFrame(format!(
            "expected {} bytes, got {}",
            REPLY_FRAME_LEN,
            bytes.len()
        )));
    }

    let (body, tail) = bytes.split_at(REPLY_FRAME_LEN - 2);
    let expected = checksum(body);
    let actual = u16::from_le_bytes([tail[0], tail[1]]);
    if expected != actual {
        return Err(FluidComError::ChecksumMismatch { expected, actual });
    }

    if body[0] != STX || body[5] != ETX {
        return Err(FluidComError::MalformedFrame(format!(
            "bad frame markers {:#04x}/{:#04x}",
            body[0], body[5]
        )));
    }

    let reply = Reply {
        address: body[1],
        status: ReplyStatus::from_code(body[2]),
        parameter: u16::from_le_bytes([body[3], body[4]]),
    };

    if mode == StatusMode::Strict && !reply.status.is_normal() {
        return Err(FluidComError::DeviceError(reply.status));
    }

    Ok(reply)
}

/// Encode a reply frame. Devices produce these; the engine only needs it to
/// drive simulated links.
pub fn encode_reply(address: u8, status: ReplyStatus, parameter: u16) -> Vec<u8> {
    let [lo, hi] = parameter.to_le_bytes();
    seal(vec![STX, address, status.code(), lo, hi, ETX])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(value: u8) -> Address {
        Address::new(value).unwrap()
    }

    #[test]
    fn test_encode_common_layout() {
        let frame = encode_common(addr(0x31), 0x20, 0x0000);
        // 0xCC + 0x31 + 0x20 + 0xDD = 0x1FA
        assert_eq!(frame, vec![0xCC, 0x31, 0x20, 0x00, 0x00, 0xDD, 0xFA, 0x01]);
    }

    #[test]
    fn test_encode_common_param_is_little_endian() {
        let frame = encode_common(addr(0x00), 0x4E, 0x1770);
        assert_eq!(&frame[3..5], &[0x70, 0x17]);
        assert_eq!(frame.len(), COMMON_FRAME_LEN);
    }

    #[test]
    fn test_encode_factory_layout() {
        let frame = encode_factory(addr(0x00), 0x01, FACTORY_PASSWORD, 0x0000_0004);
        assert_eq!(frame.len(), FACTORY_FRAME_LEN);
        assert_eq!(&frame[..3], &[STX, 0x00, 0x01]);
        assert_eq!(&frame[3..7], &[0xAA, 0xBB, 0xEE, 0xFF]);
        assert_eq!(&frame[7..11], &[0x04, 0x00, 0x00, 0x00]);
        assert_eq!(frame[11], ETX);
        let sum = checksum(&frame[..12]);
        assert_eq!(&frame[12..], &sum.to_le_bytes());
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum(&[0xFF; 300]), (0xFFu32 * 300 % 65536) as u16);
    }

    #[test]
    fn test_decode_valid_reply() {
        let frame = encode_reply(0x31, ReplyStatus::NormalState, 0x0102);
        let reply = decode_reply(&frame, StatusMode::Strict).unwrap();
        assert_eq!(reply.address, 0x31);
        assert_eq!(reply.parameter, 0x0102);
        assert_eq!(reply.status, ReplyStatus::NormalState);
    }

    #[test]
    fn test_decode_wrong_length() {
        let frame = encode_reply(0x31, ReplyStatus::NormalState, 0);
        assert!(matches!(
            decode_reply(&frame[..7], StatusMode::Strict),
            Err(FluidComError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let mut frame = encode_reply(0x31, ReplyStatus::NormalState, 0x0010);
        frame[3] ^= 0x01;
        assert!(matches!(
            decode_reply(&frame, StatusMode::Strict),
            Err(FluidComError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_bad_markers_with_valid_checksum() {
        let frame = seal(vec![0xAB, 0x31, 0x00, 0x00, 0x00, ETX]);
        assert!(matches!(
            decode_reply(&frame, StatusMode::Strict),
            Err(FluidComError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_status_modes() {
        let frame = encode_reply(0x31, ReplyStatus::MotorBusy, 0);
        assert!(matches!(
            decode_reply(&frame, StatusMode::Strict),
            Err(FluidComError::DeviceError(ReplyStatus::MotorBusy))
        ));
        let reply = decode_reply(&frame, StatusMode::Raw).unwrap();
        assert_eq!(reply.status, ReplyStatus::MotorBusy);
    }

    #[test]
    fn test_address_range() {
        assert!(Address::new(127).is_ok());
        assert!(matches!(Address::new(128), Err(FluidComError::InvalidAddress(128))));
    }
}
