use fluidcom::core::protocol::{
    checksum, decode_reply, encode_common, encode_factory, encode_reply, Address, ReplyStatus,
    StatusMode, COMMON_FRAME_LEN, ETX, FACTORY_FRAME_LEN, FACTORY_PASSWORD, REPLY_FRAME_LEN, STX,
};
use fluidcom::FluidComError;
use proptest::prelude::*;

fn any_status() -> impl Strategy<Value = ReplyStatus> {
    prop_oneof![
        Just(ReplyStatus::NormalState),
        Just(ReplyStatus::FrameError),
        Just(ReplyStatus::ParameterError),
        Just(ReplyStatus::OptocouplerError),
        Just(ReplyStatus::MotorBusy),
        Just(ReplyStatus::MotorStalled),
        Just(ReplyStatus::UnknownLocation),
        Just(ReplyStatus::CommandRejected),
        Just(ReplyStatus::IllegalLocation),
        Just(ReplyStatus::TaskExecution),
        Just(ReplyStatus::UnknownError),
    ]
}

proptest! {
    #[test]
    fn reply_fields_survive_encoding(address in any::<u8>(), parameter in any::<u16>(), status in any_status()) {
        let frame = encode_reply(address, status, parameter);
        let reply = decode_reply(&frame, StatusMode::Raw).unwrap();
        prop_assert_eq!(reply.address, address);
        prop_assert_eq!(reply.status, status);
        prop_assert_eq!(reply.parameter, parameter);
    }

    #[test]
    fn strict_mode_accepts_only_normal(address in any::<u8>(), parameter in any::<u16>(), status in any_status()) {
        let frame = encode_reply(address, status, parameter);
        match decode_reply(&frame, StatusMode::Strict) {
            Ok(reply) => prop_assert!(reply.status.is_normal()),
            Err(FluidComError::DeviceError(s)) => prop_assert_eq!(s, status),
            Err(e) => prop_assert!(false, "unexpected error: {}", e),
        }
    }

    #[test]
    fn single_byte_corruption_is_detected(
        parameter in any::<u16>(),
        index in 0..REPLY_FRAME_LEN,
        flip in 1u8..=255,
    ) {
        let mut frame = encode_reply(0x31, ReplyStatus::NormalState, parameter);
        frame[index] ^= flip;
        let is_checksum_mismatch = matches!(
            decode_reply(&frame, StatusMode::Strict),
            Err(FluidComError::ChecksumMismatch { .. })
        );
        prop_assert!(is_checksum_mismatch);
    }

    #[test]
    fn wrong_length_is_malformed(bytes in proptest::collection::vec(any::<u8>(), 0..32)) {
        prop_assume!(bytes.len() != REPLY_FRAME_LEN);
        let is_malformed = matches!(
            decode_reply(&bytes, StatusMode::Raw),
            Err(FluidComError::MalformedFrame(_))
        );
        prop_assert!(is_malformed);
    }

    #[test]
    fn common_frame_carries_fields(address in 0u8..=127, command in any::<u8>(), param in any::<u16>()) {
        let frame = encode_common(Address::new(address).unwrap(), command, param);
        prop_assert_eq!(frame.len(), COMMON_FRAME_LEN);
        prop_assert_eq!(frame[0], STX);
        prop_assert_eq!(frame[1], address);
        prop_assert_eq!(frame[2], command);
        prop_assert_eq!(u16::from_le_bytes([frame[3], frame[4]]), param);
        prop_assert_eq!(frame[5], ETX);
        prop_assert_eq!(u16::from_le_bytes([frame[6], frame[7]]), checksum(&frame[..6]));
    }

    #[test]
    fn factory_frame_carries_fields(address in 0u8..=127, command in any::<u8>(), param in any::<u32>()) {
        let frame = encode_factory(Address::new(address).unwrap(), command, FACTORY_PASSWORD, param);
        prop_assert_eq!(frame.len(), FACTORY_FRAME_LEN);
        prop_assert_eq!(&frame[3..7], &[0xAA, 0xBB, 0xEE, 0xFF]);
        prop_assert_eq!(u32::from_le_bytes([frame[7], frame[8], frame[9], frame[10]]), param);
        prop_assert_eq!(frame[11], ETX);
        prop_assert_eq!(u16::from_le_bytes([frame[12], frame[13]]), checksum(&frame[..12]));
    }

    #[test]
    fn addresses_above_range_are_rejected(address in 128u8..=255) {
        let is_invalid = matches!(Address::new(address), Err(FluidComError::InvalidAddress(a)) if a == address);
        prop_assert!(is_invalid);
    }
}
