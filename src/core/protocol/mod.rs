// Protocol module - Binary frame codec and command vocabulary
pub mod codes;
pub mod frame;
pub mod status;

pub use codes::{
    baud_rate_from_code, baud_rate_to_code, protocol_code, Command, CommandTable, DeviceFamily, FactoryCommand,
    STANDARD_BAUD_RATES,
};
pub use frame::{
    checksum, decode_reply, encode_common, encode_factory, encode_reply, Address, Reply,
    StatusMode, COMMON_FRAME_LEN, ETX, FACTORY_FRAME_LEN, FACTORY_PASSWORD, MAX_ADDRESS,
    REPLY_FRAME_LEN, STX,
};
pub use status::ReplyStatus;
