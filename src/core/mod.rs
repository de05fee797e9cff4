// Core module - Protocol, session state machine and device capabilities
pub mod clock;
pub mod connect;
pub mod device;
pub mod link;
pub mod protocol;
pub mod reader;
pub mod session;
