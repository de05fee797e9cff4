//! FluidCom Library
//!
//! Command/reply sessions with Runze syringe pumps and rotary valves over a
//! serial link: frame codec, single-outstanding-command state machine, baud
//! probing and per-family device capabilities.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::connect::{connect, ConnectOptions};
pub use crate::core::device::{Device, DeviceOptions};
pub use crate::core::protocol::{Address, DeviceFamily, Reply, ReplyStatus};
pub use crate::core::session::{Session, SessionId, SessionState, SharedSession, Timeouts};
pub use domain::config::FluidComConfig;
pub use domain::error::{FluidComError, FluidComResult};
