// Session module - Command/reply state machine for one device link
pub mod session;
pub mod shared;
pub mod state;

pub use session::{Session, SessionId};
pub use shared::SharedSession;
pub use state::{
    SessionState, SessionStatistics, Timeouts, DEFAULT_POLL_INTERVAL, DEFAULT_QUERY_TIMEOUT,
    DEFAULT_REPLY_TIMEOUT,
};
