use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Whether the link has replies outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing outstanding; a new command may be sent.
    Idle,
    /// At least one reply is still due on the link.
    AwaitingReply {
        /// When the most recent command was written.
        sent_at: Instant,
        /// Replies still due. Above one only after a forced send, and every
        /// one of them must be read before the link is clean again.
        outstanding: usize,
    },
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn outstanding(&self) -> usize {
        match self {
            SessionState::Idle => 0,
            SessionState::AwaitingReply { outstanding, .. } => *outstanding,
        }
    }

    /// State after a command is written at `now`.
    pub(crate) fn after_send(self, now: Instant) -> Self {
        SessionState::AwaitingReply {
            sent_at: now,
            outstanding: self.outstanding() + 1,
        }
    }

    /// State after one reply frame has been taken off the link.
    pub(crate) fn after_reply(self) -> Self {
        match self {
            SessionState::AwaitingReply {
                sent_at,
                outstanding,
            } if outstanding > 1 => SessionState::AwaitingReply {
                sent_at,
                outstanding: outstanding - 1,
            },
            _ => SessionState::Idle,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::AwaitingReply { outstanding, .. } => {
                write!(f, "AwaitingReply ({} outstanding)", outstanding)
            }
        }
    }
}

/// Deadlines and poll pacing for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Budget for quick round-trips such as link probing.
    pub query: Duration,
    /// Budget for any blocking reply wait. Must cover the longest physical move.
    pub reply: Duration,
    /// Sleep between link polls.
    pub poll_interval: Duration,
}

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(250);
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY_TIMEOUT,
            reply: DEFAULT_REPLY_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Session statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatistics {
    /// Frames written to the link
    pub frames_sent: u64,
    /// Reply frames taken off the link, including discarded ones
    pub replies_received: u64,
    /// Stale replies read and thrown away after a cancellation
    pub stale_replies_discarded: u64,
    /// Failed exchanges (timeouts, bad frames, device errors)
    pub error_count: u64,
}
