use crate::core::clock::Clock;
use crate::core::link::Link;
use crate::core::protocol::{
    decode_reply, encode_common, encode_factory, Address, Reply, StatusMode, FACTORY_PASSWORD,
    REPLY_FRAME_LEN,
};
use crate::core::reader::ReplyReader;
use crate::core::session::state::{SessionState, SessionStatistics, Timeouts};
use crate::domain::error::{FluidComError, FluidComResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub type SessionId = String;

/// Command/reply session with one device over one link.
///
/// The session enforces the single-outstanding-command rule: while a reply
/// is due, only a forced send may go out. A forced send does not cancel the
/// expectation it overrides, so that older reply still has to be read before
/// the link is clean (see [`Session::cancel`]).
pub struct Session {
    id: SessionId,
    link: Box<dyn Link>,
    clock: Arc<dyn Clock>,
    address: Address,
    port: String,
    baud_rate: u32,
    timeouts: Timeouts,
    reader: ReplyReader,
    /// Bytes of a reply frame that has started to arrive but is not complete.
    pending: Vec<u8>,
    state: SessionState,
    statistics: SessionStatistics,
}

impl Session {
    /// Wrap an already opened link. No bytes are exchanged.
    pub fn new(
        link: Box<dyn Link>,
        clock: Arc<dyn Clock>,
        address: Address,
        port: impl Into<String>,
        baud_rate: u32,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            link,
            clock,
            address,
            port: port.into(),
            baud_rate,
            reader: ReplyReader::new(REPLY_FRAME_LEN, timeouts.poll_interval),
            pending: Vec::with_capacity(REPLY_FRAME_LEN),
            timeouts,
            state: SessionState::Idle,
            statistics: SessionStatistics::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    pub fn statistics(&self) -> &SessionStatistics {
        &self.statistics
    }

    /// Send a common command frame.
    ///
    /// With `wait` the reply is read inline and returned; without it the
    /// call returns `Ok(None)` as soon as the frame is written.
    pub fn send_common(
        &mut self,
        command: u8,
        param: u16,
        wait: bool,
        force: bool,
    ) -> FluidComResult<Option<Reply>> {
        let frame = encode_common(self.address, command, param);
        self.send(&frame, wait, force, StatusMode::Strict, self.timeouts.reply)
    }

    /// Send a factory command frame carrying the factory password.
    pub fn send_factory(
        &mut self,
        command: u8,
        param: u32,
        wait: bool,
        force: bool,
    ) -> FluidComResult<Option<Reply>> {
        let frame = encode_factory(self.address, command, FACTORY_PASSWORD, param);
        self.send(&frame, wait, force, StatusMode::Strict, self.timeouts.reply)
    }

    /// Send a pre-encoded frame as-is.
    pub fn send_frame(
        &mut self,
        frame: &[u8],
        wait: bool,
        force: bool,
    ) -> FluidComResult<Option<Reply>> {
        self.send(frame, wait, force, StatusMode::Strict, self.timeouts.reply)
    }

    /// Ask the device for a status-style value, returning the reply even if
    /// its status is not normal (e.g. `MotorBusy`).
    ///
    /// This is a separate exchange from [`Session::is_busy`] and only runs on
    /// an idle session, so it never stacks a query on top of a pending move.
    pub fn query_raw(&mut self, command: u8, param: u16) -> FluidComResult<Reply> {
        let frame = encode_common(self.address, command, param);
        self.send(&frame, true, false, StatusMode::Raw, self.timeouts.reply)?
            .ok_or(FluidComError::ReplyTimeout {
                timeout_ms: self.timeouts.reply.as_millis() as u64,
            })
    }

    /// Round-trip a query with the short probe deadline. Used to validate a
    /// freshly opened link.
    pub(crate) fn probe(&mut self, command: u8) -> FluidComResult<Reply> {
        let frame = encode_common(self.address, command, 0);
        self.send(&frame, true, false, StatusMode::Strict, self.timeouts.query)?
            .ok_or(FluidComError::ReplyTimeout {
                timeout_ms: self.timeouts.query.as_millis() as u64,
            })
    }

    fn send(
        &mut self,
        frame: &[u8],
        wait: bool,
        force: bool,
        mode: StatusMode,
        timeout: Duration,
    ) -> FluidComResult<Option<Reply>> {
        if !self.state.is_idle() {
            if !force {
                return Err(FluidComError::CommandInFlight);
            }
            warn!(
                session = %self.id,
                "Forcing command over {} pending reply(ies)",
                self.state.outstanding()
            );
        }

        debug!(session = %self.id, "Sending (hex): {}", hex::encode(frame));
        self.link.write_all(frame)?;
        self.statistics.frames_sent += 1;
        self.state = self.state.after_send(self.clock.now());

        if !wait {
            return Ok(None);
        }

        self.receive(timeout, mode).map(Some)
    }

    /// Check whether the last no-wait command is still running.
    ///
    /// Nothing is sent and nothing is waited for. If a reply frame has
    /// arrived it is consumed, which may return the session to `Idle`; a
    /// reply carrying an error status is surfaced as `DeviceError` after the
    /// state has been updated. A frame that has only partly arrived counts as
    /// busy and its bytes are kept for the next poll.
    pub fn is_busy(&mut self) -> FluidComResult<bool> {
        if self.state.is_idle() {
            return Ok(false);
        }

        let polled = self.reader.read(
            &mut *self.link,
            &*self.clock,
            &mut self.pending,
            Duration::ZERO,
            false,
        );
        match polled {
            Ok(None) => Ok(true),
            Ok(Some(bytes)) => {
                self.consume(&bytes, StatusMode::Strict)?;
                Ok(!self.state.is_idle())
            }
            Err(e) => {
                self.statistics.error_count += 1;
                Err(e)
            }
        }
    }

    /// Block until the pending reply arrives or the reply deadline passes.
    ///
    /// `force` allows reading when no reply is recorded as pending, which is
    /// how a stale reply is drained after a cancellation.
    pub fn wait_for_reply(&mut self, force: bool) -> FluidComResult<Reply> {
        if self.state.is_idle() && !force {
            return Err(FluidComError::NoReplyPending);
        }
        self.receive(self.timeouts.reply, StatusMode::Strict)
    }

    /// Halt whatever the device is doing.
    ///
    /// The halt is force-sent and its reply read inline. If a command was in
    /// flight, the reply belonging to that aborted command is then drained
    /// and discarded so it cannot be mistaken for the next command's reply.
    pub fn cancel(&mut self, halt_command: u8) -> FluidComResult<Reply> {
        let was_busy = !self.state.is_idle();
        let halted = self.send_common(halt_command, 0, true, true);

        if was_busy {
            self.drain_stale()?;
        }

        halted?.ok_or(FluidComError::ReplyTimeout {
            timeout_ms: self.timeouts.reply.as_millis() as u64,
        })
    }

    /// Read and discard one reply left behind by an aborted command.
    pub fn drain_stale(&mut self) -> FluidComResult<()> {
        let stale = self.receive(self.timeouts.reply, StatusMode::Raw)?;
        self.statistics.stale_replies_discarded += 1;
        warn!(
            session = %self.id,
            "Discarded stale reply (status: {}, parameter: {})",
            stale.status,
            stale.parameter
        );
        Ok(())
    }

    /// Forget any pending replies, partial frames included, and flush the
    /// link buffers. For recovering after a device has gone silent; late
    /// replies will be lost.
    pub fn abandon_pending(&mut self) -> FluidComResult<()> {
        if !self.state.is_idle() {
            info!(
                session = %self.id,
                "Abandoning {} pending reply(ies)",
                self.state.outstanding()
            );
        }
        self.link.clear()?;
        self.pending.clear();
        self.state = SessionState::Idle;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration, mode: StatusMode) -> FluidComResult<Reply> {
        let bytes = match self.reader.read(
            &mut *self.link,
            &*self.clock,
            &mut self.pending,
            timeout,
            true,
        ) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.statistics.error_count += 1;
                return Err(FluidComError::ReplyTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Err(e) => {
                self.statistics.error_count += 1;
                return Err(e);
            }
        };
        self.consume(&bytes, mode)
    }

    /// Take one frame off the books, then decode it. A frame that fails to
    /// decode still answered a command, so the state moves either way.
    fn consume(&mut self, bytes: &[u8], mode: StatusMode) -> FluidComResult<Reply> {
        debug!(session = %self.id, "Reply (hex): {}", hex::encode(bytes));
        self.state = self.state.after_reply();
        self.statistics.replies_received += 1;

        let decoded = decode_reply(bytes, mode);
        if decoded.is_err() {
            self.statistics.error_count += 1;
        }
        decoded
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("port", &self.port)
            .field("baud_rate", &self.baud_rate)
            .field("state", &self.state)
            .field("pending_bytes", &self.pending.len())
            .finish()
    }
}
