use crate::core::clock::Clock;
use crate::core::link::Link;
use crate::domain::error::{FluidComError, FluidComResult};
use std::time::Duration;
use tracing::{debug, warn};

/// Polls a link until one fixed-length reply frame has been accumulated.
///
/// Bytes are collected into a caller-owned buffer that outlives a single
/// read, so a frame split across polls is completed by a later call instead
/// of being dropped and knocking every following frame out of alignment.
#[derive(Debug, Clone, Copy)]
pub struct ReplyReader {
    frame_len: usize,
    poll_interval: Duration,
}

/// Shortest sleep between polls. A zero interval would spin, and would never
/// advance a virtual clock.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

impl ReplyReader {
    pub fn new(frame_len: usize, poll_interval: Duration) -> Self {
        Self {
            frame_len,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Read one frame, continuing from whatever `buffer` already holds.
    ///
    /// With `wait` false the link is polled once: a complete frame is
    /// returned, otherwise `Ok(None)` and any partial bytes stay in
    /// `buffer`. With `wait` true the link is polled until a frame completes
    /// or `timeout` elapses; on timeout the partial bytes are kept too, since
    /// they are the head of a reply that is still owed. Read errors are
    /// logged and retried.
    pub fn read(
        &self,
        link: &mut dyn Link,
        clock: &dyn Clock,
        buffer: &mut Vec<u8>,
        timeout: Duration,
        wait: bool,
    ) -> FluidComResult<Option<Vec<u8>>> {
        let deadline = clock.now() + timeout;

        loop {
            if buffer.len() < self.frame_len {
                match link.read_available(self.frame_len - buffer.len()) {
                    Ok(bytes) => buffer.extend_from_slice(&bytes),
                    Err(e) => warn!("Read from link failed, retrying: {}", e),
                }
            }

            if buffer.len() >= self.frame_len {
                return Ok(Some(buffer.drain(..self.frame_len).collect()));
            }

            if !wait {
                if !buffer.is_empty() {
                    debug!(
                        "Holding partial frame ({} of {} bytes): {}",
                        buffer.len(),
                        self.frame_len,
                        hex::encode(buffer.as_slice())
                    );
                }
                return Ok(None);
            }

            let now = clock.now();
            if now >= deadline {
                if !buffer.is_empty() {
                    debug!(
                        "Timed out holding partial frame ({} of {} bytes): {}",
                        buffer.len(),
                        self.frame_len,
                        hex::encode(buffer.as_slice())
                    );
                }
                return Err(FluidComError::ReplyTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }

            clock.sleep(self.poll_interval.min(deadline - now));
        }
    }
}
