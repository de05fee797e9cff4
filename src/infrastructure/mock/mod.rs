//! Scripted links for exercising sessions without hardware.
//!
//! [`MockLink`] answers each write with the next scripted reply, delivered
//! after a delay measured on a shared [`ManualClock`]. Handles are cheap
//! clones of the same link, so a test can keep one while the session owns
//! another.
//!
//! ```
//! use fluidcom::core::clock::ManualClock;
//! use fluidcom::core::protocol::{encode_reply, ReplyStatus};
//! use fluidcom::infrastructure::mock::MockLink;
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let link = MockLink::new(clock.clone());
//! // The next write is answered two seconds later.
//! link.reply_on_write(encode_reply(0x31, ReplyStatus::NormalState, 0), Duration::from_secs(2));
//! ```

use crate::core::clock::ManualClock;
use crate::core::link::{Link, LinkOpener};
use crate::core::protocol::{encode_reply, Address, ReplyStatus};
use crate::domain::error::{FluidComError, FluidComResult};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug)]
struct Inbound {
    ready_at: Duration,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct MockState {
    /// Replies armed by successive writes; `None` means stay silent.
    script: VecDeque<Option<(Vec<u8>, Duration)>>,
    inbound: VecDeque<Inbound>,
    writes: Vec<Vec<u8>>,
    failing_reads: usize,
    chunk_size: Option<usize>,
    clears: usize,
}

#[derive(Debug, Clone)]
pub struct MockLink {
    clock: ManualClock,
    state: Arc<Mutex<MockState>>,
}

impl MockLink {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Answer the next unanswered write with `reply`, `delay` after the write.
    pub fn reply_on_write(&self, reply: Vec<u8>, delay: Duration) {
        self.state().script.push_back(Some((reply, delay)));
    }

    /// Let the next unanswered write go unanswered.
    pub fn silent_on_write(&self) {
        self.state().script.push_back(None);
    }

    /// Make `bytes` readable immediately.
    pub fn push_inbound(&self, bytes: Vec<u8>) {
        self.push_inbound_after(Duration::ZERO, bytes);
    }

    /// Make `bytes` readable once `delay` of virtual time has passed.
    pub fn push_inbound_after(&self, delay: Duration, bytes: Vec<u8>) {
        let ready_at = self.clock.elapsed() + delay;
        let mut state = self.state();
        let position = state
            .inbound
            .iter()
            .position(|i| i.ready_at > ready_at)
            .unwrap_or(state.inbound.len());
        state.inbound.insert(position, Inbound { ready_at, bytes });
    }

    /// Fail the next `count` reads with an I/O error.
    pub fn fail_reads(&self, count: usize) {
        self.state().failing_reads = count;
    }

    /// Deliver at most `size` bytes per read.
    pub fn set_chunk_size(&self, size: usize) {
        self.state().chunk_size = Some(size.max(1));
    }

    /// Every frame written so far, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state().writes.clone()
    }

    /// Bytes queued for reading, whether or not they are due yet.
    pub fn buffered_len(&self) -> usize {
        self.state().inbound.iter().map(|i| i.bytes.len()).sum()
    }

    pub fn clear_count(&self) -> usize {
        self.state().clears
    }
}

impl Link for MockLink {
    fn write_all(&mut self, bytes: &[u8]) -> FluidComResult<()> {
        let now = self.clock.elapsed();
        let scripted = {
            let mut state = self.state();
            state.writes.push(bytes.to_vec());
            state.script.pop_front().flatten()
        };
        if let Some((reply, delay)) = scripted {
            let ready_at = now + delay;
            let mut state = self.state();
            let position = state
                .inbound
                .iter()
                .position(|i| i.ready_at > ready_at)
                .unwrap_or(state.inbound.len());
            state.inbound.insert(position, Inbound { ready_at, bytes: reply });
        }
        Ok(())
    }

    fn read_available(&mut self, max_len: usize) -> FluidComResult<Vec<u8>> {
        let now = self.clock.elapsed();
        let mut state = self.state();

        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(FluidComError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated read failure",
            )));
        }

        let limit = state.chunk_size.map_or(max_len, |c| c.min(max_len));
        let mut out = Vec::with_capacity(limit);
        while out.len() < limit {
            let Some(front) = state.inbound.front_mut() else {
                break;
            };
            if front.ready_at > now {
                break;
            }
            let take = (limit - out.len()).min(front.bytes.len());
            out.extend(front.bytes.drain(..take));
            if front.bytes.is_empty() {
                state.inbound.pop_front();
            }
        }
        Ok(out)
    }

    fn clear(&mut self) -> FluidComResult<()> {
        let mut state = self.state();
        state.clears += 1;
        state.inbound.clear();
        Ok(())
    }
}

/// Opens [`MockLink`]s and answers the probe only at chosen baud rates.
///
/// At a baud rate with no device behind it, writes are answered with line
/// noise, which is what a mismatched UART produces.
#[derive(Debug)]
pub struct MockOpener {
    clock: ManualClock,
    devices: HashMap<u32, Address>,
    unopenable: Vec<u32>,
    reply_delay: Duration,
    opened: Vec<u32>,
    links: Vec<MockLink>,
}

impl MockOpener {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            devices: HashMap::new(),
            unopenable: Vec::new(),
            reply_delay: Duration::from_millis(10),
            opened: Vec::new(),
            links: Vec::new(),
        }
    }

    /// A device with `address` answers when the port is opened at `baud_rate`.
    pub fn answer_at(mut self, baud_rate: u32, address: Address) -> Self {
        self.devices.insert(baud_rate, address);
        self
    }

    /// Opening the port at `baud_rate` fails outright.
    pub fn refuse_open_at(mut self, baud_rate: u32) -> Self {
        self.unopenable.push(baud_rate);
        self
    }

    /// Baud rates successfully opened, in order.
    pub fn opened(&self) -> &[u32] {
        &self.opened
    }

    /// Handle to the link opened most recently.
    pub fn last_link(&self) -> Option<MockLink> {
        self.links.last().cloned()
    }
}

impl LinkOpener for MockOpener {
    fn open(&mut self, port: &str, baud_rate: u32) -> FluidComResult<Box<dyn Link>> {
        if self.unopenable.contains(&baud_rate) {
            return Err(FluidComError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("cannot open {} at {}", port, baud_rate),
            )));
        }

        let link = MockLink::new(self.clock.clone());
        match self.devices.get(&baud_rate) {
            Some(address) => link.reply_on_write(
                encode_reply(address.value(), ReplyStatus::NormalState, u16::from(address.value())),
                self.reply_delay,
            ),
            None => link.reply_on_write(vec![0x00, 0xF0, 0x0F, 0xFF, 0x80, 0x00, 0x7E, 0xE0], self.reply_delay),
        }

        self.opened.push(baud_rate);
        self.links.push(link.clone());
        Ok(Box::new(link))
    }
}
