//! Opening a session by probing baud rates.

use crate::core::clock::Clock;
use crate::core::link::LinkOpener;
use crate::core::protocol::{protocol_code, Address, Command, STANDARD_BAUD_RATES};
use crate::core::session::{Session, Timeouts};
use crate::domain::error::{FluidComError, FluidComResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where and how to look for a device.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub port: String,
    /// Try only this rate instead of every standard one.
    pub baud_rate: Option<u32>,
    pub address: Address,
    pub timeouts: Timeouts,
}

impl ConnectOptions {
    pub fn new(port: impl Into<String>, address: Address) -> Self {
        Self {
            port: port.into(),
            baud_rate: None,
            address,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Rates to try, in order.
    pub fn baud_candidates(&self) -> Vec<u32> {
        match self.baud_rate {
            Some(rate) => vec![rate],
            None => STANDARD_BAUD_RATES.to_vec(),
        }
    }
}

/// Open `options.port` at each candidate baud rate until the device answers
/// an address query, and return an idle session at that rate.
///
/// Failures at one rate (port won't open, silence, line noise, device error)
/// move on to the next rate. Only when every rate has failed is
/// [`FluidComError::NoDeviceFound`] returned.
pub fn connect(
    opener: &mut dyn LinkOpener,
    clock: Arc<dyn Clock>,
    options: &ConnectOptions,
) -> FluidComResult<Session> {
    let probe = protocol_code(Command::GetAddress).ok_or_else(|| FluidComError::Session {
        message: "No protocol-wide address query".to_string(),
    })?;
    let candidates = options.baud_candidates();

    for &baud_rate in &candidates {
        debug!("Probing {} at {} baud", options.port, baud_rate);

        let mut link = match opener.open(&options.port, baud_rate) {
            Ok(link) => link,
            Err(e) => {
                warn!("Cannot open {} at {} baud: {}", options.port, baud_rate, e);
                continue;
            }
        };
        if let Err(e) = link.clear() {
            warn!("Cannot clear {} buffers: {}", options.port, e);
            continue;
        }

        let mut session = Session::new(
            link,
            Arc::clone(&clock),
            options.address,
            options.port.clone(),
            baud_rate,
            options.timeouts,
        );

        match session.probe(probe) {
            Ok(reply) => {
                info!(
                    "Device {} answered on {} at {} baud (reported address {:#04x})",
                    options.address, options.port, baud_rate, reply.parameter
                );
                return Ok(session);
            }
            Err(e) => {
                debug!("No answer at {} baud: {}", baud_rate, e);
            }
        }
    }

    Err(FluidComError::NoDeviceFound {
        port: options.port.clone(),
        address: options.address.value(),
        baud_rates: candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::infrastructure::mock::MockOpener;

    fn address() -> Address {
        Address::new(0x31).unwrap()
    }

    #[test]
    fn test_candidates_default_to_standard_rates() {
        let options = ConnectOptions::new("mock", address());
        assert_eq!(options.baud_candidates(), STANDARD_BAUD_RATES.to_vec());
        assert_eq!(options.with_baud_rate(57600).baud_candidates(), vec![57600]);
    }

    #[test]
    fn test_finds_device_at_later_rate() {
        let clock = ManualClock::new();
        let mut opener = MockOpener::new(clock.clone()).answer_at(38400, address());

        let session = connect(
            &mut opener,
            Arc::new(clock),
            &ConnectOptions::new("mock", address()),
        )
        .unwrap();

        assert_eq!(session.baud_rate(), 38400);
        assert!(session.is_idle());
        assert_eq!(opener.opened(), &[9600, 19200, 38400]);
    }

    #[test]
    fn test_skips_rates_that_fail_to_open() {
        let clock = ManualClock::new();
        let mut opener = MockOpener::new(clock.clone())
            .refuse_open_at(9600)
            .answer_at(19200, address());

        let session = connect(
            &mut opener,
            Arc::new(clock),
            &ConnectOptions::new("mock", address()),
        )
        .unwrap();
        assert_eq!(session.baud_rate(), 19200);
    }

    #[test]
    fn test_no_device_lists_tried_rates() {
        let clock = ManualClock::new();
        let mut opener = MockOpener::new(clock.clone());
        let options = ConnectOptions::new("mock", address()).with_baud_rate(115200);

        let err = connect(&mut opener, Arc::new(clock), &options).unwrap_err();
        match err {
            FluidComError::NoDeviceFound {
                port,
                address,
                baud_rates,
            } => {
                assert_eq!(port, "mock");
                assert_eq!(address, 0x31);
                assert_eq!(baud_rates, vec![115200]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
