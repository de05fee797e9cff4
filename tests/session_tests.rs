use fluidcom::core::clock::ManualClock;
use fluidcom::core::protocol::{encode_reply, Address, ReplyStatus, STANDARD_BAUD_RATES};
use fluidcom::infrastructure::mock::{MockLink, MockOpener};
use fluidcom::{connect, ConnectOptions, FluidComError, Session, SessionState, Timeouts};
use std::sync::Arc;
use std::time::Duration;

const ADDRESS: u8 = 0x31;
const MOVE: u8 = 0x4E;
const HALT: u8 = 0x49;
const POSITION: u8 = 0x66;

fn address() -> Address {
    Address::new(ADDRESS).unwrap()
}

fn reply(parameter: u16) -> Vec<u8> {
    encode_reply(ADDRESS, ReplyStatus::NormalState, parameter)
}

fn session() -> (Session, MockLink, ManualClock) {
    let clock = ManualClock::new();
    let link = MockLink::new(clock.clone());
    let session = Session::new(
        Box::new(link.clone()),
        Arc::new(clock.clone()),
        address(),
        "mock",
        9600,
        Timeouts::default(),
    );
    (session, link, clock)
}

/// Session lifecycle tests against a scripted link
#[cfg(test)]
mod session_tests {
    use super::*;

    #[test]
    fn test_single_outstanding_command() {
        let (mut session, _link, _clock) = session();
        session.send_common(MOVE, 6000, false, false).unwrap();

        for (code, param) in [(POSITION, 0), (MOVE, 1), (HALT, 0), (0x20, 0xFFFF)] {
            let err = session.send_common(code, param, true, false).unwrap_err();
            assert!(matches!(err, FluidComError::CommandInFlight));
            let err = session.send_factory(code, 7, false, false).unwrap_err();
            assert!(matches!(err, FluidComError::CommandInFlight));
        }
        assert_eq!(session.state().outstanding(), 1);
    }

    #[test]
    fn test_busy_then_done() {
        let (mut session, link, clock) = session();
        link.silent_on_write();

        assert!(session.is_idle());
        session.send_common(MOVE, 3000, false, false).unwrap();
        assert!(matches!(session.state(), SessionState::AwaitingReply { .. }));

        // Nothing on the wire yet
        assert!(session.is_busy().unwrap());
        clock.advance(Duration::from_secs(2));
        assert!(session.is_busy().unwrap());

        link.push_inbound(reply(0));
        assert!(!session.is_busy().unwrap());
        assert!(session.is_idle());
        assert!(!session.is_busy().unwrap());
        assert_eq!(session.statistics().replies_received, 1);
    }

    #[test]
    fn test_busy_poll_across_split_frame() {
        let (mut session, link, clock) = session();
        link.silent_on_write();
        session.send_common(MOVE, 3000, false, false).unwrap();

        let frame = reply(0x0BB8);
        link.push_inbound(frame[..3].to_vec());
        link.push_inbound_after(Duration::from_millis(400), frame[3..].to_vec());

        // Head only: still busy, nothing lost, no time spent waiting
        let before = clock.elapsed();
        assert!(session.is_busy().unwrap());
        assert_eq!(clock.elapsed(), before);
        assert!(!session.is_idle());

        clock.advance(Duration::from_millis(400));
        assert!(!session.is_busy().unwrap());
        assert!(session.is_idle());
        assert_eq!(session.statistics().error_count, 0);

        // Next exchange stays aligned
        link.reply_on_write(reply(0x0C), Duration::from_millis(5));
        let next = session.send_common(POSITION, 0, true, false).unwrap().unwrap();
        assert_eq!(next.parameter, 0x0C);
    }

    #[test]
    fn test_wait_recovers_frame_whose_head_was_polled() {
        let (mut session, link, _clock) = session();
        link.silent_on_write();
        session.send_common(MOVE, 3000, false, false).unwrap();

        let frame = reply(0x0BB8);
        link.push_inbound(frame[..3].to_vec());
        assert!(session.is_busy().unwrap());

        link.push_inbound_after(Duration::from_millis(400), frame[3..].to_vec());
        let done = session.wait_for_reply(false).unwrap();
        assert_eq!(done.parameter, 0x0BB8);
        assert!(session.is_idle());
    }

    #[test]
    fn test_timed_out_head_completes_on_later_wait() {
        let (mut session, link, clock) = session();
        link.silent_on_write();
        session.send_common(MOVE, 3000, false, false).unwrap();

        let frame = reply(0x0BB8);
        link.push_inbound(frame[..5].to_vec());
        let err = session.wait_for_reply(false).unwrap_err();
        assert!(matches!(err, FluidComError::ReplyTimeout { .. }));
        assert!(!session.is_idle());

        link.push_inbound_after(Duration::from_millis(10), frame[5..].to_vec());
        clock.advance(Duration::from_millis(10));
        assert!(!session.is_busy().unwrap());

        link.reply_on_write(reply(0x0C), Duration::from_millis(5));
        let next = session.send_common(POSITION, 0, true, false).unwrap().unwrap();
        assert_eq!(next.parameter, 0x0C);
    }

    #[test]
    fn test_busy_poll_surfaces_device_error() {
        let (mut session, link, _clock) = session();
        session.send_common(MOVE, 3000, false, false).unwrap();

        link.push_inbound(encode_reply(ADDRESS, ReplyStatus::MotorStalled, 0));
        let err = session.is_busy().unwrap_err();
        assert!(matches!(err, FluidComError::DeviceError(ReplyStatus::MotorStalled)));
        assert!(session.is_idle());
    }

    #[test]
    fn test_forced_cancel_drain() {
        let (mut session, link, _clock) = session();

        // A: long move, reply withheld
        link.silent_on_write();
        session.send_common(MOVE, 6000, false, false).unwrap();

        // B: halt forced over A; its reply lands first, A's follows
        link.reply_on_write(reply(0xB), Duration::from_millis(20));
        session.send_common(HALT, 0, false, true).unwrap();
        link.push_inbound_after(Duration::from_millis(40), reply(0xA));
        assert_eq!(session.state().outstanding(), 2);

        let halted = session.wait_for_reply(false).unwrap();
        assert_eq!(halted.parameter, 0xB);
        assert!(!session.is_idle());

        let stale = session.wait_for_reply(true).unwrap();
        assert_eq!(stale.parameter, 0xA);
        assert!(session.is_idle());

        // C: reads its own reply, not a leftover
        link.reply_on_write(reply(0xC), Duration::from_millis(5));
        let next = session.send_common(POSITION, 0, true, false).unwrap().unwrap();
        assert_eq!(next.parameter, 0xC);
        assert_eq!(link.buffered_len(), 0);
    }

    #[test]
    fn test_cancel_helper_leaves_link_clean() {
        let (mut session, link, _clock) = session();
        link.silent_on_write();
        session.send_common(MOVE, 6000, false, false).unwrap();

        link.reply_on_write(reply(1), Duration::from_millis(10));
        link.push_inbound_after(Duration::from_millis(30), reply(2));
        session.cancel(HALT).unwrap();
        assert!(session.is_idle());

        link.reply_on_write(reply(3), Duration::from_millis(5));
        let next = session.send_common(POSITION, 0, true, false).unwrap().unwrap();
        assert_eq!(next.parameter, 3);
    }

    #[test]
    fn test_stale_error_reply_is_discarded() {
        let (mut session, link, _clock) = session();
        link.silent_on_write();
        session.send_common(MOVE, 6000, false, false).unwrap();

        link.reply_on_write(reply(1), Duration::from_millis(10));
        link.push_inbound_after(
            Duration::from_millis(30),
            encode_reply(ADDRESS, ReplyStatus::MotorBusy, 0),
        );
        assert!(session.cancel(HALT).is_ok());
        assert_eq!(session.statistics().stale_replies_discarded, 1);
    }

    #[test]
    fn test_reply_timeout_not_before_deadline() {
        let (mut session, _link, clock) = session();
        session.send_common(MOVE, 100, false, false).unwrap();
        let started = clock.elapsed();

        let err = session.wait_for_reply(false).unwrap_err();
        assert!(matches!(err, FluidComError::ReplyTimeout { timeout_ms: 30_000 }));
        assert!(clock.elapsed() - started >= Timeouts::default().reply);
        // Still owed a reply
        assert!(!session.is_idle());

        session.abandon_pending().unwrap();
        assert!(session.is_idle());
    }

    #[test]
    fn test_checksum_mismatch_propagates() {
        let (mut session, link, _clock) = session();
        let mut corrupted = reply(10);
        corrupted[4] ^= 0x01;
        link.reply_on_write(corrupted, Duration::from_millis(5));

        let err = session.send_common(POSITION, 0, true, false).unwrap_err();
        assert!(matches!(err, FluidComError::ChecksumMismatch { .. }));
        assert!(session.is_idle());
    }

    #[test]
    fn test_baud_probing_selects_answering_rate() {
        for &rate in STANDARD_BAUD_RATES.iter() {
            let clock = ManualClock::new();
            let mut opener = MockOpener::new(clock.clone()).answer_at(rate, address());

            let session = connect(
                &mut opener,
                Arc::new(clock),
                &ConnectOptions::new("/dev/mock", address()),
            )
            .unwrap();

            assert_eq!(session.baud_rate(), rate);
            assert!(session.is_idle());
            let expected: Vec<u32> = STANDARD_BAUD_RATES
                .iter()
                .copied()
                .take_while(|&r| r != rate)
                .chain(std::iter::once(rate))
                .collect();
            assert_eq!(opener.opened(), expected.as_slice());
        }
    }

    #[test]
    fn test_probe_clears_buffers_before_querying() {
        let clock = ManualClock::new();
        let mut opener = MockOpener::new(clock.clone()).answer_at(9600, address());
        connect(
            &mut opener,
            Arc::new(clock),
            &ConnectOptions::new("/dev/mock", address()),
        )
        .unwrap();

        let link = opener.last_link().unwrap();
        assert_eq!(link.clear_count(), 1);
        assert_eq!(link.writes().len(), 1);
        assert_eq!(link.writes()[0][2], 0x20);
    }

    #[test]
    fn test_no_device_found_after_all_rates() {
        let clock = ManualClock::new();
        let mut opener = MockOpener::new(clock.clone())
            .answer_at(9600, Address::new(0x01).unwrap())
            .refuse_open_at(115200);
        let options = ConnectOptions::new("/dev/mock", address()).with_baud_rate(19200);

        let err = connect(&mut opener, Arc::new(clock), &options).unwrap_err();
        assert!(matches!(err, FluidComError::NoDeviceFound { .. }));
        assert_eq!(opener.opened(), &[19200]);
    }
}
