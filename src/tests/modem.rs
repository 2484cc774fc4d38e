use crate::client::CommandError;
use crate::config::Config;
use crate::modem::{BringUpError, Modem, NoPin, ResetPins};
use crate::session::{Link, LinkRole};
use crate::stack::Error as StackError;
use crate::tests::mock::{
    EventLog, HardwareEvent, MockDelay, MockPin, MockTimer, MockTransport, MockedCommand, PinRole,
};
use crate::wifi::{Adapter, JoinError};
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use std::rc::Rc;

pub(crate) type ModemType = Modem<MockTransport, MockTimer, MockTimer, MockPin, MockPin, NoPin, MockDelay, 1_000_000>;

/// Creates a modem which emits the boot banner on every reset
pub(crate) fn new_modem(transport: MockTransport, retry_timer: MockTimer) -> (ModemType, EventLog) {
    let events: EventLog = Rc::new(RefCell::new(Vec::new()));
    let reset = MockPin::new(PinRole::Reset, events.clone()).with_boot_output(transport.inbound_handle());
    let enable = MockPin::new(PinRole::Enable, events.clone());
    let pins = ResetPins::new(reset, enable, MockDelay::new(events.clone()));

    let adapter = Adapter::new(transport, MockTimer::running());
    let modem = Modem::new(adapter, pins, retry_timer, Config::new("test_wifi", "secret", "hub"));
    (modem, events)
}

/// Mocks the configuration commands of a bring-up
pub(crate) fn add_configuration(transport: &mut MockTransport) {
    transport.add_response(MockedCommand::ok(Some(b"ATE0\r\n"), None));
    transport.add_response(MockedCommand::ok(Some(b"AT+CWMODE_CUR=1\r\n"), None));
    transport.add_response(MockedCommand::ok(Some(b"AT+CIPMUX=1\r\n"), None));
    transport.add_response(MockedCommand::ok(Some(b"AT+CIPRECVMODE=1\r\n"), None));
}

pub(crate) fn add_join(transport: &mut MockTransport) {
    transport.add_response(MockedCommand::ok(
        Some(b"AT+CWJAP_CUR=\"test_wifi\",\"secret\"\r\n"),
        Some(&[b"WIFI CONNECTED\r\n", b"WIFI GOT IP\r\n", b"\r\n"]),
    ));
}

pub(crate) fn add_links(transport: &mut MockTransport) {
    transport.add_response(MockedCommand::ok(
        Some(b"AT+CIPSTART=1,\"TCP\",\"hub\",2939\r\n"),
        Some(&[b"1,CONNECT\r\n", b"\r\n"]),
    ));
    transport.add_response(MockedCommand::ok(
        Some(b"AT+CIPSTART=0,\"TCP\",\"hub\",2938\r\n"),
        Some(&[b"0,CONNECT\r\n", b"\r\n"]),
    ));
}

/// Mocks all commands of a successful bring-up
pub(crate) fn add_bring_up(transport: &mut MockTransport) {
    add_configuration(transport);
    add_join(transport);
    add_links(transport);
}

fn reset_sequence() -> Vec<HardwareEvent> {
    vec![
        HardwareEvent::ResetLow,
        HardwareEvent::EnableLow,
        HardwareEvent::DelayMs(100),
        HardwareEvent::EnableHigh,
        HardwareEvent::ResetHigh,
    ]
}

fn add_join_error(transport: &mut MockTransport) {
    transport.add_response(MockedCommand::error(
        Some(b"AT+CWJAP_CUR=\"test_wifi\",\"secret\"\r\n"),
        Some(&[b"+CWJAP:3\r\n", b"\r\n"]),
    ));
}

#[test]
fn test_establish_session() {
    let mut transport = MockTransport::new();
    add_bring_up(&mut transport);

    let (mut modem, events) = new_modem(transport, MockTimer::new());
    let session = modem.establish_session().unwrap();

    assert_eq!(
        &[
            Link {
                id: 1,
                role: LinkRole::Environment
            },
            Link {
                id: 0,
                role: LinkRole::Garden
            }
        ],
        session.links()
    );
    assert_eq!(Some(0), session.link_id(LinkRole::Garden));
    assert_eq!(Some(1), session.link_id(LinkRole::Environment));

    assert_eq!(reset_sequence(), *events.borrow());
    assert!(modem.has_session());
    modem.adapter.client.transport.assert_all_cmds_sent();
}

#[test]
fn test_reset_drives_boot_pin_high_first() {
    let events: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut pins = ResetPins::with_boot_pin(
        MockPin::new(PinRole::Reset, events.clone()),
        MockPin::new(PinRole::Enable, events.clone()),
        MockPin::new(PinRole::Boot, events.clone()),
        MockDelay::new(events.clone()),
    );

    pins.pulse().unwrap();

    let mut expected = vec![HardwareEvent::BootHigh];
    expected.extend(reset_sequence());
    assert_eq!(expected, *events.borrow());
}

#[test]
fn test_boot_pin_error() {
    let events: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut pins = ResetPins::with_boot_pin(
        MockPin::new(PinRole::Reset, events.clone()),
        MockPin::new(PinRole::Enable, events.clone()),
        MockPin::new(PinRole::Boot, events.clone()).failing(),
        MockDelay::new(events.clone()),
    );

    assert_eq!(BringUpError::ResetFailed, pins.pulse().unwrap_err());
    assert!(events.borrow().is_empty());
}

#[test]
fn test_link_close_failure_during_bring_up() {
    let mut transport = MockTransport::new();
    add_configuration(&mut transport);
    add_join(&mut transport);
    transport.add_response(MockedCommand::ok(
        Some(b"AT+CIPSTART=1,\"TCP\",\"hub\",2939\r\n"),
        Some(&[b"1,CONNECT\r\n", b"\r\n"]),
    ));
    transport.add_response(MockedCommand::error(Some(b"AT+CIPSTART=0,\"TCP\",\"hub\",2938\r\n"), None));
    transport.add_response(MockedCommand::error(Some(b"AT+CIPCLOSE=1\r\n"), None));

    let (mut modem, _) = new_modem(transport, MockTimer::new());

    // Close failure does not hide the cause of the failed bring-up
    assert_eq!(
        BringUpError::LinkFailed(LinkRole::Garden, StackError::ConnectError(CommandError::Rejected)),
        modem.establish_session().unwrap_err()
    );
    modem.adapter.client.transport.assert_all_cmds_sent();
}

#[test]
fn test_join_error_skips_links() {
    let mut transport = MockTransport::new();
    add_configuration(&mut transport);
    add_join_error(&mut transport);

    let (mut modem, _) = new_modem(transport, MockTimer::new());
    let error = modem.establish_session().unwrap_err();

    assert_eq!(BringUpError::Join(JoinError::ConnectError(CommandError::Rejected)), error);
    assert!(!modem.has_session());

    let writes = modem.adapter.client.transport.get_writes_as_strings();
    assert_eq!(5, writes.len());
    assert!(writes.iter().all(|write| !write.starts_with("AT+CIPSTART")));
}

#[test]
fn test_configuration_error_aborts() {
    let mut transport = MockTransport::new();
    transport.add_response(MockedCommand::ok(Some(b"ATE0\r\n"), None));
    transport.add_response(MockedCommand::ok(Some(b"AT+CWMODE_CUR=1\r\n"), None));
    transport.add_response(MockedCommand::error(Some(b"AT+CIPMUX=1\r\n"), None));

    let (mut modem, _) = new_modem(transport, MockTimer::new());

    assert_eq!(
        BringUpError::Stack(StackError::EnablingMultiConnectionsFailed(CommandError::Rejected)),
        modem.establish_session().unwrap_err()
    );
    assert_eq!(3, modem.adapter.client.transport.get_writes_as_strings().len());
}

#[test]
fn test_link_error_closes_opened_links() {
    let mut transport = MockTransport::new();
    add_configuration(&mut transport);
    add_join(&mut transport);
    transport.add_response(MockedCommand::ok(
        Some(b"AT+CIPSTART=1,\"TCP\",\"hub\",2939\r\n"),
        Some(&[b"1,CONNECT\r\n", b"\r\n"]),
    ));
    transport.add_response(MockedCommand::error(
        Some(b"AT+CIPSTART=0,\"TCP\",\"hub\",2938\r\n"),
        Some(&[b"DNS Fail\r\n"]),
    ));
    transport.add_response(MockedCommand::raw(Some(b"AT+CIPCLOSE=1\r\n"), b"1,CLOSED\r\n\r\nOK\r\n"));

    let (mut modem, _) = new_modem(transport, MockTimer::new());

    assert_eq!(
        BringUpError::LinkFailed(LinkRole::Garden, StackError::ConnectError(CommandError::Rejected)),
        modem.establish_session().unwrap_err()
    );
    assert!(!modem.has_session());
    modem.adapter.client.transport.assert_all_cmds_sent();
}

#[test]
fn test_second_attempt_resets_again() {
    let mut transport = MockTransport::new();
    add_configuration(&mut transport);
    add_join_error(&mut transport);
    add_bring_up(&mut transport);

    let (mut modem, events) = new_modem(transport, MockTimer::new());
    modem.establish_session().unwrap_err();
    modem.establish_session().unwrap();

    let mut expected = reset_sequence();
    expected.extend(reset_sequence());
    assert_eq!(expected, *events.borrow());

    let writes = modem.adapter.client.transport.get_writes_as_strings();
    assert_eq!(12, writes.len());
    assert_eq!("ATE0\r\n", writes[5]);
    modem.adapter.client.transport.assert_all_cmds_sent();
}

#[test]
fn test_establish_session_replaces_existing() {
    let mut transport = MockTransport::new();
    add_bring_up(&mut transport);
    add_configuration(&mut transport);
    add_join_error(&mut transport);

    let (mut modem, events) = new_modem(transport, MockTimer::new());
    modem.establish_session().unwrap();
    modem.establish_session().unwrap_err();

    // Failed attempt destroyed the previous session
    assert!(!modem.has_session());
    assert_eq!(10, events.borrow().len());
}

#[test]
fn test_banner_timeout() {
    let events: EventLog = Rc::new(RefCell::new(Vec::new()));
    let pins = ResetPins::new(
        MockPin::new(PinRole::Reset, events.clone()),
        MockPin::new(PinRole::Enable, events.clone()),
        MockDelay::new(events.clone()),
    );
    let adapter = Adapter::new(MockTransport::new(), MockTimer::expired());
    let mut modem: ModemType = Modem::new(adapter, pins, MockTimer::new(), Config::new("test_wifi", "secret", "hub"));

    assert_eq!(
        BringUpError::NotReady(CommandError::Timeout),
        modem.establish_session().unwrap_err()
    );
    assert!(modem.adapter.client.transport.get_writes_as_strings().is_empty());
}

#[test]
fn test_reset_pin_error() {
    let events: EventLog = Rc::new(RefCell::new(Vec::new()));
    let pins = ResetPins::new(
        MockPin::new(PinRole::Reset, events.clone()).failing(),
        MockPin::new(PinRole::Enable, events.clone()),
        MockDelay::new(events.clone()),
    );
    let adapter = Adapter::new(MockTransport::new(), MockTimer::running());
    let mut modem: ModemType = Modem::new(adapter, pins, MockTimer::new(), Config::new("test_wifi", "secret", "hub"));

    assert_eq!(BringUpError::ResetFailed, modem.establish_session().unwrap_err());
    assert!(modem.adapter.client.transport.get_writes_as_strings().is_empty());
}

#[test]
fn test_config_applied_to_adapter() {
    let config = Config::new("test_wifi", "secret", "hub")
        .with_tx_size(512)
        .with_send_timeout_ms(2_000);

    let events: EventLog = Rc::new(RefCell::new(Vec::new()));
    let pins = ResetPins::new(
        MockPin::new(PinRole::Reset, events.clone()),
        MockPin::new(PinRole::Enable, events.clone()),
        MockDelay::new(events.clone()),
    );
    let adapter = Adapter::new(MockTransport::new(), MockTimer::new());
    let modem: ModemType = Modem::new(adapter, pins, MockTimer::new(), config);

    assert_eq!(512, modem.adapter.tx_size);
    assert_eq!(MockTimer::duration_ms(2_000), modem.adapter.send_timeout);
}

#[test]
fn test_maintain_keeps_session() {
    let mut transport = MockTransport::new();
    add_bring_up(&mut transport);

    let (mut modem, events) = new_modem(transport, MockTimer::new());
    assert!(modem.maintain());
    assert!(modem.maintain());

    // Just a single bring-up
    assert_eq!(5, events.borrow().len());
    assert_eq!(7, modem.adapter.client.transport.get_writes_as_strings().len());
}

#[test]
fn test_maintain_waits_for_cooldown() {
    let mut transport = MockTransport::new();
    add_configuration(&mut transport);
    add_join_error(&mut transport);
    add_bring_up(&mut transport);

    let mut retry_timer = MockTimer::new();
    retry_timer.expect_start().times(1).returning(|duration| {
        assert_eq!(duration, MockTimer::duration_ms(30_000));
        Ok(())
    });
    let mut wait_calls = 0;
    retry_timer.expect_wait().times(2).returning(move || {
        wait_calls += 1;
        match wait_calls {
            1 => nb::Result::Err(nb::Error::WouldBlock),
            _ => nb::Result::Ok(()),
        }
    });

    let (mut modem, events) = new_modem(transport, retry_timer);

    // First attempt fails and starts the cooldown
    assert!(!modem.maintain());
    assert_eq!(5, modem.adapter.client.transport.get_writes_as_strings().len());

    // Cooldown still running
    assert!(!modem.maintain());
    assert_eq!(5, modem.adapter.client.transport.get_writes_as_strings().len());
    assert_eq!(5, events.borrow().len());

    // Cooldown elapsed
    assert!(modem.maintain());
    assert_eq!(12, modem.adapter.client.transport.get_writes_as_strings().len());
    assert_eq!(10, events.borrow().len());
    modem.adapter.client.transport.assert_all_cmds_sent();
}

#[test]
fn test_maintain_retry_timer_error() {
    let mut transport = MockTransport::new();
    add_configuration(&mut transport);
    add_join_error(&mut transport);
    add_configuration(&mut transport);
    add_join_error(&mut transport);

    let mut retry_timer = MockTimer::new();
    retry_timer.expect_start().times(2).returning(|_| Err(1));

    let (mut modem, events) = new_modem(transport, retry_timer);

    // Without running cooldown the next attempt is not delayed
    assert!(!modem.maintain());
    assert!(!modem.maintain());
    assert_eq!(10, events.borrow().len());
}
