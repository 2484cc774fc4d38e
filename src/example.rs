//! Mocks for doc examples
use crate::transport::Transport;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;

/// Transport mock simulating a booted modem
///
/// Every command is answered once flushed. The payload following a `>` prompt is answered by `SEND OK`.
pub struct ExampleTransport {
    /// Bytes not yet read by the driver
    inbound: VecDeque<u8>,

    /// Bytes written since the last flush
    outbound: Vec<u8>,

    /// True if the next write is the payload of a transmission
    awaiting_payload: bool,

    /// Received data is just returned on the first fetch
    data_fetched: bool,
}

impl Default for ExampleTransport {
    fn default() -> Self {
        let mut transport = Self {
            inbound: VecDeque::new(),
            outbound: Vec::new(),
            awaiting_payload: false,
            data_fetched: false,
        };

        // Boot banner
        transport.respond(b"\r\nready\r\n");
        transport
    }
}

impl ExampleTransport {
    fn respond(&mut self, data: &[u8]) {
        self.inbound.extend(data.iter());
    }

    fn answer(&mut self, command: &[u8]) {
        if self.awaiting_payload {
            self.awaiting_payload = false;
            self.respond(b"\r\nRecv bytes\r\n\r\nSEND OK\r\n");
            return;
        }

        if command.starts_with(b"AT+CWJAP_CUR=") {
            self.respond(b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n");
        } else if command.starts_with(b"AT+CWLAP") {
            self.respond(b"+CWLAP:(3,\"test_wifi\",-61,\"10:fe:ed:05:ba:50\",6)\r\n");
            self.respond(b"+CWLAP:(4,\"other_wifi\",-88,\"ca:d7:19:d8:a6:44\",11)\r\n\r\nOK\r\n");
        } else if command.starts_with(b"AT+GMR") {
            self.respond(b"AT version:1.2.0.0(Jul  1 2016 20:04:45)\r\nSDK version:1.5.4.1\r\n\r\nOK\r\n");
        } else if command.starts_with(b"AT+CIPSTART=") {
            self.respond(&command[12..13]);
            self.respond(b",CONNECT\r\n\r\nOK\r\n");
        } else if command.starts_with(b"AT+CIPSEND=") {
            self.awaiting_payload = true;
            self.respond(b"\r\nOK\r\n> ");
        } else if command.starts_with(b"AT+CIPRECVDATA=") && !self.data_fetched {
            self.data_fetched = true;
            self.respond(b"+CIPRECVDATA,16:nice to see you!\r\nOK\r\n");
        } else if command.starts_with(b"AT+CIPCLOSE=") {
            self.respond(&command[12..13]);
            self.respond(b",CLOSED\r\n\r\nOK\r\n");
        } else {
            self.respond(b"\r\nOK\r\n");
        }
    }
}

impl Transport for ExampleTransport {
    type Error = Infallible;

    fn read_line(&mut self) -> nb::Result<String, Self::Error> {
        let end = match self.inbound.iter().position(|byte| *byte == b'\n') {
            None => return Err(nb::Error::WouldBlock),
            Some(end) => end,
        };

        let mut line: Vec<u8> = self.inbound.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    fn read_byte(&mut self) -> nb::Result<u8, Self::Error> {
        self.inbound.pop_front().ok_or(nb::Error::WouldBlock)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.outbound.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        let command = core::mem::take(&mut self.outbound);
        self.answer(&command);
        Ok(())
    }
}

/// Timer mock
#[derive(Default)]
pub struct ExampleTimer {}

impl Timer<1_000_000> for ExampleTimer {
    type Error = u32;

    fn now(&mut self) -> TimerInstantU32<1000000> {
        unimplemented!()
    }

    fn start(&mut self, _duration: TimerDurationU32<1000000>) -> Result<(), Self::Error> {
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        unimplemented!()
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        nb::Result::Err(nb::Error::WouldBlock)
    }
}

/// Reset/enable pin mock
#[derive(Default)]
pub struct ExamplePin {}

impl ErrorType for ExamplePin {
    type Error = Infallible;
}

impl OutputPin for ExamplePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Delay mock, returns immediately
#[derive(Default)]
pub struct ExampleDelay {}

impl DelayNs for ExampleDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
