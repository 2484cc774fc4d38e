//! # Serial transport
//!
//! The driver talks to the modem through the [Transport] trait: complete text lines inbound,
//! raw bytes outbound. [SerialTransport] implements it on top of any [embedded_io] serial port.
use alloc::string::String;
use core::fmt::Debug;
use embedded_io::{Read, ReadReady, Write};
use heapless::Vec;

/// Line oriented duplex channel to the modem
///
/// Reads are non-blocking: `WouldBlock` signals that no complete line (or byte) is available yet.
pub trait Transport {
    type Error: Debug;

    /// Returns the next complete line without its line terminator (`\n`, optionally preceded by `\r`)
    fn read_line(&mut self) -> nb::Result<String, Self::Error>;

    /// Returns a single raw byte. Only used while waiting for the `>` send prompt.
    ///
    /// Bytes already consumed by an incomplete `read_line()` are returned first and are not part
    /// of the next line.
    fn read_byte(&mut self) -> nb::Result<u8, Self::Error>;

    /// Writes all the given bytes
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flushes pending outbound bytes
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Errors of [SerialTransport]
#[derive(Clone, Debug, PartialEq)]
pub enum SerialError<E> {
    /// Upstream serial error
    Io(E),

    /// Received line is longer then the line buffer
    LineOverflow,
}

/// [Transport] implementation for an [embedded_io] serial port
///
/// LINE_SIZE: Max. length of a single received line. Needs to hold a full `+CIPRECVDATA` response line,
/// so it should be larger than the receive chunk size.
pub struct SerialTransport<S, const LINE_SIZE: usize> {
    pub(crate) serial: S,

    /// Bytes of the current, not yet terminated line
    line: Vec<u8, LINE_SIZE>,
}

impl<S: Read + ReadReady + Write, const LINE_SIZE: usize> SerialTransport<S, LINE_SIZE> {
    pub fn new(serial: S) -> Self {
        Self {
            serial,
            line: Vec::new(),
        }
    }

    /// Returns the wrapped serial port
    pub fn release(self) -> S {
        self.serial
    }

    /// Reads a single byte if available
    fn next_byte(&mut self) -> nb::Result<u8, SerialError<S::Error>> {
        if !self.serial.read_ready().map_err(SerialError::Io)? {
            return Err(nb::Error::WouldBlock);
        }

        let mut byte = [0x0; 1];
        match self.serial.read(&mut byte).map_err(SerialError::Io)? {
            0 => Err(nb::Error::WouldBlock),
            _ => Ok(byte[0]),
        }
    }

    /// Takes the buffered line, stripping a trailing CR
    fn take_line(&mut self) -> String {
        if self.line.last() == Some(&b'\r') {
            self.line.pop();
        }

        let line = String::from_utf8_lossy(&self.line).into_owned();
        self.line.clear();
        line
    }
}

impl<S: Read + ReadReady + Write, const LINE_SIZE: usize> Transport for SerialTransport<S, LINE_SIZE> {
    type Error = SerialError<S::Error>;

    fn read_line(&mut self) -> nb::Result<String, Self::Error> {
        loop {
            let byte = self.next_byte()?;
            if byte == b'\n' {
                return Ok(self.take_line());
            }

            if self.line.push(byte).is_err() {
                self.line.clear();
                return Err(nb::Error::Other(SerialError::LineOverflow));
            }
        }
    }

    fn read_byte(&mut self) -> nb::Result<u8, Self::Error> {
        // Bytes of a partially read line come first
        if !self.line.is_empty() {
            return Ok(self.line.remove(0));
        }

        self.next_byte()
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.serial.write_all(data).map_err(SerialError::Io)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.serial.flush().map_err(SerialError::Io)
    }
}
