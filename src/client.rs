//! # Command engine
//!
//! Sends one command per transaction and classifies the following lines into a terminal OK/ERROR
//! status plus the response body. Every wait is bounded by a timeout.
use crate::responses::find;
use crate::transport::Transport;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use atat::AtatCmd;
use fugit::TimerDurationU32;
use fugit_timer::Timer;
use log::{debug, warn};

/// Line terminator of commands
const TERMINATOR: &[u8] = b"\r\n";

/// Boot banner of the modem
const READY_BANNER: &str = "ready";

/// Token of a connection closed by the remote peer
const CLOSED_TOKEN: &[u8] = b"CLOSED";

const ERROR_TOKEN: &[u8] = b"ERROR";

/// Bytes kept while scanning for the send prompt
const PROMPT_WINDOW_SIZE: usize = 6;

/// Terminal status of a command
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error,
}

/// Outcome of a single command
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: Status,

    /// All lines received between the command and the terminal line, in arrival order
    pub body: Vec<String>,

    /// Line which terminated the response
    pub terminal: String,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Body lines joined by newlines
    pub fn text(&self) -> String {
        self.body.join("\n")
    }

    /// True if the response was terminated by a CLOSED line
    pub fn is_closed(&self) -> bool {
        find(self.terminal.as_bytes(), CLOSED_TOKEN).is_some()
    }
}

/// Errors of a command exchange
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandError {
    /// Modem answered with ERROR, SEND FAIL or CLOSED
    Rejected,

    /// No terminal token received within the timeout
    Timeout,

    /// Reading or writing the transport failed
    Transport,

    /// Upstream timer error
    TimerError,
}

/// Result of waiting for the send prompt
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Prompt {
    /// Modem is ready for the payload
    Ready,

    /// Connection was closed by the peer before the prompt
    Closed,

    /// Modem answered ERROR before the prompt
    Rejected,
}

/// Classifies a response line. Returns None for lines belonging to the response body.
pub(crate) fn classify(line: &str) -> Option<Status> {
    if line.starts_with("OK") || line.starts_with("SEND OK") {
        return Some(Status::Ok);
    }

    // Some firmware versions prefix the link id, e.g. "0,CLOSED"
    let bytes = line.as_bytes();
    if line.starts_with("ERROR")
        || line.starts_with("SEND FAIL")
        || bytes.get(..CLOSED_TOKEN.len()) == Some(CLOSED_TOKEN)
        || bytes.get(2..2 + CLOSED_TOKEN.len()) == Some(CLOSED_TOKEN)
    {
        return Some(Status::Error);
    }

    None
}

/// Command engine with exclusive ownership of the transport
pub struct Client<Tr: Transport, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> {
    /// Transport to the modem
    pub(crate) transport: Tr,

    /// Timer used for timeout measurement
    pub(crate) timer: T,

    /// Replaces the default timeout of each command if set
    pub(crate) command_timeout: Option<TimerDurationU32<TIMER_HZ>>,
}

impl<Tr: Transport, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> Client<Tr, T, TIMER_HZ> {
    pub fn new(transport: Tr, timer: T) -> Self {
        Self {
            transport,
            timer,
            command_timeout: None,
        }
    }

    /// Encodes and executes the given command.
    /// The timeout defined by the command is used unless overridden by `set_command_timeout_ms()`.
    pub fn execute<Cmd: AtatCmd>(&mut self, command: &Cmd) -> Result<Response, CommandError> {
        let timeout = self.command_timeout(Cmd::MAX_TIMEOUT_MS);
        let mut buffer = vec![0x0; Cmd::MAX_LEN];
        let length = command.write(&mut buffer);

        self.transact(&buffer[..length], timeout)
    }

    /// Writes the given text followed by a line terminator and waits for the terminal line
    pub fn execute_line(&mut self, text: &str, timeout: TimerDurationU32<TIMER_HZ>) -> Result<Response, CommandError> {
        let mut data = Vec::with_capacity(text.len() + TERMINATOR.len());
        data.extend_from_slice(text.as_bytes());
        data.extend_from_slice(TERMINATOR);

        self.transact(&data, timeout)
    }

    /// Writes the given bytes verbatim and waits for the terminal line
    pub fn execute_raw(&mut self, data: &[u8], timeout: TimerDurationU32<TIMER_HZ>) -> Result<Response, CommandError> {
        self.transact(data, timeout)
    }

    /// Encodes and writes the given command without waiting for any response
    pub(crate) fn write_command<Cmd: AtatCmd>(&mut self, command: &Cmd) -> Result<(), CommandError> {
        let mut buffer = vec![0x0; Cmd::MAX_LEN];
        let length = command.write(&mut buffer);

        self.write(&buffer[..length])
    }

    /// Scans raw bytes for the `>` send prompt.
    /// `CLOSED` or `ERROR` received before the prompt abort the scan.
    pub fn await_prompt(&mut self, timeout: TimerDurationU32<TIMER_HZ>) -> Result<Prompt, CommandError> {
        debug!("Waiting for '>' or 'CLOSED'");
        self.start_timer(timeout)?;

        // Trailing bytes, long enough for the longest token
        let mut window: heapless::Vec<u8, PROMPT_WINDOW_SIZE> = heapless::Vec::new();

        loop {
            match self.transport.read_byte() {
                Ok(b'>') => return Ok(Prompt::Ready),
                Ok(byte) => {
                    if window.is_full() {
                        window.remove(0);
                    }
                    let _ = window.push(byte);

                    if window.ends_with(CLOSED_TOKEN) {
                        warn!("Link closed before send prompt");
                        return Ok(Prompt::Closed);
                    }

                    if window.ends_with(ERROR_TOKEN) {
                        warn!("Send prompt rejected");
                        return Ok(Prompt::Rejected);
                    }
                }
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(error)) => {
                    warn!("Transport error while waiting for send prompt: {:?}", error);
                    return Err(CommandError::Transport);
                }
            }

            self.check_timer()?;
        }
    }

    /// Blocks until the boot banner of the modem has been received
    pub fn await_ready(&mut self, timeout: TimerDurationU32<TIMER_HZ>) -> Result<(), CommandError> {
        self.start_timer(timeout)?;

        loop {
            match self.transport.read_line() {
                Ok(line) => {
                    debug!(">> {}", line);
                    if line.starts_with(READY_BANNER) {
                        return Ok(());
                    }
                }
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(error)) => {
                    warn!("Transport error while waiting for banner: {:?}", error);
                    return Err(CommandError::Transport);
                }
            }

            self.check_timer()?;
        }
    }

    /// Sets a fixed timeout for all commands, replacing the per command defaults
    pub fn set_command_timeout_ms(&mut self, timeout: u32) {
        self.command_timeout = Some(TimerDurationU32::millis(timeout));
    }

    /// Writes the data and collects the response lines until a terminal line is received
    fn transact(&mut self, data: &[u8], timeout: TimerDurationU32<TIMER_HZ>) -> Result<Response, CommandError> {
        self.write(data)?;

        let result = self.read_response(timeout);
        match &result {
            Ok(response) if !response.is_ok() => {
                warn!("Command failed: {}", String::from_utf8_lossy(trim_terminator(data)));
                warn!("Response: {:?}", response.body);
            }
            Err(CommandError::Timeout) => {
                warn!("Command timed out: {}", String::from_utf8_lossy(trim_terminator(data)));
            }
            _ => {}
        }

        result
    }

    /// Collects response lines until a terminal line is received, without writing anything
    pub(crate) fn read_response(&mut self, timeout: TimerDurationU32<TIMER_HZ>) -> Result<Response, CommandError> {
        self.start_timer(timeout)?;

        let mut body = Vec::new();

        loop {
            match self.transport.read_line() {
                Ok(line) => {
                    debug!(">> {}", line);

                    if let Some(status) = classify(&line) {
                        return Ok(Response {
                            status,
                            body,
                            terminal: line,
                        });
                    }

                    body.push(line);
                }
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(error)) => {
                    warn!("Transport error while reading response: {:?}", error);
                    return Err(CommandError::Transport);
                }
            }

            self.check_timer()?;
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), CommandError> {
        debug!("<< {}", String::from_utf8_lossy(trim_terminator(data)));

        self.transport.write_bytes(data).map_err(|_| CommandError::Transport)?;
        self.transport.flush().map_err(|_| CommandError::Transport)
    }

    fn start_timer(&mut self, timeout: TimerDurationU32<TIMER_HZ>) -> Result<(), CommandError> {
        self.timer.start(timeout).map_err(|_| CommandError::TimerError)
    }

    /// Returns an error if the timeout has been reached
    fn check_timer(&mut self) -> Result<(), CommandError> {
        match self.timer.wait() {
            Ok(_) => Err(CommandError::Timeout),
            Err(nb::Error::WouldBlock) => Ok(()),
            Err(nb::Error::Other(_)) => Err(CommandError::TimerError),
        }
    }

    fn command_timeout(&self, default_ms: u32) -> TimerDurationU32<TIMER_HZ> {
        self.command_timeout
            .unwrap_or_else(|| TimerDurationU32::millis(default_ms))
    }
}

fn trim_terminator(data: &[u8]) -> &[u8] {
    data.strip_suffix(TERMINATOR).unwrap_or(data)
}
