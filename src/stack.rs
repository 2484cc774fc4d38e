//! # TCP links
//!
//! ESP-AT multiplexes up to five TCP connections ("links") over the single UART. Links are
//! addressed by their id (0-4). The modem is the only source of truth for the link states,
//! so no link state is tracked here.
//!
//! ## Example
//!
//! ````
//! # use esp_at_link::example::{ExampleTimer, ExampleTransport};
//! # use esp_at_link::wifi::Adapter;
//! #
//! let mut adapter: Adapter<_, _, 1_000_000> = Adapter::new(ExampleTransport::default(), ExampleTimer::default());
//!
//! adapter.enable_multiple_connections().unwrap();
//! adapter.enable_passive_receiving_mode().unwrap();
//!
//! // Creating a TCP connection
//! adapter.connect(0, "10.0.0.1", 21).unwrap();
//!
//! // Sending some data
//! adapter.send(0, b"hallo!").unwrap();
//!
//! // Receiving some data
//! let data = adapter.receive(0, 64).unwrap();
//! assert_eq!(b"nice to see you!", data.as_slice());
//!
//! // Closing the link
//! adapter.close(0).unwrap();
//! ````
use crate::client::{CommandError, Prompt};
use crate::commands::{
    CloseSocketCommand, CommandErrorHandler, ConnectCommand, ReceiveDataCommand, SetMultipleConnectionsCommand,
    SetSocketReceivingModeCommand, TransmissionPrepareCommand,
};
use crate::responses::{parse_received_data, ReceiveParseError};
use crate::transport::Transport;
use crate::wifi::Adapter;
use alloc::vec::Vec;
use atat::AtatCmd;
use fugit::TimerDurationU32;
use fugit_timer::Timer;
use log::{debug, info, warn};

/// Max. number of links supported by ESP-AT
pub const MAX_LINKS: usize = 5;

/// Network related errors
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Error while sending CIPMUX command for enabling multiple connections
    EnablingMultiConnectionsFailed(CommandError),

    /// Error while sending CIPRECVMODE command for enabling passive socket receiving mode
    EnablingPassiveSocketModeFailed(CommandError),

    /// TCP connect command failed
    ConnectError(CommandError),

    /// Preparing the transmission failed (CIPSEND command)
    TransmissionStartFailed(CommandError),

    /// Transmission of data failed
    SendFailed(CommandError),

    /// Fetching received data failed
    ReceiveFailed(CommandError),

    /// Link close command failed
    CloseError(CommandError),

    /// Connection was closed by the remote peer while waiting for the send prompt
    ClosedByPeer,

    /// Link id is outside of 0..MAX_LINKS
    InvalidLinkId,

    /// Host name longer then 64 chars
    InvalidHost,
}

impl<Tr: Transport, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> Adapter<Tr, T, TIMER_HZ> {
    /// Enables multiple connections, which is required for addressing links by id
    pub fn enable_multiple_connections(&mut self) -> Result<(), Error> {
        self.send_command(SetMultipleConnectionsCommand::multiple())?;
        Ok(())
    }

    /// Enables the passive socket receiving mode.
    /// So received data is buffered on ESP-AT until fetched by `receive()`.
    pub fn enable_passive_receiving_mode(&mut self) -> Result<(), Error> {
        self.send_command(SetSocketReceivingModeCommand::passive_mode())?;
        Ok(())
    }

    /// Opens a TCP connection to the given host on the given link
    pub fn connect(&mut self, link_id: usize, host: &str, port: u16) -> Result<(), Error> {
        assert_link_id(link_id)?;
        let host: heapless::String<64> = host.try_into().map_err(|_| Error::InvalidHost)?;

        self.send_command(ConnectCommand::tcp(link_id, host, port))?;
        info!("Link {} connected", link_id);
        Ok(())
    }

    /// Sends the given payload on the given link.
    ///
    /// Each chunk is sent in two phases: First the length is declared, then the payload is written
    /// once the modem signals readiness by a `>` prompt. If the connection gets closed while
    /// waiting for the prompt, [Error::ClosedByPeer] is returned without writing the payload.
    pub fn send(&mut self, link_id: usize, payload: &[u8]) -> Result<(), Error> {
        assert_link_id(link_id)?;

        for chunk in payload.chunks(self.tx_size) {
            self.send_chunk(link_id, chunk)?;
        }

        Ok(())
    }

    /// Fetches up to `max_length` bytes buffered by the modem for the given link.
    ///
    /// An empty result is returned if no data is available, the command was rejected, or the
    /// response was incomplete or malformed. Poll until empty for draining all buffered data.
    pub fn receive(&mut self, link_id: usize, max_length: usize) -> Result<Vec<u8>, Error> {
        assert_link_id(link_id)?;

        let response = match self.send_command(ReceiveDataCommand::new(link_id, max_length)) {
            Ok(response) => response,
            Err(Error::ReceiveFailed(CommandError::Rejected)) => return Ok(Vec::new()),
            Err(error) => return Err(error),
        };

        let body = response.text();
        match parse_received_data(body.as_bytes()) {
            Ok(data) => {
                debug!("Received {} bytes on link {}", data.len(), link_id);
                Ok(data.to_vec())
            }
            Err(ReceiveParseError::ShortRead { declared, available }) => {
                debug!("Short read on link {} ({} of {} bytes)", link_id, available, declared);
                Ok(Vec::new())
            }
            Err(ReceiveParseError::Malformed) => {
                if !body.is_empty() {
                    warn!("Malformed receive response: {}", body);
                }
                Ok(Vec::new())
            }
        }
    }

    /// Closes the given link
    pub fn close(&mut self, link_id: usize) -> Result<(), Error> {
        assert_link_id(link_id)?;

        let command = CloseSocketCommand::new(link_id);
        let mut response = self
            .client
            .execute(&command)
            .map_err(|error| command.command_error(error))?;

        // Confirmation "<id>,CLOSED" precedes the final OK
        if response.is_closed() {
            response = self
                .client
                .read_response(TimerDurationU32::millis(CloseSocketCommand::MAX_TIMEOUT_MS))
                .map_err(|error| command.command_error(error))?;
        }

        if !response.is_ok() {
            return Err(command.command_error(CommandError::Rejected));
        }

        info!("Link {} closed", link_id);
        Ok(())
    }

    /// Sends a chunk of max. `tx_size` bytes
    fn send_chunk(&mut self, link_id: usize, data: &[u8]) -> Result<(), Error> {
        let command = TransmissionPrepareCommand::new(link_id, data.len());
        self.client
            .write_command(&command)
            .map_err(|error| command.command_error(error))?;

        match self.client.await_prompt(self.send_timeout) {
            Ok(Prompt::Ready) => {}
            Ok(Prompt::Closed) => return Err(Error::ClosedByPeer),
            Ok(Prompt::Rejected) => return Err(Error::TransmissionStartFailed(CommandError::Rejected)),
            Err(error) => return Err(Error::TransmissionStartFailed(error)),
        }

        let response = self
            .client
            .execute_raw(data, self.send_timeout)
            .map_err(Error::SendFailed)?;

        if !response.is_ok() {
            return Err(Error::SendFailed(CommandError::Rejected));
        }

        Ok(())
    }
}

/// Asserts that the link id is supported by ESP-AT
fn assert_link_id(link_id: usize) -> Result<(), Error> {
    if link_id >= MAX_LINKS {
        return Err(Error::InvalidLinkId);
    }

    Ok(())
}
