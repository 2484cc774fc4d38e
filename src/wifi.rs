//! # WIFI access point client
//!
//! Configuring the modem, joining a network and scanning for access points is supported.
//!
//! ## Example
//!
//! ````
//! # use esp_at_link::example::{ExampleTimer, ExampleTransport};
//! # use esp_at_link::wifi::Adapter;
//! #
//! let mut adapter: Adapter<_, _, 1_000_000> = Adapter::new(ExampleTransport::default(), ExampleTimer::default());
//!
//! adapter.disable_echo().unwrap();
//! adapter.set_station_mode().unwrap();
//!
//! // Joining the target WIFI access point
//! adapter.join("test_wifi", "secret", None).unwrap();
//!
//! let access_points = adapter.scan_access_points().unwrap();
//! assert_eq!("test_wifi", access_points[0].ssid);
//! assert_eq!(-61, access_points[0].rssi);
//! ````
use crate::client::{Client, CommandError, Response};
use crate::commands::{
    AccessPointConnectBssidCommand, AccessPointConnectCommand, CommandErrorHandler, DisableEchoCommand,
    ListAccessPointsCommand, VersionCommand, WifiModeCommand,
};
use crate::responses::{parse_access_points, AccessPoint};
use crate::transport::Transport;
use alloc::string::String;
use alloc::vec::Vec;
use atat::AtatCmd;
use fugit::{ExtU32, TimerDurationU32};
use fugit_timer::Timer;
use log::{info, warn};

/// Link manager of the modem
///
/// Wraps the command engine and offers the WIFI and TCP link operations of ESP-AT.
pub struct Adapter<Tr: Transport, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> {
    /// Command engine
    pub(crate) client: Client<Tr, T, TIMER_HZ>,

    /// Timeout for data transmission
    pub(crate) send_timeout: TimerDurationU32<TIMER_HZ>,

    /// Chunk size in bytes when sending data. ESP-AT accepts max. 2048 bytes per transmission.
    pub(crate) tx_size: usize,
}

/// Possible errors when joining an access point
#[derive(Clone, Debug, PartialEq)]
pub enum JoinError {
    /// Error while setting WIFI credentials
    ConnectError(CommandError),

    /// Given SSID is longer then the max. size of 32 chars
    InvalidSsidLength,

    /// Given password is longer then the max. size of 64 chars
    InvalidPasswordLength,

    /// Given BSSID is longer then the 17 chars of a MAC address
    InvalidBssidLength,
}

/// Errors of the basic modem configuration
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigurationError {
    /// Error while disabling the command echo
    EchoError(CommandError),

    /// Error wile setting WIFI mode to station
    ModeError(CommandError),
}

impl<Tr: Transport, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> Adapter<Tr, T, TIMER_HZ> {
    /// Creates a new adapter. The modem needs to be booted already.
    pub fn new(transport: Tr, timer: T) -> Self {
        Self {
            client: Client::new(transport, timer),
            send_timeout: 5_000.millis(),
            tx_size: 2048,
        }
    }

    /// Disables echoing of commands
    pub fn disable_echo(&mut self) -> Result<(), ConfigurationError> {
        self.send_command(DisableEchoCommand)?;
        Ok(())
    }

    /// Switches to station mode
    pub fn set_station_mode(&mut self) -> Result<(), ConfigurationError> {
        self.send_command(WifiModeCommand::station_mode())?;
        Ok(())
    }

    /// Joins the given access point. Optionally restricted to the access point with the given MAC address.
    ///
    /// Credentials are quoted as given. Quotes or commas inside are not escaped.
    pub fn join(&mut self, ssid: &str, password: &str, bssid: Option<&str>) -> Result<(), JoinError> {
        let ssid: heapless::String<32> = ssid.try_into().map_err(|_| JoinError::InvalidSsidLength)?;
        let password: heapless::String<64> = password.try_into().map_err(|_| JoinError::InvalidPasswordLength)?;

        match bssid {
            None => self.send_command(AccessPointConnectCommand::new(ssid, password))?,
            Some(bssid) => {
                let bssid: heapless::String<17> = bssid.try_into().map_err(|_| JoinError::InvalidBssidLength)?;
                self.send_command(AccessPointConnectBssidCommand::new(ssid, password, bssid))?
            }
        };

        info!("Joined access point");
        Ok(())
    }

    /// Scans for access points in range. Malformed result lines are skipped.
    pub fn scan_access_points(&mut self) -> Result<Vec<AccessPoint>, CommandError> {
        let response = self.send_command(ListAccessPointsCommand)?;
        Ok(parse_access_points(response.body.iter().map(String::as_str)))
    }

    /// Returns the version information reported by the AT firmware
    pub fn firmware_version(&mut self) -> Result<String, CommandError> {
        let response = self.send_command(VersionCommand)?;
        Ok(response.text())
    }

    /// Sends a command and maps the error if the command failed or was rejected
    pub(crate) fn send_command<Cmd: AtatCmd + CommandErrorHandler>(
        &mut self,
        command: Cmd,
    ) -> Result<Response, Cmd::Error> {
        let response = self.client.execute(&command).map_err(|error| command.command_error(error))?;

        if !response.is_ok() {
            return Err(command.command_error(CommandError::Rejected));
        }

        Ok(response)
    }

    /// Sets the timeout for sending TCP data in ms
    pub fn set_send_timeout_ms(&mut self, timeout: u32) {
        self.send_timeout = TimerDurationU32::millis(timeout);
    }

    /// Sets a fixed timeout in ms for all commands, replacing the per command defaults
    pub fn set_command_timeout_ms(&mut self, timeout: u32) {
        self.client.set_command_timeout_ms(timeout);
    }

    /// Sets the chunk size in bytes when sending data
    pub fn set_tx_size(&mut self, size: usize) {
        if size == 0 {
            warn!("Ignoring zero transmit chunk size");
            return;
        }

        self.tx_size = size;
    }
}
