use crate::client::CommandError;
use crate::responses::NoResponse;
use crate::stack::Error as StackError;
use crate::wifi::{ConfigurationError, JoinError};
use atat::atat_derive::AtatCmd;
use heapless::String;

/// Trait for mapping command errors
pub trait CommandErrorHandler {
    type Error;

    /// Maps errors of the command engine
    fn command_error(&self, error: CommandError) -> Self::Error;
}

/// Disables echoing of received commands
#[derive(Clone, AtatCmd)]
#[at_cmd("E0", NoResponse, timeout_ms = 1_000)]
pub struct DisableEchoCommand;

impl CommandErrorHandler for DisableEchoCommand {
    type Error = ConfigurationError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        ConfigurationError::EchoError(error)
    }
}

/// Sets the WIFI mode without storing it to flash
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+CWMODE_CUR", NoResponse, timeout_ms = 1_000)]
pub struct WifiModeCommand {
    /// WIFI mode:
    ///     1: Station mode.
    ///     2: SoftAP mode.
    ///     3: SoftAP+Station mode.
    #[at_arg(position = 0)]
    mode: usize,
}

impl WifiModeCommand {
    pub fn station_mode() -> Self {
        Self { mode: 1 }
    }
}

impl CommandErrorHandler for WifiModeCommand {
    type Error = ConfigurationError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        ConfigurationError::ModeError(error)
    }
}

/// Joins the given access point without storing the credentials to flash
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+CWJAP_CUR", NoResponse, timeout_ms = 20_000)]
pub struct AccessPointConnectCommand {
    /// The SSID of the target access point
    #[at_arg(position = 0)]
    ssid: String<32>,

    /// The password/key of the target access point
    #[at_arg(position = 1)]
    password: String<64>,
}

impl AccessPointConnectCommand {
    pub fn new(ssid: String<32>, password: String<64>) -> Self {
        Self { ssid, password }
    }
}

impl CommandErrorHandler for AccessPointConnectCommand {
    type Error = JoinError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        JoinError::ConnectError(error)
    }
}

/// Joins the access point with the given SSID and MAC address (BSSID)
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+CWJAP_CUR", NoResponse, timeout_ms = 20_000)]
pub struct AccessPointConnectBssidCommand {
    #[at_arg(position = 0)]
    ssid: String<32>,

    #[at_arg(position = 1)]
    password: String<64>,

    /// MAC address of the target access point, e.g. `ca:d7:19:d8:a6:44`
    #[at_arg(position = 2)]
    bssid: String<17>,
}

impl AccessPointConnectBssidCommand {
    pub fn new(ssid: String<32>, password: String<64>, bssid: String<17>) -> Self {
        Self { ssid, password, bssid }
    }
}

impl CommandErrorHandler for AccessPointConnectBssidCommand {
    type Error = JoinError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        JoinError::ConnectError(error)
    }
}

/// Lists the available access points
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWLAP", NoResponse, timeout_ms = 10_000)]
pub struct ListAccessPointsCommand;

impl CommandErrorHandler for ListAccessPointsCommand {
    type Error = CommandError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        error
    }
}

/// Queries the AT firmware version information
#[derive(Clone, AtatCmd)]
#[at_cmd("+GMR", NoResponse, timeout_ms = 1_000)]
pub struct VersionCommand;

impl CommandErrorHandler for VersionCommand {
    type Error = CommandError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        error
    }
}

/// Enables/Disables multiple connections
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPMUX", NoResponse, timeout_ms = 1_000)]
pub struct SetMultipleConnectionsCommand {
    /// 0: single connection, 1: multiple connections
    mode: usize,
}

impl SetMultipleConnectionsCommand {
    /// Enables multiple connections
    pub fn multiple() -> Self {
        Self { mode: 1 }
    }
}

impl CommandErrorHandler for SetMultipleConnectionsCommand {
    type Error = StackError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        StackError::EnablingMultiConnectionsFailed(error)
    }
}

/// Sets the socket receiving mode
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPRECVMODE", NoResponse, timeout_ms = 1_000)]
pub struct SetSocketReceivingModeCommand {
    /// 0: active mode => ESP-AT will send all the received socket data instantly to the host MCU
    /// 1: passive mode => ESP-AT will keep the received socket data in an internal buffer
    mode: usize,
}

impl SetSocketReceivingModeCommand {
    /// Enables the passive receiving mode
    pub fn passive_mode() -> Self {
        Self { mode: 1 }
    }
}

impl CommandErrorHandler for SetSocketReceivingModeCommand {
    type Error = StackError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        StackError::EnablingPassiveSocketModeFailed(error)
    }
}

/// Establishes a TCP connection on the given link
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSTART", NoResponse, timeout_ms = 10_000)]
pub struct ConnectCommand {
    /// Socket ID
    link_id: usize,

    /// Connection type, always TCP
    connection_type: String<5>,

    /// Remote host name or IP address
    remote_host: String<64>,

    /// Remote port
    port: u16,
}

impl ConnectCommand {
    pub fn tcp(link_id: usize, remote_host: String<64>, port: u16) -> Self {
        let mut connection_type = String::new();
        let _ = connection_type.push_str("TCP");

        Self {
            link_id,
            connection_type,
            remote_host,
            port,
        }
    }
}

impl CommandErrorHandler for ConnectCommand {
    type Error = StackError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        StackError::ConnectError(error)
    }
}

/// Declares the length of the next transmission. Modem answers with a `>` prompt once ready.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSEND", NoResponse, timeout_ms = 5_000)]
pub struct TransmissionPrepareCommand {
    /// Socket ID
    link_id: usize,

    /// Length of the following data in bytes
    length: usize,
}

impl TransmissionPrepareCommand {
    pub fn new(link_id: usize, length: usize) -> Self {
        Self { link_id, length }
    }
}

impl CommandErrorHandler for TransmissionPrepareCommand {
    type Error = StackError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        StackError::TransmissionStartFailed(error)
    }
}

/// Fetches data buffered by the modem in passive receiving mode
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPRECVDATA", NoResponse, timeout_ms = 2_000)]
pub struct ReceiveDataCommand {
    /// Socket ID
    link_id: usize,

    /// Max. length of data to fetch
    max_length: usize,
}

impl ReceiveDataCommand {
    pub fn new(link_id: usize, max_length: usize) -> Self {
        Self { link_id, max_length }
    }
}

impl CommandErrorHandler for ReceiveDataCommand {
    type Error = StackError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        StackError::ReceiveFailed(error)
    }
}

/// Closes the connection of the given link
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPCLOSE", NoResponse, timeout_ms = 5_000)]
pub struct CloseSocketCommand {
    /// Socket ID
    link_id: usize,
}

impl CloseSocketCommand {
    pub fn new(link_id: usize) -> Self {
        Self { link_id }
    }
}

impl CommandErrorHandler for CloseSocketCommand {
    type Error = StackError;

    fn command_error(&self, error: CommandError) -> Self::Error {
        StackError::CloseError(error)
    }
}
