//! Fixed configuration of the lifecycle controller
use crate::session::LinkRole;
use alloc::string::String;

/// Hub connection of a single link
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkConfig {
    pub role: LinkRole,

    /// ESP-AT link id (0-4)
    pub link_id: usize,

    /// Hub port of this role
    pub port: u16,
}

/// Network credentials, hub address and timing of the modem session
///
/// Values are not validated. Limits of the modem commands are reported as errors during bring-up.
#[derive(Clone, Debug)]
pub struct Config {
    pub ssid: String,
    pub password: String,

    /// Only join the access point with this MAC address
    pub bssid: Option<String>,

    /// Host name or IP address of the hub
    pub hub_host: String,

    /// Links opened on bring-up, in this order
    pub links: [LinkConfig; 2],

    /// Max. time to wait for the boot banner after reset
    pub ready_timeout_ms: u32,

    /// Timeout for data transmission
    pub send_timeout_ms: u32,

    /// Fixed timeout for all other commands. None => each command uses its own default.
    pub command_timeout_ms: Option<u32>,

    /// Max. bytes fetched by a single receive poll
    pub rx_size: usize,

    /// Chunk size in bytes when sending data
    pub tx_size: usize,

    /// Cooldown after a failed bring-up before the next attempt
    pub retry_cooldown_ms: u32,
}

impl Config {
    pub fn new(ssid: &str, password: &str, hub_host: &str) -> Self {
        Self {
            ssid: String::from(ssid),
            password: String::from(password),
            bssid: None,
            hub_host: String::from(hub_host),
            links: [
                LinkConfig {
                    role: LinkRole::Environment,
                    link_id: 1,
                    port: 2939,
                },
                LinkConfig {
                    role: LinkRole::Garden,
                    link_id: 0,
                    port: 2938,
                },
            ],
            ready_timeout_ms: 5_000,
            send_timeout_ms: 5_000,
            command_timeout_ms: None,
            rx_size: 256,
            tx_size: 2048,
            retry_cooldown_ms: 30_000,
        }
    }

    pub fn with_bssid(mut self, bssid: &str) -> Self {
        self.bssid = Some(String::from(bssid));
        self
    }

    /// Replaces the link id and port of the given role
    pub fn with_link(mut self, role: LinkRole, link_id: usize, port: u16) -> Self {
        for link in self.links.iter_mut().filter(|link| link.role == role) {
            link.link_id = link_id;
            link.port = port;
        }
        self
    }

    pub fn with_ready_timeout_ms(mut self, timeout: u32) -> Self {
        self.ready_timeout_ms = timeout;
        self
    }

    pub fn with_send_timeout_ms(mut self, timeout: u32) -> Self {
        self.send_timeout_ms = timeout;
        self
    }

    pub fn with_command_timeout_ms(mut self, timeout: u32) -> Self {
        self.command_timeout_ms = Some(timeout);
        self
    }

    pub fn with_rx_size(mut self, size: usize) -> Self {
        self.rx_size = size;
        self
    }

    pub fn with_tx_size(mut self, size: usize) -> Self {
        self.tx_size = size;
        self
    }

    pub fn with_retry_cooldown_ms(mut self, cooldown: u32) -> Self {
        self.retry_cooldown_ms = cooldown;
        self
    }

    /// Returns the link configuration of the given role
    pub fn link(&self, role: LinkRole) -> Option<&LinkConfig> {
        self.links.iter().find(|link| link.role == role)
    }
}
