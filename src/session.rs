//! # Session
//!
//! Data exchange on the links of an established session. Any failed transmission or a stuck
//! modem destroys the whole session, as the link states on the modem can not be inspected from
//! the host. `maintain()` rebuilds it from a hardware reset once the retry cooldown has elapsed.
use crate::modem::Modem;
use crate::stack::Error as StackError;
use crate::transport::Transport;
use alloc::string::String;
use alloc::vec::Vec;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use fugit_timer::Timer;
use log::{info, warn};

/// Purpose of a link to the hub
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LinkRole {
    /// Environment telemetry, e.g. temperatures
    Environment,

    /// Garden control: telemetry of the watering system and commands from the hub
    Garden,
}

/// Open link of a session
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub id: usize,
    pub role: LinkRole,
}

/// Joined access point plus all open links
///
/// Only created by a successful bring-up. Once destroyed it can not be restored.
#[derive(Debug, PartialEq, Eq)]
pub struct Session {
    links: Vec<Link>,
}

impl Session {
    pub(crate) fn new(links: Vec<Link>) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Returns the link id of the given role
    pub fn link_id(&self, role: LinkRole) -> Option<usize> {
        self.links.iter().find(|link| link.role == role).map(|link| link.id)
    }
}

impl<Tr, T, C, RST, EN, B, D, const TIMER_HZ: u32> Modem<Tr, T, C, RST, EN, B, D, TIMER_HZ>
where
    Tr: Transport,
    T: Timer<TIMER_HZ>,
    C: Timer<TIMER_HZ>,
    RST: OutputPin,
    EN: OutputPin,
    B: OutputPin,
    D: DelayNs,
{
    /// Returns the current session, None if absent
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Destroys the current session
    pub fn teardown(&mut self) {
        if self.session.take().is_some() {
            info!("Session torn down");
        }
    }

    /// Sends the payload on the given link.
    ///
    /// Returns false without any modem communication if no session exists. On failure the
    /// session is destroyed and the retry cooldown started.
    pub fn try_send(&mut self, link_id: usize, payload: &[u8]) -> bool {
        if self.session.is_none() {
            return false;
        }

        match self.adapter.send(link_id, payload) {
            Ok(_) => true,
            Err(error) => {
                warn!("Sending on link {} failed: {:?}", link_id, error);
                self.drop_session();
                false
            }
        }
    }

    /// Fetches a single chunk of buffered data of the given link. Empty if no data is available
    /// or no session exists. A stuck modem destroys the session.
    pub fn receive(&mut self, link_id: usize) -> Vec<u8> {
        if self.session.is_none() {
            return Vec::new();
        }

        match self.adapter.receive(link_id, self.config.rx_size) {
            Ok(data) => data,
            Err(StackError::InvalidLinkId) => {
                warn!("Receiving on invalid link {}", link_id);
                Vec::new()
            }
            Err(error) => {
                warn!("Receiving on link {} failed: {:?}", link_id, error);
                self.drop_session();
                Vec::new()
            }
        }
    }

    /// Fetches all data currently buffered for the given link
    pub fn drain(&mut self, link_id: usize) -> Vec<u8> {
        let mut data = Vec::new();

        loop {
            let chunk = self.receive(link_id);
            if chunk.is_empty() {
                return data;
            }

            data.extend_from_slice(&chunk);
        }
    }
}

/// Splits received link data into `\n` terminated lines
///
/// Incomplete lines are kept until the rest arrives.
#[derive(Default, Debug)]
pub struct LineBuffer {
    partial: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the data and returns all lines completed by it, without terminator
    pub fn feed(&mut self, data: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for byte in data {
            if *byte == b'\n' {
                lines.push(String::from_utf8_lossy(&self.partial).into_owned());
                self.partial.clear();
            } else {
                self.partial.push(*byte);
            }
        }

        lines
    }

    /// Drops an incomplete line, e.g. after the session has been rebuilt
    pub fn clear(&mut self) {
        self.partial.clear();
    }
}
