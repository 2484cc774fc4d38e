//! # Connection lifecycle
//!
//! [Modem] owns the modem hardware and the [Session]. A session is either fully established,
//! i.e. joined to the access point with all configured links open, or absent. Every bring-up
//! starts from a hardware reset, so it never depends on state left behind by an earlier attempt.
//!
//! ## Example
//!
//! ````
//! # use esp_at_link::config::Config;
//! # use esp_at_link::example::{ExampleDelay, ExamplePin, ExampleTimer, ExampleTransport};
//! # use esp_at_link::modem::{Modem, ResetPins};
//! # use esp_at_link::session::LinkRole;
//! # use esp_at_link::wifi::Adapter;
//! #
//! let adapter: Adapter<_, _, 1_000_000> = Adapter::new(ExampleTransport::default(), ExampleTimer::default());
//! let pins = ResetPins::new(ExamplePin::default(), ExamplePin::default(), ExampleDelay::default());
//! let config = Config::new("test_wifi", "secret", "10.0.0.1");
//!
//! let mut modem = Modem::new(adapter, pins, ExampleTimer::default(), config);
//!
//! // Resets the modem, joins the access point and opens both links
//! assert!(modem.maintain());
//!
//! let link_id = modem.session().unwrap().link_id(LinkRole::Garden).unwrap();
//! assert!(modem.try_send(link_id, b"PUMP_ON 0\n"));
//! ````
use crate::client::CommandError;
use crate::config::Config;
use crate::session::{Link, LinkRole, Session};
use crate::stack::Error as StackError;
use crate::transport::Transport;
use crate::wifi::{Adapter, ConfigurationError, JoinError};
use alloc::vec::Vec;
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use fugit::TimerDurationU32;
use fugit_timer::Timer;
use log::{info, warn};

/// Duration of the reset pulse
const RESET_PULSE_MS: u32 = 100;

/// Placeholder for boards with GPIO0 strapped high
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Control lines of the modem
pub struct ResetPins<RST: OutputPin, EN: OutputPin, B: OutputPin, D: DelayNs> {
    /// RST line, active low
    reset: RST,

    /// CH_EN line, active high
    enable: EN,

    /// GPIO0, sampled on reset. Low boots into flash mode.
    boot: B,

    delay: D,
}

impl<RST: OutputPin, EN: OutputPin, D: DelayNs> ResetPins<RST, EN, NoPin, D> {
    /// Control lines of a board with GPIO0 strapped high
    pub fn new(reset: RST, enable: EN, delay: D) -> Self {
        Self {
            reset,
            enable,
            boot: NoPin,
            delay,
        }
    }
}

impl<RST: OutputPin, EN: OutputPin, B: OutputPin, D: DelayNs> ResetPins<RST, EN, B, D> {
    /// Control lines including GPIO0, which gets driven high for a normal boot
    pub fn with_boot_pin(reset: RST, enable: EN, boot: B, delay: D) -> Self {
        Self {
            reset,
            enable,
            boot,
            delay,
        }
    }

    /// Power cycles the modem by pulling both reset and enable low
    pub fn pulse(&mut self) -> Result<(), BringUpError> {
        self.boot.set_high().map_err(|_| BringUpError::ResetFailed)?;
        self.reset.set_low().map_err(|_| BringUpError::ResetFailed)?;
        self.enable.set_low().map_err(|_| BringUpError::ResetFailed)?;
        self.delay.delay_ms(RESET_PULSE_MS);
        self.enable.set_high().map_err(|_| BringUpError::ResetFailed)?;
        self.reset.set_high().map_err(|_| BringUpError::ResetFailed)?;
        Ok(())
    }
}

/// Errors of a single bring-up attempt
#[derive(Clone, Debug, PartialEq)]
pub enum BringUpError {
    /// Driving the reset or enable line failed
    ResetFailed,

    /// Boot banner was not received
    NotReady(CommandError),

    /// Echo or WIFI mode configuration failed
    Configuration(ConfigurationError),

    /// Multi connection or passive receiving mode configuration failed
    Stack(StackError),

    /// Joining the access point failed
    Join(JoinError),

    /// Opening the link of the given role failed
    LinkFailed(LinkRole, StackError),
}

impl From<ConfigurationError> for BringUpError {
    fn from(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }
}

impl From<StackError> for BringUpError {
    fn from(error: StackError) -> Self {
        Self::Stack(error)
    }
}

impl From<JoinError> for BringUpError {
    fn from(error: JoinError) -> Self {
        Self::Join(error)
    }
}

/// Connection lifecycle controller
///
/// C: Timer measuring the cooldown between failed bring-up attempts
pub struct Modem<Tr, T, C, RST, EN, B, D, const TIMER_HZ: u32>
where
    Tr: Transport,
    T: Timer<TIMER_HZ>,
    C: Timer<TIMER_HZ>,
    RST: OutputPin,
    EN: OutputPin,
    B: OutputPin,
    D: DelayNs,
{
    pub(crate) adapter: Adapter<Tr, T, TIMER_HZ>,

    pins: ResetPins<RST, EN, B, D>,

    /// Timer used for the retry cooldown
    retry_timer: C,

    /// True while the retry cooldown is running
    cooling_down: bool,

    pub(crate) config: Config,

    /// Current session, None if absent
    pub(crate) session: Option<Session>,
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
    /// Creates a new controller. No session is established until `establish_session()` or `maintain()` is called.
    pub fn new(mut adapter: Adapter<Tr, T, TIMER_HZ>, pins: ResetPins<RST, EN, B, D>, retry_timer: C, config: Config) -> Self {
        adapter.set_send_timeout_ms(config.send_timeout_ms);
        adapter.set_tx_size(config.tx_size);
        if let Some(timeout) = config.command_timeout_ms {
            adapter.set_command_timeout_ms(timeout);
        }

        Self {
            adapter,
            pins,
            retry_timer,
            cooling_down: false,
            config,
            session: None,
        }
    }

    /// Performs a full bring-up: hardware reset, configuration, join and opening of all links.
    ///
    /// Any existing session is destroyed first. On error no session exists afterwards, but the
    /// modem may be left partially configured until the next bring-up resets it.
    pub fn establish_session(&mut self) -> Result<&Session, BringUpError> {
        self.teardown();

        let session = self.bring_up()?;
        info!("Session established");
        Ok(self.session.insert(session))
    }

    /// Establishes a session if none exists. After a failed attempt or a session lost by a failed
    /// transmission, the next attempt is made once the retry cooldown has elapsed.
    /// Returns true if a session exists.
    pub fn maintain(&mut self) -> bool {
        if self.session.is_some() {
            return true;
        }

        if self.cooling_down {
            match self.retry_timer.wait() {
                Err(nb::Error::WouldBlock) => return false,
                Err(nb::Error::Other(_)) => warn!("Retry timer error"),
                Ok(_) => {}
            }
            self.cooling_down = false;
        }

        match self.establish_session() {
            Ok(_) => true,
            Err(error) => {
                warn!("Bring-up failed: {:?}", error);
                self.start_cooldown();
                false
            }
        }
    }

    /// Returns the adapter, e.g. for scanning access points
    pub fn adapter(&mut self) -> &mut Adapter<Tr, T, TIMER_HZ> {
        &mut self.adapter
    }

    fn bring_up(&mut self) -> Result<Session, BringUpError> {
        self.pins.pulse()?;
        self.adapter
            .client
            .await_ready(TimerDurationU32::millis(self.config.ready_timeout_ms))
            .map_err(BringUpError::NotReady)?;
        info!("Modem ready");

        self.adapter.disable_echo()?;
        self.adapter.set_station_mode()?;
        self.adapter.enable_multiple_connections()?;
        self.adapter.enable_passive_receiving_mode()?;

        self.adapter
            .join(&self.config.ssid, &self.config.password, self.config.bssid.as_deref())?;

        let mut links: Vec<Link> = Vec::new();
        for link in self.config.links.iter() {
            if let Err(error) = self.adapter.connect(link.link_id, &self.config.hub_host, link.port) {
                // Links are either all open or none
                for opened in &links {
                    if let Err(close_error) = self.adapter.close(opened.id) {
                        warn!("Closing link {} failed: {:?}", opened.id, close_error);
                    }
                }
                return Err(BringUpError::LinkFailed(link.role, error));
            }

            links.push(Link {
                id: link.link_id,
                role: link.role,
            });
        }

        Ok(Session::new(links))
    }

    /// Destroys the session after a failed transmission and delays the next bring-up
    pub(crate) fn drop_session(&mut self) {
        self.teardown();
        self.start_cooldown();
    }

    fn start_cooldown(&mut self) {
        match self
            .retry_timer
            .start(TimerDurationU32::millis(self.config.retry_cooldown_ms))
        {
            Ok(_) => self.cooling_down = true,
            Err(_) => warn!("Unable to start retry timer"),
        }
    }
}
