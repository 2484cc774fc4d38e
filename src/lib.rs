//! # ESP-AT link driver
//!
//! Blocking driver for ESP8266/ESP32 modems running the ESP-AT firmware, connecting a node to a
//! hub over two TCP links.
//!
//! * [client]: Command engine classifying the modem responses
//! * [wifi] and [stack]: Access point and TCP link operations of [wifi::Adapter]
//! * [modem]: Hardware reset, bring-up and ownership of the [session::Session]
//! * [session]: Data exchange which tears down the session on failure
#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

extern crate alloc;

pub mod client;
pub(crate) mod commands;
pub mod config;
pub mod modem;
pub mod responses;
pub mod session;
pub mod stack;
pub mod transport;
pub mod wifi;

#[cfg(feature = "examples")]
pub mod example;

#[cfg(test)]
mod tests;
