//! Board-agnostic core logic for the BlinkyTile controller firmware
//!
//! This crate contains the control loop and everything it decides, with all
//! hardware reached through `blinkytile-hal` traits:
//!
//! - Mode state machine (init / autonomous / streaming)
//! - Animation playback scheduler
//! - USB frame mailbox and streaming intake adapter
//! - Serial pixel-stream decoder
//! - Button event handling
//! - Watchdog supervision and bootloader handoff
//! - Configuration type definitions
//!
//! [`Controller`] ties them together and is the only owner of playback state.

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod controller;
pub mod input;
pub mod intake;
pub mod pattern;
pub mod safety;
pub mod scheduler;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{Controller, ControllerIo, ReloadSignal, TickReport};
