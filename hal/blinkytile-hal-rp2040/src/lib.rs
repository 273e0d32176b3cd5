//! RP2040-specific HAL for the BlinkyTile controller firmware
//!
//! Implements the `blinkytile-hal` traits on embassy-rp:
//!
//! - LED output handle shared with the transmit task
//! - Debounced GPIO buttons
//! - Byte pipe standing in for the USB serial port
//! - Flash: animation table reader and config key-value storage
//! - Watchdog, scratch-register boot cell, clock and system control

#![no_std]
#![deny(unsafe_code)]

pub mod button;
pub mod flash;
pub mod led;
pub mod serial;
pub mod system;

pub use blinkytile_hal::{FlashStorage as FlashStorageTrait, StorageKey};
