//! BlinkyTile Hardware Abstraction Layer
//!
//! This crate defines the traits the controller core talks to. Chip-specific
//! HALs (currently RP2040) implement them, and the core's unit tests mock them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  blinkytile-firmware                    │
//! └─────────────────────────────────────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌─────────────────┐   ┌───────────────────┐
//! │ blinkytile-core │──▶│ blinkytile-hal    │
//! └─────────────────┘   │ (this crate)      │
//!                       └───────────────────┘
//!                                 ▲
//!                       ┌───────────────────┐
//!                       │ blinkytile-hal-   │
//!                       │     rp2040        │
//!                       └───────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`led::OutputDriver`] - Pixel buffer and protocol-specific transmission
//! - [`flash::AnimationStore`] - Animations persisted in external flash
//! - [`flash::FlashStorage`] - Key-value storage for configuration
//! - [`button::ButtonInput`] - Debounced button presses
//! - [`serial::SerialPort`] - Byte-oriented command channel
//! - [`system::Watchdog`], [`system::BootTokenCell`], [`system::SystemControl`],
//!   [`system::Clock`] - Liveness and bootloader handoff primitives

#![no_std]
#![deny(unsafe_code)]

pub mod button;
pub mod flash;
pub mod led;
pub mod serial;
pub mod system;

// Re-export key traits at crate root for convenience
pub use button::{ButtonEvent, ButtonId, ButtonInput};
pub use flash::table::{FlashRead, TableStore};
pub use flash::{AnimationInfo, AnimationStore, FlashError, FlashStorage, StorageKey, StoreError};
pub use led::{OutputDriver, OutputProtocol, Rgb};
pub use serial::SerialPort;
pub use system::{BootTokenCell, Clock, SystemControl, Watchdog};
