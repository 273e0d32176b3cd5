//! Configuration type definitions
//!
//! The controller configuration is stored in flash as postcard-serialized
//! binary data. Defaults reproduce the stock firmware behaviour.

use blinkytile_hal::OutputProtocol;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Current configuration layout version
pub const CONFIG_VERSION: u8 = 1;

/// Number of steps in the brightness ladder
pub const BRIGHTNESS_COUNT: usize = 5;

/// Stock brightness ladder
pub const DEFAULT_BRIGHTNESS_LEVELS: [u8; BRIGHTNESS_COUNT] = [5, 20, 60, 120, 255];

/// Watchdog timeout. Shorter than the slowest flash operation, so every
/// blocking path has to feed it.
pub const DEFAULT_WATCHDOG_TIMEOUT_MS: u32 = 500;

/// Grace window before USB detach during bootloader handoff
pub const DEFAULT_HANDOFF_GRACE_MS: u32 = 10;

/// Shortest watchdog timeout accepted by [`ControllerConfig::validate`]
pub const MIN_WATCHDOG_TIMEOUT_MS: u32 = 100;

/// Maximum serialized size of [`ControllerConfig`]
pub const MAX_CONFIG_SIZE: usize = 32;

/// Configuration validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Layout version is not [`CONFIG_VERSION`]
    VersionMismatch,
    /// Brightness step outside the ladder
    BrightnessStep,
    /// Watchdog timeout below [`MIN_WATCHDOG_TIMEOUT_MS`]
    WatchdogTimeout,
    /// Grace window would starve the watchdog
    HandoffGrace,
    /// Postcard encoding or decoding failed
    Serialization,
}

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControllerConfig {
    /// Layout version
    pub version: u8,
    /// Brightness ladder, dimmest first
    pub brightness_levels: [u8; BRIGHTNESS_COUNT],
    /// Selected ladder step
    pub brightness_step: u8,
    /// Output protocol selected at boot
    pub default_protocol: OutputProtocol,
    /// Hardware watchdog timeout
    pub watchdog_timeout_ms: u32,
    /// Wait between writing the boot token and detaching USB
    pub handoff_grace_ms: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            brightness_levels: DEFAULT_BRIGHTNESS_LEVELS,
            brightness_step: (BRIGHTNESS_COUNT - 1) as u8,
            default_protocol: OutputProtocol::Ws2812,
            watchdog_timeout_ms: DEFAULT_WATCHDOG_TIMEOUT_MS,
            handoff_grace_ms: DEFAULT_HANDOFF_GRACE_MS,
        }
    }
}

impl ControllerConfig {
    /// Brightness for the selected step
    ///
    /// Out-of-range steps clamp to the brightest level.
    pub fn brightness(&self) -> u8 {
        let step = (self.brightness_step as usize).min(BRIGHTNESS_COUNT - 1);
        self.brightness_levels[step]
    }

    /// Check the configuration is safe to run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch);
        }
        if self.brightness_step as usize >= BRIGHTNESS_COUNT {
            return Err(ConfigError::BrightnessStep);
        }
        if self.watchdog_timeout_ms < MIN_WATCHDOG_TIMEOUT_MS {
            return Err(ConfigError::WatchdogTimeout);
        }
        if self.handoff_grace_ms >= self.watchdog_timeout_ms {
            return Err(ConfigError::HandoffGrace);
        }
        Ok(())
    }

    /// Decode and validate a postcard-encoded configuration
    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Serialization)?;
        config.validate()?;
        Ok(config)
    }

    /// Encode with postcard into `buffer`, returning the used prefix length
    #[cfg(feature = "serde")]
    pub fn to_bytes(&self, buffer: &mut [u8]) -> Result<usize, ConfigError> {
        postcard::to_slice(self, buffer)
            .map(|used| used.len())
            .map_err(|_| ConfigError::Serialization)
    }
}
