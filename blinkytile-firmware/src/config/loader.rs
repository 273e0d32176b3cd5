//! Configuration persistence
//!
//! Loads the controller configuration from flash. Falls back to defaults if
//! the flash is empty or holds something invalid, and writes the defaults
//! back when nothing was stored yet.

use defmt::*;

use blinkytile_core::config::{self, ControllerConfig, MAX_CONFIG_SIZE};
use blinkytile_hal_rp2040::flash::{FlashError, Rp2040FlashStorage, StorageKey};
// Import the FlashStorage trait to bring methods into scope
use blinkytile_hal_rp2040::FlashStorageTrait;

/// Configuration persistence errors
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Flash operation failed
    Flash(FlashError),
    /// Stored bytes did not decode or validate
    Invalid(config::ConfigError),
}

impl From<FlashError> for ConfigError {
    fn from(e: FlashError) -> Self {
        ConfigError::Flash(e)
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Invalid(e)
    }
}

/// Configuration persistence manager
pub struct ConfigPersistence<'d> {
    storage: Rp2040FlashStorage<'d>,
}

impl<'d> ConfigPersistence<'d> {
    pub fn new(storage: Rp2040FlashStorage<'d>) -> Self {
        Self { storage }
    }

    /// Load and validate the stored configuration
    pub async fn load(&mut self) -> Result<ControllerConfig, ConfigError> {
        let mut buffer = [0u8; MAX_CONFIG_SIZE];
        let len = self
            .storage
            .read(StorageKey::ControllerConfig, &mut buffer)
            .await?;

        debug!("Read {} bytes of config from flash", len);

        let config = ControllerConfig::from_bytes(&buffer[..len])?;
        log_config_summary(&config);
        Ok(config)
    }

    /// Store a configuration
    pub async fn save(&mut self, config: &ControllerConfig) -> Result<(), ConfigError> {
        let mut buffer = [0u8; MAX_CONFIG_SIZE];
        let len = config.to_bytes(&mut buffer)?;
        self.storage
            .write(StorageKey::ControllerConfig, &buffer[..len])
            .await?;
        info!("Saved {} bytes of config to flash", len);
        Ok(())
    }

    /// Load the configuration, or fall back to defaults
    pub async fn load_or_default(&mut self) -> ControllerConfig {
        match self.load().await {
            Ok(config) => config,
            Err(ConfigError::Flash(FlashError::NotFound)) => {
                info!("No configuration in flash, storing defaults");
                let config = ControllerConfig::default();
                if let Err(e) = self.save(&config).await {
                    warn!("Failed to store default config: {:?}", e);
                }
                config
            }
            Err(e) => {
                warn!("Stored configuration rejected: {:?}, using defaults", e);
                ControllerConfig::default()
            }
        }
    }
}

/// Log a summary of the loaded configuration
fn log_config_summary(config: &ControllerConfig) {
    info!("Configuration loaded successfully");
    debug!("  brightness {} (step {})", config.brightness(), config.brightness_step);
    debug!("  protocol {}", config.default_protocol.name());
    debug!(
        "  watchdog {}ms, handoff grace {}ms",
        config.watchdog_timeout_ms, config.handoff_grace_ms
    );
}
