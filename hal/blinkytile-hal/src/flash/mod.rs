//! Flash storage abstractions
//!
//! Two views onto external flash:
//!
//! - [`AnimationStore`]: read-only access to the persisted animation
//!   sequences, polled synchronously from the control loop
//! - [`FlashStorage`]: wear-leveled key-value storage for configuration

use crate::led::Rgb;

pub mod table;

/// Storage keys for configuration data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StorageKey {
    /// Controller configuration (binary postcard format)
    ControllerConfig = 0,
    /// Reserved for future use
    Reserved1 = 1,
}

impl StorageKey {
    /// Get the key as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a key from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StorageKey::ControllerConfig),
            1 => Some(StorageKey::Reserved1),
            _ => None,
        }
    }
}

/// Errors from key-value flash operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Flash operation failed
    Flash,
    /// Storage operation failed
    Storage,
    /// Key not found
    NotFound,
    /// Buffer too small for the data
    BufferTooSmall,
}

/// Key-value flash storage
pub trait FlashStorage {
    /// Read a value by key into the provided buffer
    ///
    /// Returns the number of bytes read.
    fn read(
        &mut self,
        key: StorageKey,
        buffer: &mut [u8],
    ) -> impl core::future::Future<Output = Result<usize, FlashError>>;

    /// Write a value by key
    fn write(
        &mut self,
        key: StorageKey,
        data: &[u8],
    ) -> impl core::future::Future<Output = Result<(), FlashError>>;
}

/// Errors from the animation store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Underlying flash read failed
    Flash,
    /// No valid animation table found
    NoTable,
    /// Animation index out of range
    NoSuchAnimation,
    /// Frame index out of range
    NoSuchFrame,
    /// Stored data does not fit the caller's buffer
    BufferTooSmall,
}

/// Timing metadata of one stored animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnimationInfo {
    /// Number of frames in the sequence
    pub frame_count: u32,
    /// Display time of each frame in milliseconds
    pub speed_ms: u32,
}

/// Persisted animation sequences
///
/// Sequences are immutable while they play. [`AnimationStore::begin`] re-reads
/// the table from flash and may take longer than the watchdog period allows
/// for a whole tick, so callers refresh the watchdog around it.
pub trait AnimationStore {
    /// (Re)open the store and read the animation table
    ///
    /// After an error the store reports zero animations.
    fn begin(&mut self) -> Result<(), StoreError>;

    /// Number of stored animations
    fn count(&self) -> usize;

    /// Metadata for one animation
    fn animation(&self, index: usize) -> Option<AnimationInfo>;

    /// Read one frame into `dest`
    ///
    /// `dest` is the output driver's pixel buffer, one entry per LED.
    fn read_frame(&mut self, index: usize, frame: u32, dest: &mut [Rgb]) -> Result<(), StoreError>;
}

// Implement the sequential-storage Key trait when the feature is enabled
#[cfg(feature = "sequential-storage")]
impl sequential_storage::map::Key for StorageKey {
    fn serialize_into(
        &self,
        buffer: &mut [u8],
    ) -> Result<usize, sequential_storage::map::SerializationError> {
        if buffer.is_empty() {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        buffer[0] = self.as_u8();
        Ok(1)
    }

    fn deserialize_from(
        buffer: &[u8],
    ) -> Result<(Self, usize), sequential_storage::map::SerializationError> {
        if buffer.is_empty() {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        match StorageKey::from_u8(buffer[0]) {
            Some(key) => Ok((key, 1)),
            None => Err(sequential_storage::map::SerializationError::InvalidFormat),
        }
    }
}
