//! Flash storage drivers for RP2040
//!
//! The 2MB QSPI flash is split into three regions:
//!
//! ```text
//! 0x000000 ┌──────────────────────┐
//!          │ firmware             │
//! 0x100000 ├──────────────────────┤
//!          │ animation table      │  TableStore, blocking reads
//! 0x1F0000 ├──────────────────────┤
//!          │ config (64KB)        │  sequential-storage map
//! 0x200000 └──────────────────────┘
//! ```
//!
//! Animation reads happen inside the control loop and are blocking, like the
//! rest of the tick. Config access happens once at boot and is async.

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Blocking, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

pub use blinkytile_hal::flash::{FlashError, StorageKey};
use blinkytile_hal::{FlashRead, StoreError, TableStore};

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
pub const CONFIG_PARTITION_SIZE: usize = 64 * 1024;
pub const CONFIG_PARTITION_START: usize = FLASH_SIZE - CONFIG_PARTITION_SIZE;

/// Start of the animation partition
pub const ANIMATION_PARTITION_START: usize = 1024 * 1024;

/// Size of the animation partition
pub const ANIMATION_PARTITION_SIZE: usize = CONFIG_PARTITION_START - ANIMATION_PARTITION_START;

/// Flash erase size for RP2040
pub const FLASH_ERASE_SIZE: usize = ERASE_SIZE;

/// Flash range for the config partition
pub const CONFIG_RANGE: core::ops::Range<u32> =
    (CONFIG_PARTITION_START as u32)..(FLASH_SIZE as u32);

/// Scratch buffer for sequential-storage items
const ITEM_BUFFER_SIZE: usize = 128;

/// Wear-leveled key-value storage for configuration
pub struct Rp2040FlashStorage<'d> {
    flash: Flash<'d, FLASH, Async, FLASH_SIZE>,
}

impl<'d> Rp2040FlashStorage<'d> {
    pub fn new(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Self {
        Self {
            flash: Flash::new(flash, dma),
        }
    }
}

impl blinkytile_hal::FlashStorage for Rp2040FlashStorage<'_> {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        let mut data_buffer = [0u8; ITEM_BUFFER_SIZE];

        let result = map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            CONFIG_RANGE,
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
        )
        .await;

        match result {
            Ok(Some(data)) => {
                let len = data.len();
                if buffer.len() < len {
                    return Err(FlashError::BufferTooSmall);
                }
                buffer[..len].copy_from_slice(data);
                Ok(len)
            }
            Ok(None) => Err(FlashError::NotFound),
            Err(_) => Err(FlashError::Storage),
        }
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        let mut data_buffer = [0u8; ITEM_BUFFER_SIZE];

        map::store_item(
            &mut self.flash,
            CONFIG_RANGE,
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
            &data,
        )
        .await
        .map_err(|_| FlashError::Storage)
    }
}

/// Blocking reader over the animation partition
pub struct AnimationFlash<'d> {
    flash: Flash<'d, FLASH, Blocking, FLASH_SIZE>,
}

impl<'d> AnimationFlash<'d> {
    pub fn new(flash: Peri<'d, FLASH>) -> Self {
        Self {
            flash: Flash::new_blocking(flash),
        }
    }
}

impl FlashRead for AnimationFlash<'_> {
    fn read(&mut self, offset: u32, buffer: &mut [u8]) -> Result<(), StoreError> {
        let in_bounds = (offset as usize)
            .checked_add(buffer.len())
            .is_some_and(|end| end <= ANIMATION_PARTITION_SIZE);
        if !in_bounds {
            return Err(StoreError::Flash);
        }
        self.flash
            .blocking_read(ANIMATION_PARTITION_START as u32 + offset, buffer)
            .map_err(|_| StoreError::Flash)
    }
}

/// Animation store over the on-chip flash partition
pub type Rp2040AnimationStore<'d> = TableStore<AnimationFlash<'d>>;
