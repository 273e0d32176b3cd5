//! Shared state between tasks
//!
//! The USB tasks, the control task and the LED transmit task share only
//! what is declared here.

use portable_atomic::AtomicBool;

use blinkytile_core::intake::FrameMailbox;
use blinkytile_core::ReloadSignal;
use blinkytile_hal_rp2040::led::LedLink;
use blinkytile_hal_rp2040::serial::SerialPipe;

/// LEDs on the strip
pub const LED_COUNT: usize = 160;

/// Finalized USB frames, USB task to control task
pub static FRAME_MAILBOX: FrameMailbox<LED_COUNT> = FrameMailbox::new();

/// USB serial bytes, USB task to control task
pub static SERIAL_PIPE: SerialPipe = SerialPipe::new();

/// Frames to transmit, control task to output task
pub static LED_LINK: LedLink<LED_COUNT> = LedLink::new();

/// Animation store reload request; pending at boot
pub static RELOAD: ReloadSignal = ReloadSignal::pending();

/// Set by the DFU detach request; the control task hands off on the next tick
pub static BOOTLOADER_REQUEST: AtomicBool = AtomicBool::new(false);
