//! Embassy async tasks
//!
//! The control task owns the [`Controller`](blinkytile_core::Controller) and
//! never awaits anything but a yield. USB reception and LED transmission run
//! beside it and meet it only through the statics in `channels`.

pub mod control;
pub mod output;
pub mod usb;

pub use control::{control_task, FirmwareController};
pub use output::{output_task, LedTransmitter};
pub use usb::{frame_rx_task, serial_rx_task, usb_task, UsbParts};
