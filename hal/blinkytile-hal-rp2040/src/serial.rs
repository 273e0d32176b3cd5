//! Serial port over a byte pipe
//!
//! The USB task pushes CDC-ACM payload bytes into a [`SerialPipe`]; the
//! control loop drains it through [`PipeSerial`] without awaiting.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;

use blinkytile_hal::SerialPort;

/// Bytes buffered between USB reception and the control loop
pub const SERIAL_PIPE_SIZE: usize = 256;

pub type SerialPipe = Pipe<CriticalSectionRawMutex, SERIAL_PIPE_SIZE>;

/// Control-loop side of the serial pipe
pub struct PipeSerial {
    pipe: &'static SerialPipe,
}

impl PipeSerial {
    pub fn new(pipe: &'static SerialPipe) -> Self {
        Self { pipe }
    }
}

impl SerialPort for PipeSerial {
    fn bytes_available(&mut self) -> bool {
        !self.pipe.is_empty()
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.pipe.try_read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }
}
