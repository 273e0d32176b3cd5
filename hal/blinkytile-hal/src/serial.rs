//! Serial command channel abstraction

/// Byte-oriented serial receiver
///
/// Non-blocking: the controller drains it only while bytes are pending.
pub trait SerialPort {
    /// Check if at least one byte is waiting
    fn bytes_available(&mut self) -> bool;

    /// Read one byte, or `None` if nothing is pending
    fn read_byte(&mut self) -> Option<u8>;
}
