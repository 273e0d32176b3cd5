//! Button input abstractions
//!
//! Debouncing belongs to the implementation. The controller polls once per
//! tick and consumes at most one event.

/// Physical button identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonId {
    /// Animation select
    A,
    /// Output protocol select
    B,
}

/// A debounced button transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonEvent {
    /// Which button changed
    pub id: ButtonId,
    /// `true` for a press, `false` for a release
    pub pressed: bool,
}

impl ButtonEvent {
    /// A press of `id`
    pub const fn press(id: ButtonId) -> Self {
        Self { id, pressed: true }
    }
}

/// Polled, debounced button input
pub trait ButtonInput {
    /// Sample the pins and advance debouncing
    ///
    /// Called once per control-loop tick.
    fn poll(&mut self);

    /// Check if an event is waiting
    fn is_pressed(&self) -> bool;

    /// Take the oldest pending event
    fn take_event(&mut self) -> Option<ButtonEvent>;
}
