//! Mode definition
//!
//! Rendering behaviour is a function of the current mode. Button presses do
//! not appear here: they act identically in every mode.

use super::events::Event;

/// Controller modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Boot or reload in progress; animation store being (re)opened
    #[default]
    Init,
    /// LEDs driven by stored animations (or the fallback pattern)
    Autonomous,
    /// LEDs driven by USB or serial data until the next reload
    Streaming,
}

impl Mode {
    /// Check if autonomous rendering should run this tick
    pub fn renders_autonomously(&self) -> bool {
        matches!(self, Mode::Autonomous)
    }

    /// Check if streaming has latched
    pub fn is_streaming(&self) -> bool {
        matches!(self, Mode::Streaming)
    }

    /// Process an event and return the next mode
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use Mode::*;

        match (self, event) {
            // Reload wins from anywhere
            (_, ReloadRequested) => Init,

            (Init, StoreOpened) => Autonomous,

            // Streaming is sticky until reload
            (Autonomous, StreamActivity) => Streaming,
            (Streaming, StreamActivity) => Streaming,

            // Default: stay in current mode
            _ => self,
        }
    }
}
