//! Button event handler
//!
//! Button A selects the next stored animation. Button B cycles the output
//! protocol. Both act the same in every mode; the mode itself never changes.

use blinkytile_hal::{ButtonEvent, ButtonId, OutputDriver, OutputProtocol};

use crate::scheduler::PlaybackState;

/// Effect of a handled button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonAction {
    /// Playback moved to this animation, frame 0
    NextAnimation(usize),
    /// Output switched to this protocol
    NextProtocol(OutputProtocol),
}

/// Maps button presses onto playback and output changes
#[derive(Debug, Default, Clone, Copy)]
pub struct ButtonHandler {
    presses: u32,
}

impl ButtonHandler {
    pub const fn new() -> Self {
        Self { presses: 0 }
    }

    /// Presses acted on since boot
    pub fn presses(&self) -> u32 {
        self.presses
    }

    /// Apply one button event
    ///
    /// Releases are ignored.
    pub fn handle<O: OutputDriver>(
        &mut self,
        event: ButtonEvent,
        playback: &mut PlaybackState,
        animation_count: usize,
        output: &mut O,
    ) -> Option<ButtonAction> {
        if !event.pressed {
            return None;
        }
        self.presses = self.presses.wrapping_add(1);

        let action = match event.id {
            ButtonId::A => {
                playback.select_next(animation_count);
                ButtonAction::NextAnimation(playback.animation)
            }
            ButtonId::B => {
                let protocol = output.protocol().next();
                output.set_protocol(protocol);
                ButtonAction::NextProtocol(protocol)
            }
        };

        #[cfg(feature = "defmt")]
        defmt::debug!("Button {}: {}", event.id, action);

        Some(action)
    }
}
