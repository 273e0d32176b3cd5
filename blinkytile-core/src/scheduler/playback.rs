//! Animation playback scheduling
//!
//! Advances the frame index of the selected animation against a millisecond
//! deadline. A frame is shown when the clock has passed the deadline; the
//! deadline then moves forward by one frame period. If the loop stalled for
//! longer than a period, the deadline is resynchronized to `now + period`
//! instead of replaying the backlog, so a stall costs at most one skipped
//! interval and never a catch-up burst.

use blinkytile_hal::{AnimationStore, OutputDriver};

/// Playback position and timing
///
/// Owned by the controller. Reset as a whole on every reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlaybackState {
    /// Selected animation index
    pub animation: usize,
    /// Frame to show next
    pub frame: u32,
    /// Clock value the next frame is due after (ms)
    pub next_deadline_ms: u64,
}

impl PlaybackState {
    /// Create a state at animation 0, frame 0, deadline 0
    pub const fn new() -> Self {
        Self {
            animation: 0,
            frame: 0,
            next_deadline_ms: 0,
        }
    }

    /// Return to animation 0, frame 0, deadline 0
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Select the next animation, wrapping at `count`, and restart at frame 0
    ///
    /// With no animations the index stays at 0.
    pub fn select_next(&mut self, count: usize) {
        self.animation = if count == 0 {
            0
        } else {
            (self.animation + 1) % count
        };
        self.frame = 0;
    }
}

/// Result of a tick that put a frame on the LEDs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameShown {
    /// Animation the frame came from
    pub animation: usize,
    /// Frame index that was displayed
    pub frame: u32,
    /// Deadline was resynchronized after a stall
    pub resynced: bool,
}

/// Frame scheduler for stored animations
#[derive(Debug, Default)]
pub struct AnimationScheduler {
    /// Frame reads that failed since boot
    read_errors: u32,
}

impl AnimationScheduler {
    /// Create a new scheduler
    pub const fn new() -> Self {
        Self { read_errors: 0 }
    }

    /// Number of frame reads that failed
    pub fn read_errors(&self) -> u32 {
        self.read_errors
    }

    /// Show the next frame if it is due
    ///
    /// Returns `None` without touching the output when the frame is not yet
    /// due, the store is empty, or the selected animation has no frames.
    pub fn tick<A, O>(
        &mut self,
        state: &mut PlaybackState,
        now_ms: u64,
        store: &mut A,
        output: &mut O,
    ) -> Option<FrameShown>
    where
        A: AnimationStore,
        O: OutputDriver,
    {
        let count = store.count();
        if count == 0 {
            return None;
        }
        // The store may have shrunk since the index was chosen
        if state.animation >= count {
            state.animation = 0;
            state.frame = 0;
        }

        if now_ms <= state.next_deadline_ms {
            return None;
        }

        let info = store.animation(state.animation)?;
        if info.frame_count == 0 {
            return None;
        }
        if state.frame >= info.frame_count {
            state.frame = 0;
        }

        let shown = state.frame;
        if let Err(_e) = store.read_frame(state.animation, shown, output.pixels_mut()) {
            // Keep the cadence; the previous pixels stay on the strip
            self.read_errors = self.read_errors.saturating_add(1);
            #[cfg(feature = "defmt")]
            defmt::warn!("Frame read failed: anim={} frame={} err={}", state.animation, shown, _e);
        }

        state.frame = (shown + 1) % info.frame_count;

        let period = u64::from(info.speed_ms);
        state.next_deadline_ms += period;
        let resynced = now_ms > state.next_deadline_ms;
        if resynced {
            state.next_deadline_ms = now_ms + period;
        }

        output.show();

        Some(FrameShown {
            animation: state.animation,
            frame: shown,
            resynced,
        })
    }
}
