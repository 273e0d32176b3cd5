//! Debounced GPIO buttons
//!
//! Both buttons are active low with internal pull-ups. A press is reported
//! once the pin has read low for [`DEBOUNCE_MS`]; releases are not queued.

use embassy_rp::gpio::{Input, Pull};
use embassy_time::{Duration, Instant};
use heapless::Deque;

use blinkytile_hal::{ButtonEvent, ButtonId, ButtonInput};

/// Time a level must hold before it counts
pub const DEBOUNCE_MS: u64 = 20;

/// Pending presses kept between ticks
const QUEUE_DEPTH: usize = 4;

struct DebouncedPin<'d> {
    input: Input<'d>,
    id: ButtonId,
    /// Debounced state, true when held
    stable: bool,
    /// Last raw reading
    candidate: bool,
    since: Instant,
}

impl<'d> DebouncedPin<'d> {
    fn new(input: Input<'d>, id: ButtonId) -> Self {
        Self {
            input,
            id,
            stable: false,
            candidate: false,
            since: Instant::now(),
        }
    }

    /// Returns a press event when the debounced state goes down
    fn sample(&mut self, now: Instant) -> Option<ButtonEvent> {
        let level = self.input.is_low();
        if level != self.candidate {
            self.candidate = level;
            self.since = now;
            return None;
        }
        if self.candidate == self.stable
            || now.duration_since(self.since) < Duration::from_millis(DEBOUNCE_MS)
        {
            return None;
        }
        self.stable = self.candidate;
        self.stable.then(|| ButtonEvent::press(self.id))
    }
}

/// Button A and button B
pub struct GpioButtons<'d> {
    a: DebouncedPin<'d>,
    b: DebouncedPin<'d>,
    pending: Deque<ButtonEvent, QUEUE_DEPTH>,
}

impl<'d> GpioButtons<'d> {
    pub fn new(a: Input<'d>, b: Input<'d>) -> Self {
        Self {
            a: DebouncedPin::new(a, ButtonId::A),
            b: DebouncedPin::new(b, ButtonId::B),
            pending: Deque::new(),
        }
    }

    /// Pull configuration the inputs must be created with
    pub const PULL: Pull = Pull::Up;
}

impl ButtonInput for GpioButtons<'_> {
    fn poll(&mut self) {
        let now = Instant::now();
        for pin in [&mut self.a, &mut self.b] {
            if let Some(event) = pin.sample(now) {
                #[cfg(feature = "defmt")]
                defmt::debug!("Button {} pressed", event.id);
                // Full queue: the press is lost, as with an unread latch
                let _ = self.pending.push_back(event);
            }
        }
    }

    fn is_pressed(&self) -> bool {
        !self.pending.is_empty()
    }

    fn take_event(&mut self) -> Option<ButtonEvent> {
        self.pending.pop_front()
    }
}
