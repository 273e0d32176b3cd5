//! Host-side mocks of the HAL traits

extern crate std;

use core::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec;
use std::vec::Vec;

use blinkytile_hal::{
    AnimationInfo, AnimationStore, BootTokenCell, ButtonEvent, ButtonInput, Clock,
    OutputDriver, OutputProtocol, Rgb, SerialPort, StoreError, SystemControl, Watchdog,
};

/// Output driver that records every show
pub struct MockOutput {
    pub pixels: Vec<Rgb>,
    pub protocol: OutputProtocol,
    pub brightness: u8,
    pub busy: bool,
    pub shows: usize,
    /// Snapshot of the pixel buffer at each show
    pub shown: Vec<Vec<Rgb>>,
}

impl MockOutput {
    pub fn new(leds: usize) -> Self {
        Self {
            pixels: vec![Rgb::default(); leds],
            protocol: OutputProtocol::Ws2812,
            brightness: 0,
            busy: false,
            shows: 0,
            shown: Vec::new(),
        }
    }

    pub fn last_shown(&self) -> Option<&[Rgb]> {
        self.shown.last().map(|frame| frame.as_slice())
    }
}

impl OutputDriver for MockOutput {
    fn protocol(&self) -> OutputProtocol {
        self.protocol
    }

    fn set_protocol(&mut self, protocol: OutputProtocol) {
        self.protocol = protocol;
    }

    fn set_brightness(&mut self, level: u8) {
        self.brightness = level;
    }

    fn led_count(&self) -> usize {
        self.pixels.len()
    }

    fn pixels_mut(&mut self) -> &mut [Rgb] {
        &mut self.pixels
    }

    fn show(&mut self) {
        self.shows += 1;
        self.shown.push(self.pixels.clone());
    }

    fn is_busy(&self) -> bool {
        self.busy
    }
}

/// Animation store whose frames are a solid color derived from the indices
pub struct MockStore {
    table: Vec<AnimationInfo>,
    opened: bool,
    pub fail_begin: bool,
    pub fail_reads: bool,
    pub begins: usize,
    pub reads: Vec<(usize, u32)>,
    /// Watchdog feed counter to sample on `begin`
    pub feed_counter: Option<Rc<Cell<usize>>>,
    /// Feed count seen by each `begin`
    pub feeds_at_begin: Vec<usize>,
}

impl MockStore {
    pub fn new(table: &[AnimationInfo]) -> Self {
        Self {
            table: table.to_vec(),
            opened: false,
            fail_begin: false,
            fail_reads: false,
            begins: 0,
            reads: Vec::new(),
            feed_counter: None,
            feeds_at_begin: Vec::new(),
        }
    }

    pub fn frame_color(animation: usize, frame: u32) -> Rgb {
        Rgb::new(animation as u8 + 1, frame as u8, 0x40)
    }

    /// Replace the animation table; visible after the next `begin`
    pub fn replace(&mut self, table: &[AnimationInfo]) {
        self.table = table.to_vec();
        self.opened = false;
    }
}

impl AnimationStore for MockStore {
    fn begin(&mut self) -> Result<(), StoreError> {
        self.begins += 1;
        if let Some(counter) = &self.feed_counter {
            self.feeds_at_begin.push(counter.get());
        }
        if self.fail_begin {
            self.opened = false;
            return Err(StoreError::NoTable);
        }
        self.opened = true;
        Ok(())
    }

    fn count(&self) -> usize {
        if self.opened {
            self.table.len()
        } else {
            0
        }
    }

    fn animation(&self, index: usize) -> Option<AnimationInfo> {
        if !self.opened {
            return None;
        }
        self.table.get(index).copied()
    }

    fn read_frame(&mut self, index: usize, frame: u32, dest: &mut [Rgb]) -> Result<(), StoreError> {
        self.reads.push((index, frame));
        if self.fail_reads {
            return Err(StoreError::Flash);
        }
        let info = self.animation(index).ok_or(StoreError::NoSuchAnimation)?;
        if frame >= info.frame_count {
            return Err(StoreError::NoSuchFrame);
        }
        dest.fill(Self::frame_color(index, frame));
        Ok(())
    }
}

/// Buttons fed from a queue of scripted events
#[derive(Default)]
pub struct MockButtons {
    pub events: VecDeque<ButtonEvent>,
    pub polls: usize,
}

impl MockButtons {
    pub fn push(&mut self, event: ButtonEvent) {
        self.events.push_back(event);
    }
}

impl ButtonInput for MockButtons {
    fn poll(&mut self) {
        self.polls += 1;
    }

    fn is_pressed(&self) -> bool {
        self.events.iter().any(|event| event.pressed)
    }

    fn take_event(&mut self) -> Option<ButtonEvent> {
        self.events.pop_front()
    }
}

/// Serial port backed by a byte queue
#[derive(Default)]
pub struct MockSerial {
    pub rx: VecDeque<u8>,
}

impl MockSerial {
    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }
}

impl SerialPort for MockSerial {
    fn bytes_available(&mut self) -> bool {
        !self.rx.is_empty()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }
}

/// Watchdog and boot cell with shared counters
#[derive(Default)]
pub struct MockWatchdog {
    pub feeds: Rc<Cell<usize>>,
    pub token: Option<u32>,
    /// Feed count at the moment the token was written
    pub feeds_at_token: Option<usize>,
}

impl MockWatchdog {
    pub fn feeds(&self) -> usize {
        self.feeds.get()
    }
}

impl Watchdog for MockWatchdog {
    fn feed(&mut self) {
        self.feeds.set(self.feeds.get() + 1);
    }
}

impl BootTokenCell for MockWatchdog {
    fn write_token(&mut self, token: u32) {
        self.token = Some(token);
        self.feeds_at_token = Some(self.feeds.get());
    }

    fn take_token(&mut self) -> Option<u32> {
        self.token.take()
    }
}

/// Clock that advances by `step` on every read
pub struct MockClock {
    now: Cell<u64>,
    step: u64,
}

impl MockClock {
    pub fn new(start: u64, step: u64) -> Self {
        Self {
            now: Cell::new(start),
            step,
        }
    }

    pub fn peek(&self) -> u64 {
        self.now.get()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

/// Steps recorded by [`MockSystem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStep {
    DisableInterrupts,
    DetachUsb,
    Halt,
}

/// System control that records its calls; `halt` panics
#[derive(Default)]
pub struct MockSystem {
    pub steps: Vec<SystemStep>,
}

impl SystemControl for MockSystem {
    fn disable_interrupts(&mut self) {
        self.steps.push(SystemStep::DisableInterrupts);
    }

    fn detach_usb(&mut self) {
        self.steps.push(SystemStep::DetachUsb);
    }

    fn halt(&mut self) -> ! {
        self.steps.push(SystemStep::Halt);
        panic!("halted");
    }
}
