//! One-slot frame mailbox between the USB receiver and the control loop
//!
//! The USB side assembles a frame in the back buffer and publishes it; the
//! control loop takes the published frame exactly once. Publishing swaps the
//! buffers, so a frame being copied out is never written by the producer.
//! If the control loop falls behind, a newer frame replaces the unconsumed
//! one; frames are never queued.
//!
//! Pixels are stored in the byte order they arrive on the wire:
//! `[blue, green, red]`.

use core::cell::RefCell;

use critical_section::Mutex;
use portable_atomic::{AtomicBool, Ordering};

/// A pixel as stored in the mailbox, `[b, g, r]`
pub type WirePixel = [u8; 3];

struct Slots<const N: usize> {
    buffers: [[WirePixel; N]; 2],
    /// Buffer the producer is writing
    back: usize,
    /// The other buffer holds a published, untaken frame
    ready: bool,
    /// Published frames replaced before they were taken
    overwritten: u32,
}

/// Double-buffered frame mailbox for `N` LEDs
pub struct FrameMailbox<const N: usize> {
    slots: Mutex<RefCell<Slots<N>>>,
    split: AtomicBool,
}

impl<const N: usize> Default for FrameMailbox<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameMailbox<N> {
    /// Create an empty mailbox, usable in a `static`
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new(Slots {
                buffers: [[[0; 3]; N]; 2],
                back: 0,
                ready: false,
                overwritten: 0,
            })),
            split: AtomicBool::new(false),
        }
    }

    /// Hand out the producer and consumer handles
    ///
    /// Succeeds once; later calls return `None` so there is only ever one
    /// producer and one consumer.
    pub fn split(&self) -> Option<(FrameProducer<'_, N>, FrameConsumer<'_, N>)> {
        if self.split.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some((FrameProducer { mailbox: self }, FrameConsumer { mailbox: self }))
    }

    /// Number of published frames that were replaced before being taken
    pub fn overwritten(&self) -> u32 {
        critical_section::with(|cs| self.slots.borrow_ref(cs).overwritten)
    }
}

/// Write side of the mailbox, owned by the USB receiver
pub struct FrameProducer<'a, const N: usize> {
    mailbox: &'a FrameMailbox<N>,
}

impl<const N: usize> FrameProducer<'_, N> {
    /// Write one pixel of the frame under construction
    ///
    /// Out-of-range indices are ignored.
    pub fn set_pixel(&mut self, index: usize, pixel: WirePixel) {
        critical_section::with(|cs| {
            let mut slots = self.mailbox.slots.borrow_ref_mut(cs);
            let back = slots.back;
            if let Some(slot) = slots.buffers[back].get_mut(index) {
                *slot = pixel;
            }
        });
    }

    /// Write a run of pixels starting at `offset`
    ///
    /// Pixels past the end of the frame are dropped. Returns how many were
    /// written.
    pub fn write_pixels(&mut self, offset: usize, pixels: &[WirePixel]) -> usize {
        critical_section::with(|cs| {
            let mut slots = self.mailbox.slots.borrow_ref_mut(cs);
            let back = slots.back;
            let Some(dest) = slots.buffers[back].get_mut(offset..) else {
                return 0;
            };
            let len = dest.len().min(pixels.len());
            dest[..len].copy_from_slice(&pixels[..len]);
            len
        })
    }

    /// Publish the frame under construction
    ///
    /// Returns `true` if an untaken frame was replaced.
    pub fn publish(&mut self) -> bool {
        critical_section::with(|cs| {
            let mut slots = self.mailbox.slots.borrow_ref_mut(cs);
            let replaced = slots.ready;
            if replaced {
                slots.overwritten = slots.overwritten.wrapping_add(1);
            }
            slots.back ^= 1;
            slots.ready = true;
            replaced
        })
    }
}

/// Read side of the mailbox, owned by the controller
pub struct FrameConsumer<'a, const N: usize> {
    mailbox: &'a FrameMailbox<N>,
}

impl<const N: usize> FrameConsumer<'_, N> {
    /// Check for a published frame without taking it
    pub fn has_frame(&self) -> bool {
        critical_section::with(|cs| self.mailbox.slots.borrow_ref(cs).ready)
    }

    /// Take the published frame, if any
    ///
    /// `f` runs at most once per published frame, with the producer locked
    /// out for its duration.
    pub fn take<R>(&mut self, f: impl FnOnce(&[WirePixel]) -> R) -> Option<R> {
        critical_section::with(|cs| {
            let mut slots = self.mailbox.slots.borrow_ref_mut(cs);
            if !slots.ready {
                return None;
            }
            slots.ready = false;
            let front = slots.back ^ 1;
            Some(f(&slots.buffers[front]))
        })
    }
}
