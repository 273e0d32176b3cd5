//! Animation playback scheduler
//!
//! Steps through stored animation frames at each animation's own rate.

pub mod playback;

pub use playback::{AnimationScheduler, FrameShown, PlaybackState};
