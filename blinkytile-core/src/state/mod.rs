//! Mode state machine
//!
//! Decides whether the LEDs are driven by stored animations or by an
//! external stream. The state machine is explicit, finite, and deterministic.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::Mode;
