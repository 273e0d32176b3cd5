//! User button handling

pub mod buttons;

pub use buttons::{ButtonAction, ButtonHandler};
