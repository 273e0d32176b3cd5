//! Events that trigger mode transitions

/// Events that can trigger mode transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// External reload signal asserted (boot, or new animations written)
    ReloadRequested,
    /// Animation store reopened and playback state reset
    StoreOpened,
    /// A finalized USB frame or a serial byte was observed
    StreamActivity,
}

impl Event {
    /// Check if this event comes from an external data source
    pub fn is_stream_event(&self) -> bool {
        matches!(self, Event::StreamActivity)
    }
}
