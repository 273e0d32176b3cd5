//! Watchdog supervisor

use blinkytile_hal::Watchdog;

/// Owns the hardware watchdog and counts refreshes
///
/// Every blocking path in the controller (store reload, serial drain,
/// handoff grace window) refreshes through this type.
#[derive(Debug)]
pub struct WatchdogSupervisor<W> {
    watchdog: W,
    refreshes: u32,
}

impl<W: Watchdog> WatchdogSupervisor<W> {
    pub fn new(watchdog: W) -> Self {
        Self {
            watchdog,
            refreshes: 0,
        }
    }

    /// Feed the hardware watchdog
    pub fn refresh(&mut self) {
        self.watchdog.feed();
        self.refreshes = self.refreshes.wrapping_add(1);
    }

    /// Refreshes since boot, wrapping
    pub fn refreshes(&self) -> u32 {
        self.refreshes
    }

    pub fn inner(&self) -> &W {
        &self.watchdog
    }

    pub fn into_inner(self) -> W {
        self.watchdog
    }
}

impl<W: Watchdog> Watchdog for WatchdogSupervisor<W> {
    fn feed(&mut self) {
        self.refresh();
    }
}
