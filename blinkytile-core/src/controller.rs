//! Top-level control loop
//!
//! One [`Controller`] owns every piece of runtime state: the mode, the
//! playback position, the stream intake and the hardware handles. The
//! firmware calls [`Controller::tick`] in a loop until a bootloader request
//! arrives, then hands the controller to [`Controller::enter_bootloader`].
//!
//! Tick order:
//!
//! 1. Refresh the watchdog
//! 2. Poll the buttons
//! 3. Apply the configured brightness
//! 4. Reload the animation store if requested
//! 5. Render autonomously (stored animation or fallback pattern)
//! 6. Service the USB frame mailbox
//! 7. Drain the serial port
//! 8. Handle at most one button press

use portable_atomic::{AtomicBool, Ordering};

use blinkytile_hal::{
    AnimationStore, BootTokenCell, ButtonInput, Clock, OutputDriver, SerialPort, SystemControl,
    Watchdog,
};

use crate::config::ControllerConfig;
use crate::input::{ButtonAction, ButtonHandler};
use crate::intake::{FrameConsumer, IntakeStats, StreamIntake, UsbIntake};
use crate::pattern::FallbackPattern;
use crate::safety::{BootloaderHandoff, WatchdogSupervisor};
use crate::scheduler::{AnimationScheduler, FrameShown, PlaybackState};
use crate::state::{Event, Mode};

/// Request to reopen the animation store
///
/// Set from any context (boot, the flash writer after new animations land)
/// and consumed by the next tick.
#[derive(Debug)]
pub struct ReloadSignal(AtomicBool);

impl ReloadSignal {
    /// A signal with a reload already pending, as at boot
    pub const fn pending() -> Self {
        Self(AtomicBool::new(true))
    }

    pub const fn idle() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the request, returning whether one was pending
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Summary of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Mode after the tick
    pub mode: Mode,
    /// Store was reopened this tick
    pub reloaded: bool,
    /// Stored animation frame shown
    pub frame: Option<FrameShown>,
    /// Fallback pattern shown
    pub fallback: bool,
    /// USB mailbox result
    pub usb: UsbIntake,
    /// Serial bytes consumed
    pub serial_bytes: usize,
    /// Button press handled
    pub button: Option<ButtonAction>,
}

/// Hardware handles owned by the controller
pub struct ControllerIo<O, A, B, S, W> {
    pub output: O,
    pub store: A,
    pub buttons: B,
    pub serial: S,
    pub watchdog: W,
}

/// LED controller state and control loop
pub struct Controller<'a, const N: usize, O, A, B, S, W, P> {
    config: ControllerConfig,
    mode: Mode,
    playback: PlaybackState,
    scheduler: AnimationScheduler,
    intake: StreamIntake<'a, N>,
    handler: ButtonHandler,
    fallback: P,
    reload: &'a ReloadSignal,
    output: O,
    store: A,
    buttons: B,
    serial: S,
    watchdog: WatchdogSupervisor<W>,
}

impl<'a, const N: usize, O, A, B, S, W, P> Controller<'a, N, O, A, B, S, W, P>
where
    O: OutputDriver,
    A: AnimationStore,
    B: ButtonInput,
    S: SerialPort,
    W: Watchdog,
    P: FallbackPattern,
{
    /// Build the controller
    ///
    /// The output starts on the configured default protocol. Nothing is
    /// rendered until the first reload opens the store.
    pub fn new(
        config: ControllerConfig,
        io: ControllerIo<O, A, B, S, W>,
        frames: FrameConsumer<'a, N>,
        reload: &'a ReloadSignal,
        fallback: P,
    ) -> Self {
        let ControllerIo {
            mut output,
            store,
            buttons,
            serial,
            watchdog,
        } = io;
        output.set_protocol(config.default_protocol);

        Self {
            config,
            mode: Mode::Init,
            playback: PlaybackState::new(),
            scheduler: AnimationScheduler::new(),
            intake: StreamIntake::new(frames),
            handler: ButtonHandler::new(),
            fallback,
            reload,
            output,
            store,
            buttons,
            serial,
            watchdog: WatchdogSupervisor::new(watchdog),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn store(&self) -> &A {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut A {
        &mut self.store
    }

    pub fn intake_stats(&self) -> IntakeStats {
        self.intake.stats()
    }

    pub fn frame_read_errors(&self) -> u32 {
        self.scheduler.read_errors()
    }

    pub fn watchdog_refreshes(&self) -> u32 {
        self.watchdog.refreshes()
    }

    /// Run one iteration of the control loop
    pub fn tick(&mut self, now_ms: u64) -> TickReport {
        let mut report = TickReport::default();

        self.watchdog.refresh();
        self.buttons.poll();
        self.output.set_brightness(self.config.brightness());

        if self.reload.take() {
            self.reload_store();
            report.reloaded = true;
        }

        if self.mode.renders_autonomously() {
            if self.store.count() == 0 {
                self.fallback.render(self.output.pixels_mut());
                self.output.show();
                report.fallback = true;
            } else {
                report.frame = self.scheduler.tick(
                    &mut self.playback,
                    now_ms,
                    &mut self.store,
                    &mut self.output,
                );
            }
        }

        report.usb = self.intake.service_usb(&mut self.output);
        if report.usb.saw_frame() {
            self.stream_activity();
        }

        report.serial_bytes =
            self.intake
                .service_serial(&mut self.serial, &mut self.output, &mut self.watchdog);
        if report.serial_bytes > 0 {
            self.stream_activity();
        }

        if self.buttons.is_pressed() {
            if let Some(event) = self.buttons.take_event() {
                report.button = self.handler.handle(
                    event,
                    &mut self.playback,
                    self.store.count(),
                    &mut self.output,
                );
            }
        }

        report.mode = self.mode;
        report
    }

    /// Hand control to the USB bootloader
    ///
    /// Consumes the controller so no further tick can run.
    pub fn enter_bootloader<C, K, Y>(self, cell: &mut C, clock: &K, system: &mut Y) -> !
    where
        C: BootTokenCell,
        K: Clock,
        Y: SystemControl,
    {
        let mut watchdog = self.watchdog;
        BootloaderHandoff::new(self.config.handoff_grace_ms).run(&mut watchdog, cell, clock, system)
    }

    fn reload_store(&mut self) {
        self.mode = self.mode.transition(Event::ReloadRequested);

        // Opening the store walks flash and can outlast the watchdog window
        self.watchdog.refresh();
        let opened = self.store.begin();
        self.watchdog.refresh();

        self.playback.reset();

        match opened {
            Ok(()) => {
                #[cfg(feature = "defmt")]
                defmt::info!("Animation store opened, {} animations", self.store.count());
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Animation store unavailable: {}", _e);
            }
        }

        self.mode = self.mode.transition(Event::StoreOpened);
    }

    fn stream_activity(&mut self) {
        let next = self.mode.transition(Event::StreamActivity);
        if next != self.mode {
            #[cfg(feature = "defmt")]
            defmt::info!("Streaming mode latched");
        }
        self.mode = next;
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::intake::FrameMailbox;
    use crate::pattern::CountUpPattern;
    use crate::testing::{
        MockButtons, MockClock, MockOutput, MockSerial, MockStore, MockSystem, MockWatchdog,
        SystemStep,
    };
    use blinkytile_hal::{AnimationInfo, ButtonEvent, ButtonId, OutputProtocol, Rgb};
    use std::panic::{catch_unwind, AssertUnwindSafe};

    const LEDS: usize = 4;

    type TestController<'a> = Controller<
        'a,
        LEDS,
        MockOutput,
        MockStore,
        MockButtons,
        MockSerial,
        MockWatchdog,
        CountUpPattern,
    >;

    fn table() -> [AnimationInfo; 2] {
        [
            AnimationInfo {
                frame_count: 3,
                speed_ms: 100,
            },
            AnimationInfo {
                frame_count: 2,
                speed_ms: 50,
            },
        ]
    }

    fn controller<'a>(
        mailbox: &'a FrameMailbox<LEDS>,
        reload: &'a ReloadSignal,
        store: MockStore,
    ) -> (TestController<'a>, crate::intake::FrameProducer<'a, LEDS>) {
        let (producer, consumer) = mailbox.split().unwrap();
        let io = ControllerIo {
            output: MockOutput::new(LEDS),
            store,
            buttons: MockButtons::default(),
            serial: MockSerial::default(),
            watchdog: MockWatchdog::default(),
        };
        let controller = Controller::new(
            ControllerConfig::default(),
            io,
            consumer,
            reload,
            CountUpPattern::new(),
        );
        (controller, producer)
    }

    #[test]
    fn test_boot_reload_enters_autonomous() {
        let mailbox = FrameMailbox::new();
        let reload = ReloadSignal::pending();
        let (mut controller, _) = controller(&mailbox, &reload, MockStore::new(&table()));

        let report = controller.tick(1);
        assert!(report.reloaded);
        assert_eq!(report.mode, Mode::Autonomous);
        assert_eq!(report.frame.map(|f| f.frame), Some(0));
        assert!(!reload.is_pending());
        assert_eq!(controller.output().brightness, 255);
    }

    #[test]
    fn test_no_rendering_before_first_reload() {
        let mailbox = FrameMailbox::new();
        let reload = ReloadSignal::idle();
        let (mut controller, _) = controller(&mailbox, &reload, MockStore::new(&table()));

        let report = controller.tick(1);
        assert_eq!(report.mode, Mode::Init);
        assert_eq!(controller.output().shows, 0);
        assert_eq!(controller.watchdog_refreshes(), 1);
    }

    #[test]
    fn test_empty_store_shows_fallback_every_tick() {
        let mailbox = FrameMailbox::new();
        let reload = ReloadSignal::pending();
        let (mut controller, _) = controller(&mailbox, &reload, MockStore::new(&[]));

        for now in 1..=3 {
            let report = controller.tick(now);
            assert!(report.fallback);
            assert_eq!(report.frame, None);
        }
        assert_eq!(controller.output().shows, 3);
        assert!(controller.store().reads.is_empty());
    }

    #[test]
    fn test_store_failure_fails_open_to_fallback() {
        let mailbox = FrameMailbox::new();
        let reload = ReloadSignal::pending();
        let mut store = MockStore::new(&table());
        store.fail_begin = true;
        let (mut controller, _) = controller(&mailbox, &reload, store);

        let report = controller.tick(1);
        assert_eq!(report.mode, Mode::Autonomous);
        assert!(report.fallback);
    }

    #[test]
    fn test_reload_feeds_watchdog_around_begin() {
        let mailbox = FrameMailbox::new();
        let reload = ReloadSignal::pending();
        let (producer, consumer) = mailbox.split().unwrap();
        let watchdog = MockWatchdog::default();
        let mut store = MockStore::new(&table());
        store.feed_counter = Some(watchdog.feeds.clone());
        let feeds = watchdog.feeds.clone();
        let io = ControllerIo {
            output: MockOutput::new(LEDS),
            store,
            buttons: MockButtons::default(),
            serial: MockSerial::default(),
            watchdog,
        };
        let mut controller: TestController<'_> = Controller::new(
            ControllerConfig::default(),
            io,
            consumer,
            &reload,
            CountUpPattern::new(),
        );
        drop(producer);

        controller.tick(1);
        // Tick-start refresh, then one immediately before begin
        assert_eq!(controller.store().feeds_at_begin, [2]);
        assert_eq!(feeds.get(), 3);
    }

    #[test]
    fn test_usb_frame_latches_streaming() {
        let mailbox = FrameMailbox::new();
        let reload = ReloadSignal::pending();
        let (mut controller, mut producer) =
            controller(&mailbox, &reload, MockStore::new(&table()));
        controller.tick(1);

        producer.write_pixels(0, &[[1, 2, 3]; LEDS]);
        producer.publish();
        let report = controller.tick(2);
        assert_eq!(report.usb, UsbIntake::Shown);
        assert_eq!(report.mode, Mode::Streaming);
        assert_eq!(controller.output().pixels[0], Rgb::new(3, 2, 1));

        // Stored animations no longer render
        let shows = controller.output().shows;
        let report = controller.tick(10_000);
        assert_eq!(report.frame, None);
        assert!(!report.fallback);
        assert_eq!(controller.output().shows, shows);
    }

    #[test]
    fn test_dropped_usb_frame_still_latches_streaming() {
        let mailbox = FrameMailbox::new();
        let reload = ReloadSignal::pending();
        let (mut controller, mut producer) =
            controller(&mailbox, &reload, MockStore::new(&table()));
        controller.tick(1);
        controller.output.busy = true;

        producer.publish();
        let report = controller.tick(2);
        assert_eq!(report.usb, UsbIntake::Dropped);
        assert_eq!(report.mode, Mode::Streaming);
        assert_eq!(controller.intake_stats().usb_dropped, 1);
    }

    #[test]
    fn test_serial_byte_latches_streaming() {
        let mailbox = FrameMailbox::new();
        let reload = ReloadSignal::pending();
        let (mut controller, _) = controller(&mailbox, &reload, MockStore::new(&table()));
        controller.tick(1);

        controller.serial.feed(&[0]);
        let report = controller.tick(2);
        assert_eq!(report.serial_bytes, 1);
        assert_eq!(report.mode, Mode::Streaming);

        // Still latched once the port goes quiet
        let shows = controller.output().shows;
        for now in [500, 5_000, 50_000] {
            let report = controller.tick(now);
            assert_eq!(report.serial_bytes, 0);
            assert_eq!(report.mode, Mode::Streaming);
            assert_eq!(report.frame, None);
            assert!(!report.fallback);
        }
        assert_eq!(controller.output().shows, shows);
    }

    #[test]
    fn test_reload_clears_streaming() {
        let mailbox = FrameMailbox::new();
        let reload = ReloadSignal::pending();
        let (mut controller, mut producer) =
            controller(&mailbox, &reload, MockStore::new(&table()));
        controller.tick(1);
        controller.buttons.push(ButtonEvent::press(ButtonId::A));
        controller.tick(2);
        producer.publish();
        controller.tick(3);
        assert_eq!(controller.mode(), Mode::Streaming);
        assert_eq!(controller.playback().animation, 1);

        reload.request();
        let report = controller.tick(400);
        assert!(report.reloaded);
        assert_eq!(report.mode, Mode::Autonomous);
        // Playback restarted from animation 0, frame 0 before rendering
        assert_eq!(
            report.frame,
            Some(FrameShown {
                animation: 0,
                frame: 0,
                resynced: true,
            })
        );
        assert_eq!(controller.playback().frame, 1);
    }

    #[test]
    fn test_reload_picks_up_new_table() {
        let mailbox = FrameMailbox::new();
        let reload = ReloadSignal::pending();
        let (mut controller, _) = controller(&mailbox, &reload, MockStore::new(&[]));
        assert!(controller.tick(1).fallback);

        controller.store_mut().replace(&table());
        reload.request();
        let report = controller.tick(2);
        assert!(!report.fallback);
        assert!(report.frame.is_some());
    }

    #[test]
    fn test_one_button_event_per_tick() {
        let mailbox = FrameMailbox::new();
        let reload = ReloadSignal::pending();
        let (mut controller, _) = controller(&mailbox, &reload, MockStore::new(&table()));

        controller.buttons.push(ButtonEvent::press(ButtonId::B));
        controller.buttons.push(ButtonEvent::press(ButtonId::B));

        let report = controller.tick(1);
        assert_eq!(
            report.button,
            Some(ButtonAction::NextProtocol(OutputProtocol::Lpd8806))
        );
        assert_eq!(controller.buttons.events.len(), 1);
        // Protocol changes do not touch the mode
        assert_eq!(report.mode, Mode::Autonomous);
    }

    #[test]
    fn test_button_a_restarts_next_animation() {
        let mailbox = FrameMailbox::new();
        let reload = ReloadSignal::pending();
        let (mut controller, _) = controller(&mailbox, &reload, MockStore::new(&table()));
        controller.tick(1);
        controller.tick(101);

        controller.buttons.push(ButtonEvent::press(ButtonId::A));
        let report = controller.tick(102);
        assert_eq!(report.button, Some(ButtonAction::NextAnimation(1)));
        assert_eq!(controller.playback().frame, 0);

        let report = controller.tick(201);
        assert_eq!(report.frame.map(|f| (f.animation, f.frame)), Some((1, 0)));
    }

    #[test]
    fn test_button_a_with_empty_store_stays_at_zero() {
        let mailbox = FrameMailbox::new();
        let reload = ReloadSignal::pending();
        let (mut controller, _) = controller(&mailbox, &reload, MockStore::new(&[]));

        controller.buttons.push(ButtonEvent::press(ButtonId::A));
        let report = controller.tick(1);
        assert_eq!(report.button, Some(ButtonAction::NextAnimation(0)));
        assert_eq!(controller.playback().animation, 0);
    }

    #[test]
    fn test_default_protocol_applied_at_construction() {
        let mailbox = FrameMailbox::new();
        let reload = ReloadSignal::idle();
        let (_, consumer) = mailbox.split().unwrap();
        let config = ControllerConfig {
            default_protocol: OutputProtocol::Dmx,
            brightness_step: 0,
            ..Default::default()
        };
        let io = ControllerIo {
            output: MockOutput::new(LEDS),
            store: MockStore::new(&[]),
            buttons: MockButtons::default(),
            serial: MockSerial::default(),
            watchdog: MockWatchdog::default(),
        };
        let mut controller: TestController<'_> =
            Controller::new(config, io, consumer, &reload, CountUpPattern::new());

        assert_eq!(controller.output().protocol, OutputProtocol::Dmx);
        controller.tick(1);
        assert_eq!(controller.output().brightness, 5);
    }

    #[test]
    fn test_enter_bootloader_runs_handoff() {
        let mailbox = FrameMailbox::new();
        let reload = ReloadSignal::pending();
        let (mut controller, _) = controller(&mailbox, &reload, MockStore::new(&table()));
        controller.tick(1);

        let mut cell = MockWatchdog::default();
        let clock = MockClock::new(5_000, 1);
        let mut system = MockSystem::default();

        let result = catch_unwind(AssertUnwindSafe(|| {
            controller.enter_bootloader(&mut cell, &clock, &mut system)
        }));

        assert!(result.is_err());
        assert_eq!(cell.token, Some(crate::safety::BOOT_TOKEN));
        assert!(clock.peek() >= 5_010);
        assert_eq!(system.steps.last(), Some(&SystemStep::Halt));
    }
}
