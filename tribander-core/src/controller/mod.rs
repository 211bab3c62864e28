//! Band-switching control loop.
//!
//! [`BandController`] owns every piece of mutable state except the tick
//! counter. The caller reads the counter once per loop iteration and hands the
//! value to [`BandController::poll`]; the controller samples the button and
//! dispatches band changes at most once per distinct tick, and runs the pulse
//! expiry test on every call.

use crate::bands::{Band, BandIndicators};
use crate::config::{ConfigError, ControllerConfig};
use crate::debounce::{ButtonPolarity, Debouncer};
use crate::pulse::{PulseBank, PulseWindow, RelayLine, ReleasedLines};
use crate::telemetry::TelemetryRecorder;
use crate::ticks::Tick;

/// Raw level of the band button line.
pub trait ButtonInput {
    /// Returns `true` when the line reads high.
    fn is_high(&mut self) -> bool;
}

/// Abstraction over the indicator, relay driver and calibration outputs.
pub trait OutputDriver {
    /// Drives the two band indicator lines.
    fn set_indicators(&mut self, indicators: BandIndicators);

    /// Drives one relay coil line.
    fn set_relay(&mut self, line: RelayLine, asserted: bool);

    /// Drives the calibration line, which toggles once per tick.
    fn set_calibration(&mut self, high: bool);
}

/// Output driver that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopOutputs;

impl NoopOutputs {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl OutputDriver for NoopOutputs {
    fn set_indicators(&mut self, _: BandIndicators) {}

    fn set_relay(&mut self, _: RelayLine, _: bool) {}

    fn set_calibration(&mut self, _: bool) {}
}

impl<T: ButtonInput + ?Sized> ButtonInput for &mut T {
    fn is_high(&mut self) -> bool {
        (**self).is_high()
    }
}

impl<T: OutputDriver + ?Sized> OutputDriver for &mut T {
    fn set_indicators(&mut self, indicators: BandIndicators) {
        (**self).set_indicators(indicators);
    }

    fn set_relay(&mut self, line: RelayLine, asserted: bool) {
        (**self).set_relay(line, asserted);
    }

    fn set_calibration(&mut self, high: bool) {
        (**self).set_calibration(high);
    }
}

/// What one call to [`BandController::poll`] did.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PollOutcome {
    /// The tick was new, so the button was sampled.
    pub tick_processed: bool,
    /// The debounce filter confirmed a press on this call.
    pub press_confirmed: bool,
    /// Band dispatched on this call.
    pub dispatched: Option<Band>,
    /// Relay lines released by the expiry pass.
    pub released: ReleasedLines,
}

/// Controller context for the band button, indicators and relay pulses.
pub struct BandController<B, D> {
    config: ControllerConfig,
    window: PulseWindow,
    polarity: ButtonPolarity,
    debouncer: Debouncer,
    band: Band,
    previous_band: Option<Band>,
    indicators: BandIndicators,
    pulses: PulseBank,
    last_observed: Tick,
    calibration: bool,
    button: B,
    outputs: D,
}

impl<B, D> BandController<B, D>
where
    B: ButtonInput,
    D: OutputDriver,
{
    /// Builds a controller in the power-on state (40m selected, nothing
    /// dispatched yet) after validating `config`.
    pub fn new(config: ControllerConfig, button: B, outputs: D) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            window: config.pulse_window(),
            polarity: config.button_polarity,
            debouncer: config.debouncer(),
            band: Band::Meters40,
            previous_band: None,
            indicators: BandIndicators::new(false, false),
            pulses: PulseBank::new(),
            last_observed: Tick::ZERO,
            calibration: false,
            button,
            outputs,
        })
    }

    /// Runs one loop iteration against the tick value `now`.
    pub fn poll<const CAPACITY: usize>(
        &mut self,
        now: Tick,
        telemetry: &mut TelemetryRecorder<CAPACITY>,
    ) -> PollOutcome {
        let mut outcome = PollOutcome::default();

        if now != self.last_observed {
            outcome.tick_processed = true;
            outcome.press_confirmed = self.sample_button(now, telemetry);
            self.calibration = !self.calibration;
            self.outputs.set_calibration(self.calibration);
            self.last_observed = now;
            outcome.dispatched = self.dispatch(now, telemetry);
        }

        outcome.released = self.expire(now, telemetry);
        outcome
    }

    fn sample_button<const CAPACITY: usize>(
        &mut self,
        now: Tick,
        telemetry: &mut TelemetryRecorder<CAPACITY>,
    ) -> bool {
        let pressed = self.polarity.is_pressed(self.button.is_high());
        if !self.debouncer.sample(pressed) {
            return false;
        }
        self.band = self.band.next();
        telemetry.record_button_confirmed(now);
        true
    }

    /// Applies the current band if it differs from the last dispatched one.
    ///
    /// Arms the band's relay pulses and never releases any line; lines left
    /// over from an earlier dispatch keep running on their own timers.
    fn dispatch<const CAPACITY: usize>(
        &mut self,
        now: Tick,
        telemetry: &mut TelemetryRecorder<CAPACITY>,
    ) -> Option<Band> {
        if self.previous_band == Some(self.band) {
            return None;
        }

        let plan = self.band.plan();
        self.indicators = plan.indicators;
        self.outputs.set_indicators(plan.indicators);
        telemetry.record_band_selected(self.band, self.previous_band, now);

        for &line in plan.pulses {
            self.outputs.set_relay(line, true);
            self.pulses.arm(line, now);
            telemetry.record_relay_transition(line, true, now);
        }

        self.previous_band = Some(self.band);
        Some(self.band)
    }

    fn expire<const CAPACITY: usize>(
        &mut self,
        now: Tick,
        telemetry: &mut TelemetryRecorder<CAPACITY>,
    ) -> ReleasedLines {
        let released = self.pulses.expire(&self.window, now);
        for &line in released.iter() {
            self.outputs.set_relay(line, false);
            telemetry.record_relay_transition(line, false, now);
        }
        released
    }

    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Currently selected band.
    #[must_use]
    pub const fn band(&self) -> Band {
        self.band
    }

    /// Last dispatched band, `None` until the first tick is processed.
    #[must_use]
    pub const fn previous_band(&self) -> Option<Band> {
        self.previous_band
    }

    #[must_use]
    pub const fn indicators(&self) -> BandIndicators {
        self.indicators
    }

    #[must_use]
    pub const fn pulses(&self) -> &PulseBank {
        &self.pulses
    }

    #[must_use]
    pub const fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    #[must_use]
    pub const fn last_observed(&self) -> Tick {
        self.last_observed
    }

    /// Level last written to the calibration line.
    #[must_use]
    pub const fn calibration(&self) -> bool {
        self.calibration
    }

    pub fn button_mut(&mut self) -> &mut B {
        &mut self.button
    }

    #[must_use]
    pub const fn outputs(&self) -> &D {
        &self.outputs
    }

    pub fn outputs_mut(&mut self) -> &mut D {
        &mut self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TelemetryEventKind;

    #[derive(Default)]
    struct LevelButton {
        high: bool,
    }

    impl ButtonInput for LevelButton {
        fn is_high(&mut self) -> bool {
            self.high
        }
    }

    #[derive(Default)]
    struct RecordingOutputs {
        indicators: Option<BandIndicators>,
        relays: [bool; 4],
        calibration_writes: usize,
    }

    impl OutputDriver for RecordingOutputs {
        fn set_indicators(&mut self, indicators: BandIndicators) {
            self.indicators = Some(indicators);
        }

        fn set_relay(&mut self, line: RelayLine, asserted: bool) {
            self.relays[line.as_index()] = asserted;
        }

        fn set_calibration(&mut self, _: bool) {
            self.calibration_writes += 1;
        }
    }

    type TestController = BandController<LevelButton, RecordingOutputs>;

    fn controller() -> TestController {
        // Active-low button, released line reads high.
        BandController::new(
            ControllerConfig::default(),
            LevelButton { high: true },
            RecordingOutputs::default(),
        )
        .expect("default config is valid")
    }

    #[test]
    fn rejects_invalid_config() {
        let result = BandController::new(
            ControllerConfig::new().with_pulse_duration(0),
            LevelButton::default(),
            NoopOutputs::new(),
        );
        assert!(matches!(result, Err(ConfigError::ZeroPulseDuration)));
    }

    #[test]
    fn first_tick_dispatches_forty_meters() {
        let mut controller = controller();
        let mut telemetry: TelemetryRecorder<16> = TelemetryRecorder::new();

        let idle = controller.poll(Tick::ZERO, &mut telemetry);
        assert!(!idle.tick_processed);
        assert_eq!(controller.previous_band(), None);

        let outcome = controller.poll(Tick::new(1), &mut telemetry);
        assert_eq!(outcome.dispatched, Some(Band::Meters40));
        assert_eq!(
            controller.outputs().indicators,
            Some(BandIndicators::new(false, false))
        );
        assert!(controller.outputs().relays[RelayLine::R12Reset.as_index()]);
        assert!(controller.outputs().relays[RelayLine::R34Reset.as_index()]);
        assert_eq!(
            telemetry.oldest_first().next().map(|record| record.event),
            Some(TelemetryEventKind::BandSelected(Band::Meters40))
        );
    }

    #[test]
    fn repeated_polls_on_one_tick_sample_once() {
        let mut controller = controller();
        let mut telemetry: TelemetryRecorder<16> = TelemetryRecorder::new();

        for _ in 0..5 {
            controller.poll(Tick::new(7), &mut telemetry);
        }
        assert_eq!(controller.outputs().calibration_writes, 1);
        assert!(controller.calibration());
    }

    #[test]
    fn expiry_releases_lines_through_the_driver() {
        let mut controller = controller();
        let mut telemetry: TelemetryRecorder<16> = TelemetryRecorder::new();

        controller.poll(Tick::new(1), &mut telemetry);
        for raw in 2..4 {
            let outcome = controller.poll(Tick::new(raw), &mut telemetry);
            assert!(outcome.released.is_empty());
        }
        let outcome = controller.poll(Tick::new(4), &mut telemetry);
        assert_eq!(
            outcome.released.as_slice(),
            &[RelayLine::R12Reset, RelayLine::R34Reset]
        );
        assert_eq!(controller.outputs().relays, [false; 4]);
        assert_eq!(controller.pulses().asserted_lines().count(), 0);
    }

    #[test]
    fn confirmed_press_advances_and_dispatches() {
        let mut controller = controller();
        let mut telemetry: TelemetryRecorder<64> = TelemetryRecorder::new();
        let mut now = Tick::ZERO;

        // Released sample on the first processed tick.
        now = now.wrapping_add(1);
        controller.poll(now, &mut telemetry);

        controller.button_mut().high = false;
        let mut dispatched = None;
        for _ in 0..12 {
            now = now.wrapping_add(1);
            let outcome = controller.poll(now, &mut telemetry);
            dispatched = dispatched.or(outcome.dispatched);
        }

        assert_eq!(dispatched, Some(Band::Meters20));
        assert_eq!(controller.band(), Band::Meters20);
        assert_eq!(controller.previous_band(), Some(Band::Meters20));
        assert_eq!(controller.indicators(), BandIndicators::new(false, true));
    }
}
