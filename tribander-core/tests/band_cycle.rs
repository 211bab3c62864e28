use proptest::prelude::*;

use tribander_core::bands::{Band, BandIndicators};
use tribander_core::debounce::{ButtonPolarity, MAX_DEBOUNCE_SAMPLES};
use tribander_core::config::{ConfigError, ControllerConfig};
use tribander_core::controller::{BandController, ButtonInput, OutputDriver, PollOutcome};
use tribander_core::pulse::{PulseBank, PulseWindow, RelayLine};
use tribander_core::telemetry::{TelemetryEventKind, TelemetryRecorder};
use tribander_core::ticks::Tick;

/// Push button wired with the configured polarity.
#[derive(Default)]
struct SimButton {
    pressed: bool,
    polarity: ButtonPolarity,
}

impl ButtonInput for SimButton {
    fn is_high(&mut self) -> bool {
        match self.polarity {
            ButtonPolarity::ActiveLow => !self.pressed,
            ButtonPolarity::ActiveHigh => self.pressed,
        }
    }
}

#[derive(Default)]
struct BoardOutputs {
    indicators: BandIndicators,
    indicator_writes: usize,
    relays: [bool; 4],
    pair_overlap: bool,
}

impl OutputDriver for BoardOutputs {
    fn set_indicators(&mut self, indicators: BandIndicators) {
        self.indicators = indicators;
        self.indicator_writes += 1;
    }

    fn set_relay(&mut self, line: RelayLine, asserted: bool) {
        self.relays[line.as_index()] = asserted;
        if asserted && self.relays[line.complement().as_index()] {
            self.pair_overlap = true;
        }
    }

    fn set_calibration(&mut self, _: bool) {}
}

impl BoardOutputs {
    fn is_high(&self, line: RelayLine) -> bool {
        self.relays[line.as_index()]
    }
}

struct Bench {
    controller: BandController<SimButton, BoardOutputs>,
    telemetry: TelemetryRecorder<128>,
    now: Tick,
}

impl Bench {
    fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    fn with_config(config: ControllerConfig) -> Self {
        let button = SimButton {
            pressed: false,
            polarity: config.button_polarity,
        };
        let controller =
            BandController::new(config, button, BoardOutputs::default()).expect("valid config");
        Self {
            controller,
            telemetry: TelemetryRecorder::new(),
            now: Tick::ZERO,
        }
    }

    /// Advances one tick with the button held at `pressed`.
    fn step(&mut self, pressed: bool) -> PollOutcome {
        self.controller.button_mut().pressed = pressed;
        self.now = self.now.wrapping_add(1);
        self.controller.poll(self.now, &mut self.telemetry)
    }

    fn hold(&mut self, pressed: bool, ticks: usize) -> Vec<PollOutcome> {
        (0..ticks).map(|_| self.step(pressed)).collect()
    }

    /// Releases for one tick, then presses until the band is dispatched.
    /// Returns the tick of the dispatch.
    fn press(&mut self) -> Tick {
        self.step(false);
        for _ in 0..self.controller.config().debounce_samples {
            if self.step(true).dispatched.is_some() {
                return self.now;
            }
        }
        panic!("press was not confirmed");
    }

    fn outputs(&self) -> &BoardOutputs {
        self.controller.outputs()
    }
}

#[test]
fn power_on_dispatches_forty_meters_on_first_tick() {
    let mut bench = Bench::new();
    let outcome = bench.step(false);

    assert_eq!(outcome.dispatched, Some(Band::Meters40));
    assert_eq!(bench.controller.previous_band(), Some(Band::Meters40));
    assert_eq!(bench.outputs().indicators, BandIndicators::new(false, false));
    assert!(bench.outputs().is_high(RelayLine::R12Reset));
    assert!(bench.outputs().is_high(RelayLine::R34Reset));
    assert!(!bench.outputs().is_high(RelayLine::R12Set));
    assert!(!bench.outputs().is_high(RelayLine::R34Set));
}

#[test]
fn forty_to_twenty_pulses_r12_reset_and_r34_set() {
    let mut bench = Bench::new();
    bench.hold(false, 10);

    let start = bench.press();
    assert_eq!(bench.controller.band(), Band::Meters20);
    assert_eq!(bench.outputs().indicators, BandIndicators::new(false, true));
    assert!(bench.outputs().is_high(RelayLine::R12Reset));
    assert!(bench.outputs().is_high(RelayLine::R34Set));
    assert!(!bench.outputs().is_high(RelayLine::R34Reset));

    // Keep holding: both lines stay up for the pulse width, then drop together.
    bench.hold(true, 2);
    assert!(bench.outputs().is_high(RelayLine::R12Reset));
    assert!(bench.outputs().is_high(RelayLine::R34Set));

    let released = bench.step(true).released;
    assert_eq!(bench.now, start.wrapping_add(3));
    assert_eq!(released.as_slice(), &[RelayLine::R12Reset, RelayLine::R34Set]);
    assert_eq!(bench.outputs().relays, [false; 4]);
}

#[test]
fn fifteen_meters_leaves_pair_three_four_alone() {
    let mut bench = Bench::new();
    bench.hold(false, 10);
    bench.press();
    bench.hold(false, 10);

    let start = bench.press();
    assert_eq!(bench.controller.band(), Band::Meters15);
    assert_eq!(bench.outputs().indicators, BandIndicators::new(true, false));
    assert!(bench.outputs().is_high(RelayLine::R12Set));
    assert!(!bench.outputs().is_high(RelayLine::R34Set));
    assert!(!bench.outputs().is_high(RelayLine::R34Reset));
    assert_eq!(
        bench.controller.pulses().get(RelayLine::R12Set).asserted_at,
        start
    );
}

#[test]
fn three_presses_wrap_back_to_forty_meters() {
    let mut bench = Bench::new();
    bench.hold(false, 5);

    let mut seen = Vec::new();
    for _ in 0..3 {
        bench.press();
        seen.push(bench.controller.band());
        bench.hold(false, 20);
    }

    assert_eq!(seen, [Band::Meters20, Band::Meters15, Band::Meters40]);
    assert_eq!(bench.outputs().indicators, BandIndicators::new(false, false));
}

#[test]
fn fifteen_to_forty_does_not_touch_the_running_set_pulse() {
    // Same sequence as the controller, driven directly on the pulse bank so
    // that the set pulse is still running when the 40m dispatch lands.
    let window = PulseWindow::new(3, 255);
    let mut bank = PulseBank::new();

    bank.arm(RelayLine::R12Set, Tick::new(100));
    for line in Band::Meters40.plan().pulses {
        bank.arm(*line, Tick::new(101));
    }
    assert!(bank.is_asserted(RelayLine::R12Set));
    assert_eq!(
        bank.get(RelayLine::R12Set).asserted_at,
        Tick::new(100),
        "dispatch must not restart other timers"
    );

    assert_eq!(
        bank.expire(&window, Tick::new(103)).as_slice(),
        &[RelayLine::R12Set]
    );
    assert_eq!(
        bank.expire(&window, Tick::new(104)).as_slice(),
        &[RelayLine::R12Reset, RelayLine::R34Reset]
    );
}

#[test]
fn dispatch_is_idempotent_without_a_press() {
    let mut bench = Bench::new();
    bench.step(false);
    let writes = bench.outputs().indicator_writes;
    let events = bench.telemetry.next_event_id();

    let outcomes = bench.hold(false, 300);

    assert!(outcomes.iter().all(|outcome| outcome.dispatched.is_none()));
    assert_eq!(bench.outputs().indicator_writes, writes);
    // Only the two releases of the power-on pulses were recorded.
    assert_eq!(bench.telemetry.next_event_id(), events + 2);
    assert_eq!(bench.controller.previous_band(), Some(Band::Meters40));
}

#[test]
fn telemetry_tells_the_band_change_story() {
    let mut bench = Bench::new();
    bench.hold(false, 10);
    let first = bench.telemetry.next_event_id();
    bench.press();
    bench.hold(true, 3);

    let events: Vec<_> = bench
        .telemetry
        .since(first)
        .map(|record| record.event)
        .collect();
    assert_eq!(
        events,
        [
            TelemetryEventKind::ButtonConfirmed,
            TelemetryEventKind::BandSelected(Band::Meters20),
            TelemetryEventKind::RelayAsserted(RelayLine::R12Reset),
            TelemetryEventKind::RelayAsserted(RelayLine::R34Set),
            TelemetryEventKind::RelayReleased(RelayLine::R12Reset),
            TelemetryEventKind::RelayReleased(RelayLine::R34Set),
        ]
    );
}

#[test]
fn band_changes_keep_working_across_counter_rollover() {
    let mut bench = Bench::new();
    bench.hold(false, 240);

    // The press lands with the dispatch inside the rollover region.
    let start = bench.press();
    assert!(start.as_u8() >= 252 || start.as_u8() < 5, "dispatch at {start}");
    assert_eq!(bench.controller.band(), Band::Meters20);

    bench.hold(true, 4);
    assert_eq!(bench.outputs().relays, [false; 4]);
}

#[test]
fn controller_refuses_a_reset_below_the_counter_modulus() {
    let config = ControllerConfig {
        wrap_reset: 200,
        ..ControllerConfig::new()
    };
    let result = BandController::new(config, SimButton::default(), BoardOutputs::default());
    assert!(matches!(
        result,
        Err(ConfigError::WrapResetMismatch { reset: 200 })
    ));
}

#[test]
fn fastest_press_cycle_across_many_rollovers_keeps_pulses_short() {
    let mut bench = Bench::new();
    let config = *bench.controller.config();
    let width_limit = config.pulse_duration + 1;
    let cycle = usize::from(config.debounce_samples) + 1;
    let mut widths = [0u8; 4];
    let mut dispatches = 0usize;

    // One released sample then a full debounce run, for about eight wraps.
    for step in 0..cycle * 160 {
        if bench.step(step % cycle != 0).dispatched.is_some() {
            dispatches += 1;
        }
        for line in RelayLine::ALL {
            let width = &mut widths[line.as_index()];
            *width = if bench.outputs().is_high(line) { *width + 1 } else { 0 };
            assert!(*width <= width_limit, "{line} held past {width_limit} ticks at {}", bench.now);
        }
    }
    assert!(dispatches > 150);
    assert!(!bench.outputs().pair_overlap);
}

fn valid_config() -> impl Strategy<Value = ControllerConfig> {
    (
        1..=MAX_DEBOUNCE_SAMPLES,
        any::<bool>(),
        any::<u8>(),
        any::<u8>(),
    )
        .prop_map(|(samples, active_high, pulse, reset)| {
            let polarity = if active_high {
                ButtonPolarity::ActiveHigh
            } else {
                ButtonPolarity::ActiveLow
            };
            // Samples of 1 leaves no room for a pulse; the config is then
            // rejected and filtered out below.
            let pulse = if samples > 1 { 1 + pulse % (samples - 1) } else { 1 };
            ControllerConfig {
                wrap_reset: if reset < 32 { reset } else { u8::MAX },
                ..ControllerConfig::new()
                    .with_debounce_samples(samples)
                    .with_pulse_duration(pulse)
                    .with_button_polarity(polarity)
            }
        })
        .prop_filter("rejected by validate", |config| config.validate().is_ok())
}

proptest! {
    #[test]
    fn arbitrary_button_activity_never_overlaps_a_pair(
        config in valid_config(),
        samples in prop::collection::vec(any::<bool>(), 0..1024)
    ) {
        let mut bench = Bench::with_config(config);
        let width_limit = config.pulse_duration + 1;
        let mut widths = [0u8; 4];
        for pressed in samples {
            bench.step(pressed);
            let band = bench.controller.band();
            prop_assert!(band.as_index() < 3);
            for line in [RelayLine::R12Set, RelayLine::R34Set] {
                prop_assert!(
                    !(bench.outputs().is_high(line) && bench.outputs().is_high(line.complement())),
                    "{} and its complement high at {}", line, bench.now
                );
            }
            for line in RelayLine::ALL {
                let width = &mut widths[line.as_index()];
                *width = if bench.outputs().is_high(line) { *width + 1 } else { 0 };
                prop_assert!(*width <= width_limit, "{} held past {} ticks", line, width_limit);
            }
        }
        prop_assert!(!bench.outputs().pair_overlap);
    }

    #[test]
    fn tight_press_cycles_never_overlap_a_pair(
        config in valid_config(),
        idle in 1usize..4,
        cycles in 20usize..80
    ) {
        let mut bench = Bench::with_config(config);
        for _ in 0..cycles {
            bench.hold(false, idle);
            bench.press();
        }
        prop_assert!(!bench.outputs().pair_overlap);
    }
}
