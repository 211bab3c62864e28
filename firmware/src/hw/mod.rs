//! GPIO adapters for the Tribander relay board.
//!
//! | Signal | Pin | Direction |
//! |---|---|---|
//! | band button | PA0 | input, pull-up, low when pressed |
//! | 15m indicator | PB3 | push-pull |
//! | 20m indicator | PB4 | push-pull |
//! | R12 set / reset | PA4 / PA5 | push-pull, high drives the coil |
//! | R34 set / reset | PA6 / PA7 | push-pull, high drives the coil |
//! | calibration | PA8 | push-pull, toggles every tick |

use embassy_stm32::gpio::{Input, Level, Output};
use tribander_core::bands::BandIndicators;
use tribander_core::controller::{ButtonInput, OutputDriver};
use tribander_core::pulse::{RELAY_LINE_COUNT, RelayLine};

/// Band button on a pulled-up input.
pub struct HardwareButton<'d> {
    input: Input<'d>,
}

impl<'d> HardwareButton<'d> {
    pub fn new(input: Input<'d>) -> Self {
        Self { input }
    }
}

impl ButtonInput for HardwareButton<'_> {
    fn is_high(&mut self) -> bool {
        self.input.is_high()
    }
}

/// Indicator, relay driver and calibration outputs.
pub struct HardwareOutputs<'d> {
    meters15: Output<'d>,
    meters20: Output<'d>,
    /// Indexed by [`RelayLine::as_index`].
    relays: [Output<'d>; RELAY_LINE_COUNT],
    calibration: Output<'d>,
}

impl<'d> HardwareOutputs<'d> {
    pub fn new(
        meters15: Output<'d>,
        meters20: Output<'d>,
        relays: [Output<'d>; RELAY_LINE_COUNT],
        calibration: Output<'d>,
    ) -> Self {
        Self {
            meters15,
            meters20,
            relays,
            calibration,
        }
    }

    fn relay_mut(&mut self, line: RelayLine) -> &mut Output<'d> {
        &mut self.relays[line.as_index()]
    }
}

impl OutputDriver for HardwareOutputs<'_> {
    fn set_indicators(&mut self, indicators: BandIndicators) {
        self.meters15.set_level(Level::from(indicators.meters15));
        self.meters20.set_level(Level::from(indicators.meters20));
    }

    fn set_relay(&mut self, line: RelayLine, asserted: bool) {
        self.relay_mut(line).set_level(Level::from(asserted));
    }

    fn set_calibration(&mut self, high: bool) {
        self.calibration.set_level(Level::from(high));
    }
}
