//! Controller timing configuration.
//!
//! The only tunables are the tick period and the relay pulse width; the
//! debounce run length, counter modulus and button polarity are exposed so
//! alternate boards can be described without touching the control loop.

use core::{fmt, time::Duration};

use crate::debounce::{
    ButtonPolarity, DEFAULT_DEBOUNCE_SAMPLES, Debouncer, MAX_DEBOUNCE_SAMPLES,
};
use crate::pulse::PulseWindow;

/// Period of one tick as delivered by the timer overflow.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(1);
/// Relay coil pulse width in ticks.
pub const DEFAULT_PULSE_TICKS: u8 = 3;
/// Modulus minus one of the eight bit tick counter.
pub const DEFAULT_WRAP_RESET: u8 = u8::MAX;

/// Reasons a [`ControllerConfig`] is rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    ZeroTickPeriod,
    ZeroPulseDuration,
    /// The expiry test must reset where the eight bit tick counter wraps.
    WrapResetMismatch { reset: u8 },
    /// The pulse would never fit inside one counter period.
    PulseOutsideWrapWindow { pulse: u8, reset: u8 },
    DebounceWindowOutOfRange { samples: u8 },
    /// A pulse could still be running when the next band change arrives,
    /// driving both coils of a relay pair at once.
    PulseOutlastsDebounce { pulse: u8, samples: u8 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroTickPeriod => f.write_str("tick period must be non-zero"),
            ConfigError::ZeroPulseDuration => f.write_str("pulse duration must be at least 1 tick"),
            ConfigError::WrapResetMismatch { reset } => write!(
                f,
                "counter reset {reset} does not match the tick counter ({DEFAULT_WRAP_RESET})"
            ),
            ConfigError::PulseOutsideWrapWindow { pulse, reset } => write!(
                f,
                "pulse of {pulse} ticks does not fit a counter reset of {reset}"
            ),
            ConfigError::DebounceWindowOutOfRange { samples } => write!(
                f,
                "debounce window of {samples} samples outside 1..={MAX_DEBOUNCE_SAMPLES}"
            ),
            ConfigError::PulseOutlastsDebounce { pulse, samples } => write!(
                f,
                "pulse of {pulse} ticks may overlap the next press ({samples} sample debounce)"
            ),
        }
    }
}

/// Timing parameters for [`crate::controller::BandController`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ControllerConfig {
    pub tick_period: Duration,
    pub pulse_duration: u8,
    pub wrap_reset: u8,
    pub debounce_samples: u8,
    pub button_polarity: ButtonPolarity,
}

impl ControllerConfig {
    /// Defaults matching the Tribander relay board.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tick_period: DEFAULT_TICK_PERIOD,
            pulse_duration: DEFAULT_PULSE_TICKS,
            wrap_reset: DEFAULT_WRAP_RESET,
            debounce_samples: DEFAULT_DEBOUNCE_SAMPLES,
            button_polarity: ButtonPolarity::ActiveLow,
        }
    }

    #[must_use]
    pub const fn with_tick_period(mut self, tick_period: Duration) -> Self {
        self.tick_period = tick_period;
        self
    }

    #[must_use]
    pub const fn with_pulse_duration(mut self, ticks: u8) -> Self {
        self.pulse_duration = ticks;
        self
    }

    #[must_use]
    pub const fn with_debounce_samples(mut self, samples: u8) -> Self {
        self.debounce_samples = samples;
        self
    }

    #[must_use]
    pub const fn with_button_polarity(mut self, polarity: ButtonPolarity) -> Self {
        self.button_polarity = polarity;
        self
    }

    /// Checks the parameters against the invariants the control loop relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period.is_zero() {
            return Err(ConfigError::ZeroTickPeriod);
        }
        if self.pulse_duration == 0 {
            return Err(ConfigError::ZeroPulseDuration);
        }
        // Pulses started near a smaller reset would stay pending until the
        // real counter rolls over.
        if self.wrap_reset != DEFAULT_WRAP_RESET {
            return Err(ConfigError::WrapResetMismatch {
                reset: self.wrap_reset,
            });
        }
        if self.pulse_duration >= self.wrap_reset {
            return Err(ConfigError::PulseOutsideWrapWindow {
                pulse: self.pulse_duration,
                reset: self.wrap_reset,
            });
        }
        if self.debounce_samples == 0 || self.debounce_samples > MAX_DEBOUNCE_SAMPLES {
            return Err(ConfigError::DebounceWindowOutOfRange {
                samples: self.debounce_samples,
            });
        }
        // A pulse lasts at most `pulse + 1` ticks (rollover region) and the
        // next band change is at least `samples + 1` ticks after this one.
        if self.pulse_duration >= self.debounce_samples {
            return Err(ConfigError::PulseOutlastsDebounce {
                pulse: self.pulse_duration,
                samples: self.debounce_samples,
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn pulse_window(&self) -> PulseWindow {
        PulseWindow::new(self.pulse_duration, self.wrap_reset)
    }

    #[must_use]
    pub const fn debouncer(&self) -> Debouncer {
        Debouncer::new(self.debounce_samples)
    }

    /// Wall-clock span of `ticks` tick periods.
    #[must_use]
    pub fn ticks_to_duration(&self, ticks: u8) -> Duration {
        self.tick_period * u32::from(ticks)
    }

    /// Number of whole ticks covering `duration`, rounded up and saturated
    /// at `u8::MAX`.
    #[must_use]
    pub fn duration_to_ticks(&self, duration: Duration) -> u8 {
        let period = self.tick_period.as_nanos();
        if period == 0 {
            return u8::MAX;
        }
        let ticks = duration.as_nanos().div_ceil(period);
        u8::try_from(ticks).unwrap_or(u8::MAX)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new()
    }
}
