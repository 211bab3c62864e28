//! Button debounce state machine.
//!
//! One sample is taken per tick. A press is confirmed after a run of
//! consecutive pressed samples that began with a released sample; a single
//! released sample anywhere in the run restarts it. Once a press has been
//! reported the filter waits for the button to be released, so holding the
//! button never produces a second press.
//!
//! The tests check it sample for sample against a 16-bit shift-register
//! filter (`state = state << 1 | !pressed | 0xE000`, trigger on `0xF000`)
//! that shifts in the logical `!pressed` level. A register that shifts
//! in `!line` on an active-low button inverts this: it shifts in the raw
//! pressed level and fires after 12 released samples that follow a press.
//! This filter fires on the settled press instead.

/// Default number of consecutive pressed samples for a confirmed press.
pub const DEFAULT_DEBOUNCE_SAMPLES: u8 = 12;

/// Largest supported run length (the free bits of a 16-bit register).
pub const MAX_DEBOUNCE_SAMPLES: u8 = 15;

/// Electrical level of the button line that means "pressed".
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ButtonPolarity {
    #[default]
    ActiveLow,
    ActiveHigh,
}

impl ButtonPolarity {
    /// Converts a raw line level into the logical pressed state.
    #[must_use]
    pub const fn is_pressed(self, line_high: bool) -> bool {
        match self {
            ButtonPolarity::ActiveLow => !line_high,
            ButtonPolarity::ActiveHigh => line_high,
        }
    }
}

/// Debounce filter state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DebounceState {
    /// Last sample was released; the next pressed sample starts a run.
    Idle,
    /// `run` consecutive pressed samples seen since the last released one.
    Counting { run: u8 },
    /// Press already reported (or held since power-on); waiting for release.
    Confirmed,
}

/// Tick-rate button debouncer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Debouncer {
    state: DebounceState,
    required: u8,
}

impl Debouncer {
    /// Creates a filter that confirms a press after `required` samples.
    ///
    /// The filter starts in [`DebounceState::Confirmed`] so a button that is
    /// already held at power-on does not advance the band.
    #[must_use]
    pub const fn new(required: u8) -> Self {
        Self {
            state: DebounceState::Confirmed,
            required,
        }
    }

    #[must_use]
    pub const fn state(&self) -> DebounceState {
        self.state
    }

    #[must_use]
    pub const fn required_samples(&self) -> u8 {
        self.required
    }

    /// Feeds one sample; returns `true` exactly once per confirmed press.
    pub fn sample(&mut self, pressed: bool) -> bool {
        if !pressed {
            self.state = DebounceState::Idle;
            return false;
        }

        match self.state {
            DebounceState::Idle => self.count(1),
            DebounceState::Counting { run } => self.count(run.saturating_add(1)),
            DebounceState::Confirmed => false,
        }
    }

    fn count(&mut self, run: u8) -> bool {
        if run >= self.required {
            self.state = DebounceState::Confirmed;
            true
        } else {
            self.state = DebounceState::Counting { run };
            false
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_SAMPLES)
    }
}
