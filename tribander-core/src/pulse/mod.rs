//! Relay driver lines and the pulse expiry engine.
//!
//! Latching relays only need a short coil pulse to change position. The
//! dispatcher arms a pulse by driving a line high and stamping the tick; this
//! module decides, every loop iteration, whether enough ticks have elapsed to
//! release it again. The tick counter is only eight bits wide, so the elapsed
//! test has a dedicated branch for pulses that straddle the counter rollover.

use core::fmt;

use heapless::Vec;

use crate::ticks::Tick;

/// Number of relay driver outputs.
pub const RELAY_LINE_COUNT: usize = 4;

/// Identifier for the four momentary relay driver outputs.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RelayLine {
    R12Set,
    R12Reset,
    R34Set,
    R34Reset,
}

/// The two latching relay pairs on the Tribander board.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RelayPair {
    Relays12,
    Relays34,
}

/// Which coil of a latching pair a line drives.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Coil {
    Set,
    Reset,
}

impl RelayLine {
    pub const ALL: [RelayLine; RELAY_LINE_COUNT] = [
        RelayLine::R12Set,
        RelayLine::R12Reset,
        RelayLine::R34Set,
        RelayLine::R34Reset,
    ];

    /// Deterministic index for lookups into [`RelayLine::ALL`].
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            RelayLine::R12Set => 0,
            RelayLine::R12Reset => 1,
            RelayLine::R34Set => 2,
            RelayLine::R34Reset => 3,
        }
    }

    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(RelayLine::R12Set),
            1 => Some(RelayLine::R12Reset),
            2 => Some(RelayLine::R34Set),
            3 => Some(RelayLine::R34Reset),
            _ => None,
        }
    }

    #[must_use]
    pub const fn pair(self) -> RelayPair {
        match self {
            RelayLine::R12Set | RelayLine::R12Reset => RelayPair::Relays12,
            RelayLine::R34Set | RelayLine::R34Reset => RelayPair::Relays34,
        }
    }

    #[must_use]
    pub const fn coil(self) -> Coil {
        match self {
            RelayLine::R12Set | RelayLine::R34Set => Coil::Set,
            RelayLine::R12Reset | RelayLine::R34Reset => Coil::Reset,
        }
    }

    /// The other coil of the same pair.
    #[must_use]
    pub const fn complement(self) -> Self {
        match self {
            RelayLine::R12Set => RelayLine::R12Reset,
            RelayLine::R12Reset => RelayLine::R12Set,
            RelayLine::R34Set => RelayLine::R34Reset,
            RelayLine::R34Reset => RelayLine::R34Set,
        }
    }

    /// Short label used by logs and the emulator.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            RelayLine::R12Set => "R12s",
            RelayLine::R12Reset => "R12r",
            RelayLine::R34Set => "R34s",
            RelayLine::R34Reset => "R34r",
        }
    }
}

impl fmt::Display for RelayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pulse width plus the counter modulus the elapsed test works against.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PulseWindow {
    /// Pulse width in ticks.
    pub duration: u8,
    /// Counter modulus minus one (255 for an eight bit counter).
    pub reset: u8,
}

impl PulseWindow {
    #[must_use]
    pub const fn new(duration: u8, reset: u8) -> Self {
        Self { duration, reset }
    }

    /// First counter value from which a pulse cannot complete before the
    /// counter rolls over.
    #[must_use]
    pub const fn wrap_threshold(&self) -> u8 {
        self.reset.wrapping_sub(self.duration)
    }

    /// Returns `true` once a pulse asserted at `start` has lasted at least
    /// `duration` ticks as observed at `now`.
    ///
    /// Pulses that start inside the rollover region stay pending until the
    /// counter has wrapped, and the wrapped elapsed count is taken against
    /// `reset` rather than the full modulus. Such pulses therefore last one
    /// tick longer than the others; they are never shorter than `duration`.
    #[must_use]
    pub const fn expired(&self, start: Tick, now: Tick) -> bool {
        let start = start.as_u8();
        let now = now.as_u8();
        let threshold = self.wrap_threshold();

        if start >= threshold {
            if now >= threshold {
                // Counter has not rolled over since the pulse started.
                return false;
            }
            let elapsed = now.wrapping_sub(start).wrapping_add(self.reset);
            return elapsed >= self.duration;
        }

        now.wrapping_sub(start) >= self.duration
    }
}

/// Drive state of one relay line.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RelayPulse {
    pub asserted: bool,
    pub asserted_at: Tick,
}

impl RelayPulse {
    pub const IDLE: Self = Self {
        asserted: false,
        asserted_at: Tick::ZERO,
    };
}

/// Lines released by one expiry pass.
pub type ReleasedLines = Vec<RelayLine, RELAY_LINE_COUNT>;

/// Independent pulse timers for the four relay driver lines.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PulseBank {
    pulses: [RelayPulse; RELAY_LINE_COUNT],
}

impl PulseBank {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pulses: [RelayPulse::IDLE; RELAY_LINE_COUNT],
        }
    }

    /// Marks `line` as asserted from `now`. Re-arming restarts the timer.
    pub fn arm(&mut self, line: RelayLine, now: Tick) {
        self.pulses[line.as_index()] = RelayPulse {
            asserted: true,
            asserted_at: now,
        };
    }

    #[must_use]
    pub fn get(&self, line: RelayLine) -> RelayPulse {
        self.pulses[line.as_index()]
    }

    #[must_use]
    pub fn is_asserted(&self, line: RelayLine) -> bool {
        self.get(line).asserted
    }

    /// Lines currently driven high.
    pub fn asserted_lines(&self) -> impl Iterator<Item = RelayLine> + '_ {
        RelayLine::ALL
            .into_iter()
            .filter(|line| self.is_asserted(*line))
    }

    /// Evaluates every line against `now` and releases the expired ones.
    ///
    /// Each line is tested on its own timer; an idle line stays idle.
    pub fn expire(&mut self, window: &PulseWindow, now: Tick) -> ReleasedLines {
        let mut released = ReleasedLines::new();
        for line in RelayLine::ALL {
            let pulse = &mut self.pulses[line.as_index()];
            let keep = !window.expired(pulse.asserted_at, now);
            let was_asserted = pulse.asserted;
            pulse.asserted &= keep;
            if was_asserted && !pulse.asserted {
                // Capacity equals the number of lines.
                let _ = released.push(line);
            }
        }
        released
    }
}

impl Default for PulseBank {
    fn default() -> Self {
        Self::new()
    }
}
