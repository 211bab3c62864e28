//! Tick counter shared between the timer interrupt and the control loop.
//!
//! The timer overflow handler is the only writer; the control loop reads the
//! counter with a single atomic load per iteration. The counter is eight bits
//! wide and wraps silently, so every consumer compares ticks with wrapping
//! arithmetic instead of ordering them.

use core::fmt;

use portable_atomic::{AtomicU8, Ordering};

/// One sample of the wrapping 8-bit tick counter.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Tick(u8);

impl Tick {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Returns the tick `ticks` periods after `self`, wrapping at 256.
    #[must_use]
    pub const fn wrapping_add(self, ticks: u8) -> Self {
        Self(self.0.wrapping_add(ticks))
    }

    /// Number of ticks from `earlier` to `self`, modulo 256.
    #[must_use]
    pub const fn wrapping_since(self, earlier: Self) -> u8 {
        self.0.wrapping_sub(earlier.0)
    }
}

impl From<u8> for Tick {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl From<Tick> for u8 {
    fn from(tick: Tick) -> Self {
        tick.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Anything that can report the current tick.
pub trait TickSource {
    fn now(&self) -> Tick;
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn now(&self) -> Tick {
        (**self).now()
    }
}

/// Single-producer/single-consumer tick counter.
///
/// `advance` must only be called from one context (the timer interrupt on
/// target, the simulation loop on the host). Because there is exactly one
/// writer, the increment is a plain load followed by a store, which keeps the
/// counter usable on cores without atomic read-modify-write instructions.
pub struct TickCounter {
    value: AtomicU8,
}

impl TickCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: AtomicU8::new(0),
        }
    }

    /// Increments the counter by one tick. Producer side only.
    pub fn advance(&self) {
        let next = self.value.load(Ordering::Relaxed).wrapping_add(1);
        self.value.store(next, Ordering::Release);
    }

    /// Reads the counter with one atomic load. Safe from any context.
    #[must_use]
    pub fn load(&self) -> Tick {
        Tick(self.value.load(Ordering::Acquire))
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for TickCounter {
    fn now(&self) -> Tick {
        self.load()
    }
}
