//! Tick source: SysTick exception advancing the shared eight bit counter.

use core::{fmt, time::Duration};

use tribander_core::ticks::TickCounter;

/// Core clock after reset (HSI16, no PLL).
pub const CORE_CLOCK_HZ: u32 = 16_000_000;

/// Largest SysTick reload value (24-bit down counter).
const SYST_RELOAD_MAX: u32 = 0x00FF_FFFF;

/// Counter written by the SysTick handler and read by the band task.
pub static TICKS: TickCounter = TickCounter::new();

/// Reasons the tick source cannot be started.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TickSetupError {
    /// The period is shorter than two core cycles or longer than the 24-bit
    /// reload allows.
    PeriodOutOfRange { period: Duration },
}

impl fmt::Display for TickSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickSetupError::PeriodOutOfRange { period } => write!(
                f,
                "tick period {period:?} does not fit SysTick at {CORE_CLOCK_HZ} Hz"
            ),
        }
    }
}

/// SysTick reload value for one tick of `period` at `core_hz`.
pub fn systick_reload(core_hz: u32, period: Duration) -> Result<u32, TickSetupError> {
    let cycles = u128::from(core_hz) * period.as_nanos() / 1_000_000_000;
    cycles
        .checked_sub(1)
        .and_then(|reload| u32::try_from(reload).ok())
        .filter(|reload| (1..=SYST_RELOAD_MAX).contains(reload))
        .ok_or(TickSetupError::PeriodOutOfRange { period })
}

#[cfg(target_os = "none")]
pub use systick::start;

#[cfg(target_os = "none")]
mod systick {
    use core::time::Duration;

    use cortex_m::peripheral::SYST;
    use cortex_m::peripheral::syst::SystClkSource;
    use cortex_m_rt::exception;

    use super::{CORE_CLOCK_HZ, TICKS, TickSetupError, systick_reload};

    /// Starts SysTick at `period`.
    pub fn start(mut syst: SYST, period: Duration) -> Result<(), TickSetupError> {
        let reload = systick_reload(CORE_CLOCK_HZ, period)?;
        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(reload);
        syst.clear_current();
        syst.enable_interrupt();
        syst.enable_counter();
        Ok(())
    }

    #[exception]
    fn SysTick() {
        TICKS.advance();
    }
}
