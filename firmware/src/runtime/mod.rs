use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use static_cell::StaticCell;
use tribander_core::config::ControllerConfig;
use tribander_core::controller::BandController;
use tribander_core::telemetry::TelemetryRecorder;

use crate::hw::{HardwareButton, HardwareOutputs};
use crate::tick;

mod band_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

static TELEMETRY: StaticCell<TelemetryRecorder> = StaticCell::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = ControllerConfig::new();
    let hal::Peripherals {
        PA0,
        PA4,
        PA5,
        PA6,
        PA7,
        PA8,
        PB3,
        PB4,
        ..
    } = hal::init(hal::Config::default());

    let button = HardwareButton::new(Input::new(PA0, Pull::Up));
    // Relay order follows `RelayLine::ALL`.
    let outputs = HardwareOutputs::new(
        Output::new(PB3, Level::Low, Speed::Low),
        Output::new(PB4, Level::Low, Speed::Low),
        [
            Output::new(PA4, Level::Low, Speed::Low),
            Output::new(PA5, Level::Low, Speed::Low),
            Output::new(PA6, Level::Low, Speed::Low),
            Output::new(PA7, Level::Low, Speed::Low),
        ],
        Output::new(PA8, Level::Low, Speed::Low),
    );

    let controller =
        BandController::new(config, button, outputs).expect("invalid controller configuration");
    let telemetry = TELEMETRY.init(TelemetryRecorder::new());

    let core = cortex_m::Peripherals::take().expect("core peripherals already taken");
    tick::start(core.SYST, config.tick_period).expect("tick period outside SysTick range");
    defmt::info!(
        "tribander: pulse={} ticks, debounce={} samples",
        config.pulse_duration,
        config.debounce_samples
    );

    spawner
        .spawn(band_task::run(controller, telemetry))
        .expect("failed to spawn band task");

    core::future::pending::<()>().await;
}
