use embassy_futures::yield_now;
use tribander_core::controller::BandController;
use tribander_core::telemetry::TelemetryRecorder;

use crate::hw::{HardwareButton, HardwareOutputs};
use crate::telemetry::LogMirror;
use crate::tick::TICKS;

pub type BoardController = BandController<HardwareButton<'static>, HardwareOutputs<'static>>;

#[embassy_executor::task]
pub async fn run(mut controller: BoardController, telemetry: &'static mut TelemetryRecorder) -> ! {
    let mut mirror = LogMirror::new();
    loop {
        controller.poll(TICKS.load(), telemetry);
        mirror.flush(telemetry);
        yield_now().await;
    }
}
