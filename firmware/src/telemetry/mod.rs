//! Mirrors controller telemetry to the debug console.
//!
//! The control loop records into the shared ring; after each poll the band
//! task hands the ring to [`LogMirror::flush`], which logs every record it has
//! not seen yet. On target the lines go out over defmt-rtt, host builds print
//! them to stdout.

use tribander_core::telemetry::{
    EventId, TelemetryEventKind, TelemetryPayload, TelemetryRecord, TelemetryRecorder,
};

macro_rules! mirror_log {
    ($($arg:tt)*) => {{
        #[cfg(target_os = "none")]
        defmt::info!($($arg)*);
        #[cfg(not(target_os = "none"))]
        println!($($arg)*);
    }};
}

/// Tracks which telemetry records have already been logged.
pub struct LogMirror {
    next: EventId,
}

impl LogMirror {
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Logs records added since the previous flush and returns how many were
    /// written. Records overwritten in the ring before a flush are skipped.
    pub fn flush<const CAPACITY: usize>(
        &mut self,
        telemetry: &TelemetryRecorder<CAPACITY>,
    ) -> usize {
        let mut logged = 0;
        for record in telemetry.since(self.next) {
            emit(record);
            logged += 1;
        }
        self.next = telemetry.next_event_id();
        logged
    }
}

fn emit(record: &TelemetryRecord) {
    let tick = record.tick.as_u8();
    match (record.event, record.details) {
        (TelemetryEventKind::ButtonConfirmed, _) => {
            mirror_log!("telemetry:button confirmed t={}", tick);
        }
        (
            TelemetryEventKind::BandSelected(band),
            TelemetryPayload::Band {
                previous: Some(previous),
            },
        ) => {
            mirror_log!(
                "telemetry:band {} -> {} t={}",
                previous.label(),
                band.label(),
                tick
            );
        }
        (TelemetryEventKind::BandSelected(band), _) => {
            mirror_log!("telemetry:band {} t={}", band.label(), tick);
        }
        (
            TelemetryEventKind::RelayAsserted(line) | TelemetryEventKind::RelayReleased(line),
            TelemetryPayload::Relay(relay),
        ) => {
            let action = if relay.asserted { "on" } else { "off" };
            if let Some(delta) = relay.ticks_since_previous {
                mirror_log!(
                    "telemetry:relay {} {} t={} d={}",
                    line.label(),
                    action,
                    tick,
                    delta
                );
            } else {
                mirror_log!("telemetry:relay {} {} t={}", line.label(), action, tick);
            }
        }
        (event, _) => {
            mirror_log!("telemetry:event {:#x} t={}", event.to_raw(), tick);
        }
    }
}
