//! Telemetry event catalog and the in-memory event ring.
//!
//! Every observable step of the control loop (a confirmed press, a band
//! selection, a relay coil pulse starting or ending) is recorded with the tick
//! at which it happened. Events encode to compact numeric codes so the
//! firmware can mirror them over defmt without formatting strings on target.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::bands::Band;
use crate::pulse::RelayLine;
use crate::ticks::Tick;

/// Identifier assigned to each recorded event.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 32;

/// Discriminated telemetry events emitted by the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    ButtonConfirmed,
    BandSelected(Band),
    RelayAsserted(RelayLine),
    RelayReleased(RelayLine),
    Custom(u16),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::ButtonConfirmed => f.write_str("button-confirmed"),
            TelemetryEventKind::BandSelected(band) => write!(f, "band-selected {band}"),
            TelemetryEventKind::RelayAsserted(line) => write!(f, "relay-asserted {line}"),
            TelemetryEventKind::RelayReleased(line) => write!(f, "relay-released {line}"),
            TelemetryEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl TelemetryEventKind {
    const BUTTON_CONFIRMED_CODE: u16 = 0x0001;
    const BAND_SELECTED_BASE: u16 = 0x0010;
    const RELAY_ASSERT_BASE: u16 = 0x0020;
    const RELAY_RELEASE_BASE: u16 = 0x0030;
    const GROUP_SPAN: u16 = 0x0010;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::ButtonConfirmed => Self::BUTTON_CONFIRMED_CODE,
            TelemetryEventKind::BandSelected(band) => {
                Self::BAND_SELECTED_BASE + band_offset(band)
            }
            TelemetryEventKind::RelayAsserted(line) => {
                Self::RELAY_ASSERT_BASE + line_offset(line)
            }
            TelemetryEventKind::RelayReleased(line) => {
                Self::RELAY_RELEASE_BASE + line_offset(line)
            }
            TelemetryEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`TelemetryEventKind::Custom`].
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        let offset = usize::from(code % Self::GROUP_SPAN);
        match code - code % Self::GROUP_SPAN {
            _ if code == Self::BUTTON_CONFIRMED_CODE => TelemetryEventKind::ButtonConfirmed,
            Self::BAND_SELECTED_BASE => Band::from_index(offset)
                .map_or(TelemetryEventKind::Custom(code), TelemetryEventKind::BandSelected),
            Self::RELAY_ASSERT_BASE => RelayLine::from_index(offset)
                .map_or(TelemetryEventKind::Custom(code), TelemetryEventKind::RelayAsserted),
            Self::RELAY_RELEASE_BASE => RelayLine::from_index(offset)
                .map_or(TelemetryEventKind::Custom(code), TelemetryEventKind::RelayReleased),
            _ => TelemetryEventKind::Custom(code),
        }
    }
}

const fn band_offset(band: Band) -> u16 {
    match band {
        Band::Meters40 => 0,
        Band::Meters20 => 1,
        Band::Meters15 => 2,
    }
}

const fn line_offset(line: RelayLine) -> u16 {
    match line {
        RelayLine::R12Set => 0,
        RelayLine::R12Reset => 1,
        RelayLine::R34Set => 2,
        RelayLine::R34Reset => 3,
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    None,
    /// Band change with the band it replaced (`None` on the first dispatch).
    Band { previous: Option<Band> },
    /// Relay coil transition.
    Relay(RelayTelemetry),
}

/// Relay transition payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RelayTelemetry {
    pub line: RelayLine,
    pub asserted: bool,
    /// Ticks since the previous relay transition, if any.
    pub ticks_since_previous: Option<u8>,
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub tick: Tick,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: TelemetryRing<CAPACITY>,
    last_relay_transition_at: Option<Tick>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            last_relay_transition_at: None,
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Records with an id of at least `first`, oldest first.
    pub fn since(&self, first: EventId) -> impl Iterator<Item = &TelemetryRecord> + '_ {
        self.oldest_first()
            .filter(move |record| record.id.wrapping_sub(first) < EventId::MAX / 2)
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    /// Identifier the next recorded event will receive.
    #[must_use]
    pub const fn next_event_id(&self) -> EventId {
        self.next_event_id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn record_button_confirmed(&mut self, tick: Tick) -> EventId {
        self.record(
            TelemetryEventKind::ButtonConfirmed,
            TelemetryPayload::None,
            tick,
        )
    }

    pub fn record_band_selected(
        &mut self,
        band: Band,
        previous: Option<Band>,
        tick: Tick,
    ) -> EventId {
        self.record(
            TelemetryEventKind::BandSelected(band),
            TelemetryPayload::Band { previous },
            tick,
        )
    }

    /// Records a relay coil transition and the ticks since the previous one.
    pub fn record_relay_transition(
        &mut self,
        line: RelayLine,
        asserted: bool,
        tick: Tick,
    ) -> EventId {
        let ticks_since_previous = self
            .last_relay_transition_at
            .map(|previous| tick.wrapping_since(previous));
        self.last_relay_transition_at = Some(tick);

        let payload = TelemetryPayload::Relay(RelayTelemetry {
            line,
            asserted,
            ticks_since_previous,
        });
        let event = if asserted {
            TelemetryEventKind::RelayAsserted(line)
        } else {
            TelemetryEventKind::RelayReleased(line)
        };
        self.record(event, payload, tick)
    }

    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        details: TelemetryPayload,
        tick: Tick,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            tick,
            event,
            details,
        });

        id
    }

    pub fn clear(&mut self) {
        self.ring.clear();
        self.last_relay_transition_at = None;
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
