//! Band catalog and the band-to-relay mapping table.
//!
//! The Tribander main board selects 40, 20 or 15 meters through two latching
//! relay pairs plus two open-collector band-select outputs. Each band entry
//! records the indicator levels and which relay coils must be pulsed to reach
//! that band. Nothing here touches hardware; the controller applies the plan.

use core::fmt;

use crate::pulse::RelayLine;

/// Number of selectable bands.
pub const BAND_COUNT: usize = 3;

/// Selectable amateur bands, in button-cycle order.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Band {
    #[default]
    Meters40,
    Meters20,
    Meters15,
}

impl Band {
    /// All bands in the order the button cycles through them.
    pub const ALL: [Band; BAND_COUNT] = [Band::Meters40, Band::Meters20, Band::Meters15];

    /// Deterministic index (0 = 40m, 1 = 20m, 2 = 15m).
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            Band::Meters40 => 0,
            Band::Meters20 => 1,
            Band::Meters15 => 2,
        }
    }

    /// Attempts to construct a [`Band`] from a raw index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Band::Meters40),
            1 => Some(Band::Meters20),
            2 => Some(Band::Meters15),
            _ => None,
        }
    }

    /// Band selected by the next confirmed press; 15m wraps back to 40m.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Band::Meters40 => Band::Meters20,
            Band::Meters20 => Band::Meters15,
            Band::Meters15 => Band::Meters40,
        }
    }

    /// Wavelength label used in logs and the emulator.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Band::Meters40 => "40m",
            Band::Meters20 => "20m",
            Band::Meters15 => "15m",
        }
    }

    /// Returns the mapping entry for this band.
    #[must_use]
    pub const fn plan(self) -> BandPlan {
        BAND_PLANS[self.as_index()]
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Static levels of the two band-select outputs.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BandIndicators {
    pub meters15: bool,
    pub meters20: bool,
}

impl BandIndicators {
    #[must_use]
    pub const fn new(meters15: bool, meters20: bool) -> Self {
        Self { meters15, meters20 }
    }
}

/// Outputs and relay pulses required to switch the board to one band.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BandPlan {
    pub band: Band,
    pub indicators: BandIndicators,
    pub pulses: &'static [RelayLine],
}

impl BandPlan {
    pub const fn new(band: Band, indicators: BandIndicators, pulses: &'static [RelayLine]) -> Self {
        Self {
            band,
            indicators,
            pulses,
        }
    }

    /// Returns `true` when this plan pulses both coils of the same relay pair.
    #[must_use]
    pub fn drives_both_coils_of_a_pair(&self) -> bool {
        self.pulses.iter().enumerate().any(|(index, line)| {
            self.pulses[index + 1..]
                .iter()
                .any(|other| other.pair() == line.pair())
        })
    }
}

/// Compile-time mapping table, indexed by [`Band::as_index`].
pub const BAND_PLANS: [BandPlan; BAND_COUNT] = [
    // 40m: both pairs back to their reset position.
    BandPlan::new(
        Band::Meters40,
        BandIndicators::new(false, false),
        &[RelayLine::R12Reset, RelayLine::R34Reset],
    ),
    BandPlan::new(
        Band::Meters20,
        BandIndicators::new(false, true),
        &[RelayLine::R12Reset, RelayLine::R34Set],
    ),
    // 15m only moves relays 1 and 2; pair 3 and 4 keeps its previous position.
    BandPlan::new(
        Band::Meters15,
        BandIndicators::new(true, false),
        &[RelayLine::R12Set],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_cycle_and_wrap() {
        assert_eq!(Band::default(), Band::Meters40);
        assert_eq!(Band::Meters40.next(), Band::Meters20);
        assert_eq!(Band::Meters20.next(), Band::Meters15);
        assert_eq!(Band::Meters15.next(), Band::Meters40);
    }

    #[test]
    fn index_round_trips_and_rejects_sentinel() {
        for band in Band::ALL {
            assert_eq!(Band::from_index(band.as_index()), Some(band));
        }
        assert_eq!(Band::from_index(3), None);
    }

    #[test]
    fn plans_match_mapping_table() {
        let forty = Band::Meters40.plan();
        assert_eq!(forty.indicators, BandIndicators::new(false, false));
        assert_eq!(forty.pulses, &[RelayLine::R12Reset, RelayLine::R34Reset]);

        let twenty = Band::Meters20.plan();
        assert_eq!(twenty.indicators, BandIndicators::new(false, true));
        assert_eq!(twenty.pulses, &[RelayLine::R12Reset, RelayLine::R34Set]);

        let fifteen = Band::Meters15.plan();
        assert_eq!(fifteen.indicators, BandIndicators::new(true, false));
        assert_eq!(fifteen.pulses, &[RelayLine::R12Set]);
    }

    #[test]
    fn no_plan_pulses_both_coils_of_one_pair() {
        for plan in BAND_PLANS {
            assert!(!plan.drives_both_coils_of_a_pair(), "{} plan", plan.band);
        }
    }

    #[test]
    fn plan_table_is_indexed_by_band() {
        for band in Band::ALL {
            assert_eq!(band.plan().band, band);
        }
    }
}
