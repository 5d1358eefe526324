//! Measurement mode flags
//!
//! Mirrors the reference library's `enum mode`, composed with `|` the same
//! way, but as a small zero-cost wrapper over `u32` instead of raw C ints so
//! that `contains()` checks read as intent rather than bit arithmetic.

use core::ops::{BitOr, BitOrAssign};

/// Which measurements a [`crate::State`] is prepared to compute.
///
/// Flags imply their prerequisites the same way the reference header's
/// `enum mode` does: `S` implies `M`, `I` implies `M`, `LRA` implies `S`
/// (and transitively `M`), `SAMPLE_PEAK`/`TRUE_PEAK` each imply `M`.
/// `HISTOGRAM` does not gate any query by itself — it switches the block
/// storage strategy used by whichever of `I`/`LRA` is also requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mode(u32);

impl Mode {
    const BIT_M: u32 = 1 << 0;
    const BIT_S: u32 = 1 << 1;
    const BIT_I: u32 = 1 << 2;
    const BIT_LRA: u32 = 1 << 3;
    const BIT_SAMPLE_PEAK: u32 = 1 << 4;
    const BIT_TRUE_PEAK: u32 = 1 << 5;
    const BIT_HISTOGRAM: u32 = 1 << 6;

    /// Can call `loudness_momentary`.
    pub const M: Mode = Mode(Self::BIT_M);
    /// Can call `loudness_shortterm`. Implies `M`.
    pub const S: Mode = Mode(Self::BIT_S | Self::BIT_M);
    /// Can call `loudness_global`/`loudness_global_multiple`. Implies `M`.
    pub const I: Mode = Mode(Self::BIT_I | Self::BIT_M);
    /// Can call `loudness_range`/`loudness_range_multiple`. Implies `S` (and `M`).
    pub const LRA: Mode = Mode(Self::BIT_LRA | Self::BIT_S | Self::BIT_M);
    /// Can call `sample_peak`. Implies `M`.
    pub const SAMPLE_PEAK: Mode = Mode(Self::BIT_SAMPLE_PEAK | Self::BIT_M);
    /// Can call `true_peak`. Implies `M`.
    pub const TRUE_PEAK: Mode = Mode(Self::BIT_TRUE_PEAK | Self::BIT_M);
    /// Use the O(1)-memory histogram storage strategy for gated block lists.
    pub const HISTOGRAM: Mode = Mode(Self::BIT_HISTOGRAM);
    /// No measurements enabled.
    pub const NONE: Mode = Mode(0);

    /// Returns `true` if every flag in `other` is present in `self`.
    pub const fn contains(self, other: Mode) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if histogram block storage was requested.
    pub const fn uses_histogram(self) -> bool {
        self.0 & Self::BIT_HISTOGRAM != 0
    }
}

impl BitOr for Mode {
    type Output = Mode;
    fn bitor(self, rhs: Mode) -> Mode {
        Mode(self.0 | rhs.0)
    }
}

impl BitOrAssign for Mode {
    fn bitor_assign(&mut self, rhs: Mode) {
        self.0 |= rhs.0;
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implied_flags_compose() {
        assert!(Mode::S.contains(Mode::M));
        assert!(Mode::I.contains(Mode::M));
        assert!(Mode::LRA.contains(Mode::S));
        assert!(Mode::LRA.contains(Mode::M));
        assert!(Mode::SAMPLE_PEAK.contains(Mode::M));
        assert!(Mode::TRUE_PEAK.contains(Mode::M));
    }

    #[test]
    fn histogram_is_independent() {
        let mode = Mode::I | Mode::HISTOGRAM;
        assert!(mode.contains(Mode::I));
        assert!(mode.uses_histogram());
        assert!(!Mode::I.uses_histogram());
    }

    #[test]
    fn bitor_union() {
        let mode = Mode::M | Mode::LRA | Mode::TRUE_PEAK;
        assert!(mode.contains(Mode::M));
        assert!(mode.contains(Mode::LRA));
        assert!(mode.contains(Mode::TRUE_PEAK));
        assert!(!mode.contains(Mode::HISTOGRAM));
    }
}
