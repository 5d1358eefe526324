//! K-weighting filter: the ITU-R BS.1770 two-stage biquad cascade
//!
//! Stage 1 is a high-shelf boosting frequencies above ~1.7 kHz (approximating
//! the head's acoustic effect); stage 2 is a high-pass removing content below
//! ~40 Hz (the "RLB" weighting curve, compensating for the low end of the
//! shelf). Both stages are re-discretised from their analog prototypes via
//! the bilinear transform with frequency pre-warping, so the cascade is exact
//! at any sample rate rather than approximated by scaling 48 kHz coefficients.

use core::f64::consts::PI;

/// Pre-filter (high shelf) nominal corner frequency, Hz.
const SHELF_F0: f64 = 1681.974_450_955_533;
/// Pre-filter gain, dB.
const SHELF_GAIN_DB: f64 = 3.999_843_853_973_347;
/// Pre-filter Q.
const SHELF_Q: f64 = 0.707_175_236_955_419_6;
/// RLB high-pass nominal corner frequency, Hz.
const HP_F0: f64 = 38.135_470_876_024_44;
/// RLB high-pass Q.
const HP_Q: f64 = 0.500_327_037_323_877_3;

/// One Direct-Form-I biquad section with its own delay elements.
///
/// Feedback state is flushed to exact zero whenever it decays into subnormal
/// range, rather than carrying a permanent bias term: a bias would leave true
/// digital silence reading as a tiny but nonzero signal forever, which is
/// exactly the denormal problem in a different disguise. Flush-to-zero keeps
/// long silent runs out of subnormal territory (slow on several common CPUs)
/// while letting all-zero input settle at an output of exactly `0.0`.
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    fn new(b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> Self {
        Biquad { b0, b1, b2, a1, a2, z1: 0.0, z2: 0.0 }
    }

    #[inline]
    fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.z1;
        let mut z1 = self.b1 * x - self.a1 * y + self.z2;
        let mut z2 = self.b2 * x - self.a2 * y;
        if z1.is_subnormal() {
            z1 = 0.0;
        }
        if z2.is_subnormal() {
            z2 = 0.0;
        }
        self.z1 = z1;
        self.z2 = z2;
        y
    }

    fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Coefficients for both cascade stages at a given sample rate.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KWeightingCoeffs {
    shelf: (f64, f64, f64, f64, f64),
    highpass: (f64, f64, f64, f64, f64),
}

impl KWeightingCoeffs {
    /// Re-discretise the analog prototype for `sample_rate` Hz via the
    /// bilinear transform with pre-warping. Exact for any positive sample
    /// rate; the six common broadcast rates take the same code path as an
    /// arbitrary one since the formula is closed-form and cheap.
    pub(crate) fn for_sample_rate(sample_rate: u32) -> Self {
        let fs = sample_rate as f64;

        // Stage 1: high shelf.
        let k = (PI * SHELF_F0 / fs).tan();
        let vh = 10f64.powf(SHELF_GAIN_DB / 20.0);
        let vb = vh.powf(0.499_666_774_154_541_6);
        let a0 = 1.0 + k / SHELF_Q + k * k;
        let shelf = (
            (vh + vb * k / SHELF_Q + k * k) / a0,
            2.0 * (k * k - vh) / a0,
            (vh - vb * k / SHELF_Q + k * k) / a0,
            2.0 * (k * k - 1.0) / a0,
            (1.0 - k / SHELF_Q + k * k) / a0,
        );

        // Stage 2: RLB high-pass. Only the feedback (`a`) terms are
        // normalized by `a0`; the numerator stays the fixed `[1, -2, 1]`
        // un-normalized, matching the reference filter design (the high-shelf
        // stage above is the one that normalizes its numerator by `a0`).
        let k = (PI * HP_F0 / fs).tan();
        let a0 = 1.0 + k / HP_Q + k * k;
        let highpass = (1.0, -2.0, 1.0, 2.0 * (k * k - 1.0) / a0, (1.0 - k / HP_Q + k * k) / a0);

        KWeightingCoeffs { shelf, highpass }
    }
}

/// Per-channel K-weighting filter state: two cascaded biquads.
#[derive(Debug, Clone)]
pub(crate) struct KWeightingFilter {
    shelf: Biquad,
    highpass: Biquad,
}

impl KWeightingFilter {
    pub(crate) fn new(coeffs: &KWeightingCoeffs) -> Self {
        let (b0, b1, b2, a1, a2) = coeffs.shelf;
        let shelf = Biquad::new(b0, b1, b2, a1, a2);
        let (b0, b1, b2, a1, a2) = coeffs.highpass;
        let highpass = Biquad::new(b0, b1, b2, a1, a2);
        KWeightingFilter { shelf, highpass }
    }

    #[inline]
    pub(crate) fn process(&mut self, x: f64) -> f64 {
        self.highpass.process(self.shelf.process(x))
    }

    pub(crate) fn reset(&mut self) {
        self.shelf.reset();
        self.highpass.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficients_are_finite_across_common_rates() {
        for rate in [44_100, 48_000, 88_200, 96_000, 176_400, 192_000] {
            let c = KWeightingCoeffs::for_sample_rate(rate);
            let (b0, b1, b2, a1, a2) = c.shelf;
            assert!(b0.is_finite() && b1.is_finite() && b2.is_finite());
            assert!(a1.is_finite() && a2.is_finite());
            let (b0, b1, b2, a1, a2) = c.highpass;
            assert!(b0.is_finite() && b1.is_finite() && b2.is_finite());
            assert!(a1.is_finite() && a2.is_finite());
        }
    }

    #[test]
    fn silence_stays_exactly_zero() {
        // No bias term means all-zero input must settle at exactly 0.0, not
        // merely "small" -- a nonzero floor here would leak into MS and make
        // true silence read as a finite (if very negative) LUFS value instead
        // of the negative-infinity sentinel.
        let coeffs = KWeightingCoeffs::for_sample_rate(48_000);
        let mut filter = KWeightingFilter::new(&coeffs);
        for _ in 0..48_000 * 5 {
            let y = filter.process(0.0);
            assert_eq!(y, 0.0);
        }
    }

    #[test]
    fn reset_clears_state() {
        let coeffs = KWeightingCoeffs::for_sample_rate(48_000);
        let mut filter = KWeightingFilter::new(&coeffs);
        for i in 0..1000 {
            let x = (2.0 * PI * 1000.0 * i as f64 / 48_000.0).sin();
            filter.process(x);
        }
        filter.reset();
        let y = filter.process(0.0);
        assert_eq!(y, 0.0);
    }

    #[test]
    fn sine_passes_through_with_finite_gain() {
        let coeffs = KWeightingCoeffs::for_sample_rate(48_000);
        let mut filter = KWeightingFilter::new(&coeffs);
        let mut max_abs = 0.0f64;
        for i in 0..48_000 {
            let x = (2.0 * PI * 1000.0 * i as f64 / 48_000.0).sin();
            let y = filter.process(x);
            max_abs = max_abs.max(y.abs());
        }
        assert!(max_abs > 0.5 && max_abs < 3.0);
    }
}
