//! True-peak detection via polyphase oversampling
//!
//! Each channel's raw samples are fed through a windowed-sinc polyphase FIR
//! upsampler before peak tracking, approximating the peak of the
//! continuous-time reconstruction rather than just the discrete samples.
//! The interpolator (Kaiser-windowed sinc prototype decomposed into
//! per-phase taps) is upsample-only, since true-peak detection never needs
//! to come back down to the original rate.

use core::f64::consts::PI;

/// Oversampling factor selected by sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OversampleFactor {
    /// ≥ 192 kHz: no oversampling needed.
    X1,
    /// 96 kHz ≤ rate < 192 kHz.
    X2,
    /// rate < 96 kHz.
    X4,
}

impl OversampleFactor {
    pub(crate) fn for_sample_rate(sample_rate: u32) -> Self {
        if sample_rate >= 192_000 {
            OversampleFactor::X1
        } else if sample_rate >= 96_000 {
            OversampleFactor::X2
        } else {
            OversampleFactor::X4
        }
    }

    fn factor(self) -> usize {
        match self {
            OversampleFactor::X1 => 1,
            OversampleFactor::X2 => 2,
            OversampleFactor::X4 => 4,
        }
    }

    /// Taps per phase, chosen high enough to meet the ITU-R BS.1770 ±0.4 dB
    /// true-peak tolerance (the reference implementation cites a
    /// quality-8 resampler; this is a plain equivalent-quality Kaiser design).
    fn taps_per_phase(self) -> usize {
        match self {
            OversampleFactor::X1 => 1,
            OversampleFactor::X2 => 12,
            OversampleFactor::X4 => 12,
        }
    }
}

/// Polyphase FIR upsampler for one channel.
#[derive(Debug, Clone)]
struct PolyphaseUpsampler {
    num_phases: usize,
    taps_per_phase: usize,
    coeffs: Vec<Vec<f64>>,
    state: Vec<f64>,
    state_pos: usize,
}

impl PolyphaseUpsampler {
    fn new(factor: OversampleFactor) -> Self {
        let num_phases = factor.factor();
        if num_phases == 1 {
            return PolyphaseUpsampler {
                num_phases: 1,
                taps_per_phase: 1,
                coeffs: vec![vec![1.0]],
                state: vec![0.0],
                state_pos: 0,
            };
        }

        let taps_per_phase = factor.taps_per_phase();
        let total_taps = taps_per_phase * num_phases;
        let cutoff = 0.5 / num_phases as f64;
        // Stopband attenuation tuned for the ±0.4 dB BS.1770 true-peak
        // tolerance; see `design_lowpass`.
        let atten_db = 96.0;
        let prototype = design_lowpass(total_taps, cutoff, atten_db);

        let mut coeffs = vec![vec![0.0; taps_per_phase]; num_phases];
        for (i, &c) in prototype.iter().enumerate() {
            let phase = i % num_phases;
            let tap = i / num_phases;
            if tap < taps_per_phase {
                coeffs[phase][tap] = c * num_phases as f64;
            }
        }

        PolyphaseUpsampler {
            num_phases,
            taps_per_phase,
            coeffs,
            state: vec![0.0; taps_per_phase],
            state_pos: 0,
        }
    }

    /// Upsample one input sample into `num_phases` output samples.
    fn upsample(&mut self, input: f64) -> [f64; 4] {
        self.state[self.state_pos] = input;

        let mut out = [0.0; 4];
        for phase in 0..self.num_phases {
            let mut sum = 0.0;
            for tap in 0..self.taps_per_phase {
                let idx = (self.state_pos + self.taps_per_phase - tap) % self.taps_per_phase;
                sum += self.state[idx] * self.coeffs[phase][tap];
            }
            out[phase] = sum;
        }

        self.state_pos = (self.state_pos + 1) % self.taps_per_phase;
        out
    }

    fn reset(&mut self) {
        self.state.fill(0.0);
        self.state_pos = 0;
    }
}

/// Design a windowed-sinc lowpass FIR prototype with a Kaiser window.
fn design_lowpass(num_taps: usize, cutoff: f64, atten_db: f64) -> Vec<f64> {
    let mut coeffs = vec![0.0; num_taps];
    let m = num_taps - 1;

    let beta = if atten_db > 50.0 {
        0.1102 * (atten_db - 8.7)
    } else if atten_db >= 21.0 {
        0.5842 * (atten_db - 21.0).powf(0.4) + 0.07886 * (atten_db - 21.0)
    } else {
        0.0
    };

    for (i, coeff) in coeffs.iter_mut().enumerate() {
        let n = i as f64 - m as f64 / 2.0;
        let sinc = if n.abs() < 1e-10 { 2.0 * cutoff } else { (2.0 * PI * cutoff * n).sin() / (PI * n) };

        let alpha = m as f64 / 2.0;
        let arg = 1.0 - ((i as f64 - alpha) / alpha).powi(2);
        let window = if arg > 0.0 { bessel_i0(beta * arg.sqrt()) / bessel_i0(beta) } else { 0.0 };

        *coeff = sinc * window;
    }

    let sum: f64 = coeffs.iter().sum();
    if sum.abs() > 1e-10 {
        for c in &mut coeffs {
            *c /= sum;
        }
    }
    coeffs
}

/// Modified Bessel function I0, used by the Kaiser window.
fn bessel_i0(x: f64) -> f64 {
    let ax = x.abs();
    if ax < 3.75 {
        let y = (x / 3.75).powi(2);
        1.0 + y
            * (3.5156229
                + y * (3.0899424 + y * (1.2067492 + y * (0.2659732 + y * (0.0360768 + y * 0.0045813)))))
    } else {
        let y = 3.75 / ax;
        (ax.exp() / ax.sqrt())
            * (0.39894228
                + y * (0.01328592
                    + y * (0.00225319
                        + y * (-0.00157565
                            + y * (0.00916281
                                + y * (-0.02057706 + y * (0.02635537 + y * (-0.01647633 + y * 0.00392377))))))))
    }
}

/// Per-channel true-peak tracker: oversample every incoming sample and keep
/// the running maximum magnitude.
#[derive(Debug, Clone)]
pub(crate) struct TruePeakDetector {
    upsampler: PolyphaseUpsampler,
    factor: OversampleFactor,
    max_peak: f64,
}

impl TruePeakDetector {
    pub(crate) fn new(sample_rate: u32) -> Self {
        let factor = OversampleFactor::for_sample_rate(sample_rate);
        log::debug!("true-peak oversampler built for {sample_rate} Hz: {factor:?}");
        TruePeakDetector { upsampler: PolyphaseUpsampler::new(factor), factor, max_peak: 0.0 }
    }

    /// Feed one raw (unfiltered) sample and update the running true peak.
    pub(crate) fn process(&mut self, sample: f64) {
        if self.factor == OversampleFactor::X1 {
            self.max_peak = self.max_peak.max(sample.abs());
            return;
        }
        let phases = self.upsampler.upsample(sample);
        for &p in &phases[..self.upsampler.num_phases] {
            self.max_peak = self.max_peak.max(p.abs());
        }
    }

    pub(crate) fn peak(&self) -> f64 {
        self.max_peak
    }

    pub(crate) fn reset(&mut self) {
        self.upsampler.reset();
        self.max_peak = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_selection_matches_spec_thresholds() {
        assert_eq!(OversampleFactor::for_sample_rate(44_100), OversampleFactor::X4);
        assert_eq!(OversampleFactor::for_sample_rate(48_000), OversampleFactor::X4);
        assert_eq!(OversampleFactor::for_sample_rate(95_999), OversampleFactor::X4);
        assert_eq!(OversampleFactor::for_sample_rate(96_000), OversampleFactor::X2);
        assert_eq!(OversampleFactor::for_sample_rate(176_400), OversampleFactor::X2);
        assert_eq!(OversampleFactor::for_sample_rate(192_000), OversampleFactor::X1);
        assert_eq!(OversampleFactor::for_sample_rate(384_000), OversampleFactor::X1);
    }

    #[test]
    fn true_peak_is_never_below_sample_peak_for_a_held_dc_level() {
        let mut detector = TruePeakDetector::new(48_000);
        for _ in 0..64 {
            detector.process(0.8);
        }
        assert!(detector.peak() >= 0.8 - 1e-6);
    }

    #[test]
    fn impulse_true_peak_is_at_least_the_sample_peak() {
        let mut detector = TruePeakDetector::new(48_000);
        detector.process(1.0);
        for _ in 0..32 {
            detector.process(0.0);
        }
        assert!(detector.peak() >= 1.0 - 1e-6);
    }

    #[test]
    fn passthrough_at_192k_matches_sample_peak_exactly() {
        let mut detector = TruePeakDetector::new(192_000);
        detector.process(0.42);
        detector.process(-0.9);
        assert_eq!(detector.peak(), 0.9);
    }

    #[test]
    fn reset_clears_tracked_peak_and_filter_state() {
        let mut detector = TruePeakDetector::new(48_000);
        detector.process(1.0);
        detector.reset();
        assert_eq!(detector.peak(), 0.0);
    }
}
