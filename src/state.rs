//! The main measurement state

use crate::block::BlockAccumulator;
use crate::channel::ChannelRole;
use crate::error::{Error, Result};
use crate::filter::{KWeightingCoeffs, KWeightingFilter};
use crate::gating::gated_integrated_loudness;
use crate::history::BlockStore;
use crate::lra::loudness_range;
use crate::mode::Mode;
use crate::truepeak::TruePeakDetector;

/// Public sentinel returned for "negative infinity" loudness (true digital
/// silence, or no block has survived gating yet). The reference library
/// returns `-HUGE_VAL`; using `f64::MIN` here keeps ordinary comparisons
/// well-behaved without a non-finite value leaking into callers who don't
/// expect one.
pub const NEGATIVE_INFINITY: f64 = f64::MIN;

fn publish_loudness(internal: f64) -> f64 {
    if internal.is_finite() {
        internal
    } else {
        NEGATIVE_INFINITY
    }
}

/// Owns everything needed to ingest audio and answer loudness queries for one
/// stream: one independent measurement. Combine several with
/// [`loudness_global_multiple`] / [`loudness_range_multiple`] to measure
/// across program boundaries (e.g. several clips in an album) as one whole.
pub struct State {
    channels: u32,
    sample_rate: u32,
    mode: Mode,
    channel_roles: Vec<ChannelRole>,
    filters: Vec<KWeightingFilter>,
    sample_peaks: Vec<f64>,
    true_peak_detectors: Vec<TruePeakDetector>,
    momentary_acc: BlockAccumulator,
    shortterm_acc: Option<BlockAccumulator>,
    integrated_store: Option<BlockStore>,
    lra_store: Option<BlockStore>,
    last_momentary_ms: f64,
    last_shortterm_ms: f64,
}

impl State {
    /// Build a new measurement state for `channels` input channels at
    /// `sample_rate` Hz, prepared to answer the queries implied by `mode`.
    ///
    /// Channels default to the reference layout (see
    /// [`ChannelRole::default_for_index`]); override with [`Self::set_channel`].
    pub fn new(channels: u32, sample_rate: u32, mode: Mode) -> Result<State> {
        if channels == 0 || sample_rate == 0 {
            return Err(Error::OutOfMemory { context: "channels and sample_rate must be nonzero" });
        }

        let coeffs = KWeightingCoeffs::for_sample_rate(sample_rate);
        let channel_roles = (0..channels).map(ChannelRole::default_for_index).collect();
        let filters = (0..channels).map(|_| KWeightingFilter::new(&coeffs)).collect();
        let sample_peaks = vec![0.0; channels as usize];

        let true_peak_detectors = if mode.contains(Mode::TRUE_PEAK) {
            (0..channels).map(|_| TruePeakDetector::new(sample_rate)).collect()
        } else {
            Vec::new()
        };

        let want_shortterm = mode.contains(Mode::S);
        let momentary_acc = BlockAccumulator::new(sample_rate, want_shortterm);
        let shortterm_acc = want_shortterm.then(|| BlockAccumulator::new(sample_rate, true));

        let use_histogram = mode.uses_histogram();
        let integrated_store = mode.contains(Mode::I).then(|| BlockStore::new(use_histogram));
        let lra_store = mode.contains(Mode::LRA).then(|| BlockStore::new(use_histogram));

        log::debug!("new state: {channels} channel(s) at {sample_rate} Hz, mode {mode:?}");

        Ok(State {
            channels,
            sample_rate,
            mode,
            channel_roles,
            filters,
            sample_peaks,
            true_peak_detectors,
            momentary_acc,
            shortterm_acc,
            integrated_store,
            lra_store,
            last_momentary_ms: 0.0,
            last_shortterm_ms: 0.0,
        })
    }

    /// Assign a role to an input channel, overriding the default layout.
    pub fn set_channel(&mut self, channel: u32, role: ChannelRole) -> Result<()> {
        self.channel_role_mut(channel)?;
        self.channel_roles[channel as usize] = role;
        Ok(())
    }

    fn channel_role_mut(&mut self, channel: u32) -> Result<&mut ChannelRole> {
        self.channel_roles
            .get_mut(channel as usize)
            .ok_or(Error::InvalidChannelIndex { index: channel, channels: self.channels })
    }

    /// Change the channel count and/or sample rate in place. Block history
    /// (integrated loudness and LRA) and peak values already recorded survive
    /// the change; only the filter state, 100 ms ring, and channel map reset
    /// since they are tied to the previous geometry.
    pub fn change_parameters(&mut self, channels: u32, sample_rate: u32) -> Result<()> {
        if channels == 0 || sample_rate == 0 {
            return Err(Error::OutOfMemory { context: "channels and sample_rate must be nonzero" });
        }
        if channels == self.channels && sample_rate == self.sample_rate {
            return Err(Error::NoChange);
        }

        log::info!(
            "changing parameters: {} ch @ {} Hz -> {channels} ch @ {sample_rate} Hz, block history preserved",
            self.channels,
            self.sample_rate,
        );

        let coeffs = KWeightingCoeffs::for_sample_rate(sample_rate);
        self.channel_roles = (0..channels).map(ChannelRole::default_for_index).collect();
        self.filters = (0..channels).map(|_| KWeightingFilter::new(&coeffs)).collect();

        let old_peaks = std::mem::take(&mut self.sample_peaks);
        self.sample_peaks = vec![0.0; channels as usize];
        for (i, p) in old_peaks.into_iter().enumerate().take(channels as usize) {
            self.sample_peaks[i] = p;
        }

        if self.mode.contains(Mode::TRUE_PEAK) {
            let old_detectors = std::mem::take(&mut self.true_peak_detectors);
            let old_peaks: Vec<f64> = old_detectors.iter().map(|d| d.peak()).collect();
            self.true_peak_detectors = (0..channels).map(|_| TruePeakDetector::new(sample_rate)).collect();
            for (i, p) in old_peaks.into_iter().enumerate().take(channels as usize) {
                let mut d = TruePeakDetector::new(sample_rate);
                d.process(p);
                self.true_peak_detectors[i] = d;
            }
        }

        let want_shortterm = self.mode.contains(Mode::S);
        self.momentary_acc = BlockAccumulator::new(sample_rate, want_shortterm);
        self.shortterm_acc = want_shortterm.then(|| BlockAccumulator::new(sample_rate, true));

        self.channels = channels;
        self.sample_rate = sample_rate;
        self.last_momentary_ms = 0.0;
        self.last_shortterm_ms = 0.0;
        Ok(())
    }

    fn ingest_frame(&mut self, samples: &[f64]) {
        let mut frame_energy = 0.0;
        for (c, &raw) in samples.iter().enumerate() {
            if !self.sample_peaks.is_empty() {
                self.sample_peaks[c] = self.sample_peaks[c].max(raw.abs());
            }
            if let Some(detector) = self.true_peak_detectors.get_mut(c) {
                detector.process(raw);
            }

            let weight = self.channel_roles[c].weight();
            if weight == 0.0 {
                continue;
            }
            let filtered = self.filters[c].process(raw);
            frame_energy += weight * filtered * filtered;
        }

        // Integrated loudness is gated on 400 ms blocks (updated every 100 ms
        // hop); loudness range is gated on 3 s blocks. Both read from the
        // same momentary/short-term windows queried elsewhere.
        if let Some(boundary) = self.momentary_acc.push(frame_energy) {
            if let Some(ms) = boundary.momentary_ms {
                self.last_momentary_ms = ms;
                if let Some(store) = &mut self.integrated_store {
                    store.push(ms);
                }
            }
        }
        if let Some(acc) = &mut self.shortterm_acc {
            if let Some(boundary) = acc.push(frame_energy) {
                if let Some(ms) = boundary.shortterm_ms {
                    self.last_shortterm_ms = ms;
                    if let Some(store) = &mut self.lra_store {
                        store.push(ms);
                    }
                }
            }
        }
    }

    fn ingest_generic<T, F>(&mut self, samples: &[T], frames: usize, to_f64: F) -> Result<()>
    where
        F: Fn(T) -> f64,
        T: Copy,
    {
        let channels = self.channels as usize;
        let expected = frames * channels;
        if samples.len() < expected {
            log::warn!(
                "rejecting add_frames call: buffer has {} samples, need {expected}",
                samples.len(),
            );
            return Err(Error::BufferSizeMismatch { expected, got: samples.len() });
        }
        let mut frame_buf = vec![0.0f64; channels];
        for frame in 0..frames {
            for c in 0..channels {
                frame_buf[c] = to_f64(samples[frame * channels + c]);
            }
            self.ingest_frame(&frame_buf);
        }
        Ok(())
    }

    /// Ingest `frames` frames of interleaved 16-bit PCM, normalized by 32768.
    pub fn add_frames_i16(&mut self, samples: &[i16], frames: usize) -> Result<()> {
        self.ingest_generic(samples, frames, |s| s as f64 / 32_768.0)
    }

    /// Ingest `frames` frames of interleaved 32-bit PCM, normalized by 2^31.
    pub fn add_frames_i32(&mut self, samples: &[i32], frames: usize) -> Result<()> {
        self.ingest_generic(samples, frames, |s| s as f64 / 2_147_483_648.0)
    }

    /// Ingest `frames` frames of interleaved 32-bit float, assumed full scale
    /// at ±1.0.
    pub fn add_frames_f32(&mut self, samples: &[f32], frames: usize) -> Result<()> {
        self.ingest_generic(samples, frames, |s| s as f64)
    }

    /// Ingest `frames` frames of interleaved 64-bit float, assumed full scale
    /// at ±1.0.
    pub fn add_frames_f64(&mut self, samples: &[f64], frames: usize) -> Result<()> {
        self.ingest_generic(samples, frames, |s| s)
    }

    fn require(&self, required: Mode) -> Result<()> {
        if self.mode.contains(required) {
            Ok(())
        } else {
            Err(Error::InvalidMode { required, actual: self.mode })
        }
    }

    /// Loudness of the last 400 ms window, in LUFS.
    pub fn loudness_momentary(&self) -> Result<f64> {
        self.require(Mode::M)?;
        Ok(publish_loudness(crate::history::loudness_from_ms(self.last_momentary_ms)))
    }

    /// Loudness of the last 3 s window, in LUFS.
    pub fn loudness_shortterm(&self) -> Result<f64> {
        self.require(Mode::S)?;
        Ok(publish_loudness(crate::history::loudness_from_ms(self.last_shortterm_ms)))
    }

    /// Gated integrated loudness over the whole measurement, in LUFS.
    pub fn loudness_global(&self) -> Result<f64> {
        self.require(Mode::I)?;
        let store = self.integrated_store.as_ref().expect("I implies integrated_store is Some");
        Ok(publish_loudness(gated_integrated_loudness(store.entries())))
    }

    /// Loudness range over the whole measurement, in LU.
    pub fn loudness_range(&self) -> Result<f64> {
        self.require(Mode::LRA)?;
        let store = self.lra_store.as_ref().expect("LRA implies lra_store is Some");
        Ok(loudness_range(store.entries(), store.is_histogram()))
    }

    /// Highest absolute sample value seen on `channel`, linear full-scale.
    pub fn sample_peak(&self, channel: u32) -> Result<f64> {
        self.require(Mode::SAMPLE_PEAK)?;
        self.sample_peaks
            .get(channel as usize)
            .copied()
            .ok_or(Error::InvalidChannelIndex { index: channel, channels: self.channels })
    }

    /// Highest true (inter-sample) peak seen on `channel`, linear full-scale.
    pub fn true_peak(&self, channel: u32) -> Result<f64> {
        self.require(Mode::TRUE_PEAK)?;
        self.true_peak_detectors
            .get(channel as usize)
            .map(|d| d.peak())
            .ok_or(Error::InvalidChannelIndex { index: channel, channels: self.channels })
    }

    /// The mode flags this state was built (or last changed) with.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The channel count currently in effect.
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// The sample rate currently in effect, Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn check_pool_compat<'a>(
        states: &[&'a State],
        required: Mode,
        store_of: impl Fn(&'a State) -> &'a Option<BlockStore>,
    ) -> Result<bool> {
        let mut histogram = None;
        for &state in states {
            state.require(required)?;
            let store = store_of(state).as_ref().expect("required mode implies the matching store is Some");
            match histogram {
                None => histogram = Some(store.is_histogram()),
                Some(h) if h == store.is_histogram() => {}
                Some(_) => return Err(Error::IncompatibleStorageMode),
            }
        }
        Ok(histogram.unwrap_or(false))
    }
}

/// Gated integrated loudness pooled across several independently-measured
/// states, as though their block histories belonged to one continuous
/// measurement (EBU Tech 3341 multi-track / multi-file reduction).
pub fn loudness_global_multiple(states: &[&State]) -> Result<f64> {
    State::check_pool_compat(states, Mode::I, |s| &s.integrated_store)?;
    let mut pooled = Vec::new();
    for &state in states {
        let store = state.integrated_store.as_ref().expect("I implies integrated_store is Some");
        pooled.extend(store.entries());
    }
    Ok(publish_loudness(gated_integrated_loudness(pooled)))
}

/// Loudness range pooled across several independently-measured states.
pub fn loudness_range_multiple(states: &[&State]) -> Result<f64> {
    let use_histogram = State::check_pool_compat(states, Mode::LRA, |s| &s.lra_store)?;
    let mut pooled = Vec::new();
    for &state in states {
        let store = state.lra_store.as_ref().expect("LRA implies lra_store is Some");
        pooled.extend(store.entries());
    }
    Ok(loudness_range(pooled, use_histogram))
}
