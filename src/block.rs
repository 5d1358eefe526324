//! 100 ms block accumulator and sliding-window energy sums
//!
//! Audio time is divided into 100 ms hops. Each ingested frame contributes
//! one weighted, squared, cross-channel-summed energy value to a ring buffer
//! sized to the longest active sliding window (3 s, or 400 ms if only
//! momentary-class measurements are requested). Every `sample_rate / 10`
//! frames a block boundary fires, yielding the mean-square energy of the last
//! 400 ms and, once at least 3 s of audio has been consumed, of the last 3 s.

/// What fired at a completed 100 ms hop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BlockBoundary {
    /// Mean-square energy of the last 400 ms, if that window is fully populated.
    pub momentary_ms: Option<f64>,
    /// Mean-square energy of the last 3 s, if that window is fully populated.
    pub shortterm_ms: Option<f64>,
}

pub(crate) struct BlockAccumulator {
    ring: Vec<f64>,
    ring_len: usize,
    head: usize,
    frames_seen: u64,
    needed_frames: u32,
    block_frames: u32,
    momentary_frames: usize,
    shortterm_frames: usize,
}

impl BlockAccumulator {
    /// `want_shortterm` sizes the ring for the 3 s window; otherwise only the
    /// 400 ms window is tracked, halving memory for momentary-only streams.
    pub(crate) fn new(sample_rate: u32, want_shortterm: bool) -> Self {
        let momentary_frames = ((sample_rate as u64 * 400) / 1000) as usize;
        let shortterm_frames = ((sample_rate as u64 * 3000) / 1000) as usize;
        let ring_len = if want_shortterm { shortterm_frames } else { momentary_frames }.max(1);
        let block_frames = (sample_rate / 10).max(1);

        BlockAccumulator {
            ring: vec![0.0; ring_len],
            ring_len,
            head: 0,
            frames_seen: 0,
            needed_frames: block_frames,
            block_frames,
            momentary_frames,
            shortterm_frames,
        }
    }

    /// Push one frame's total weighted, squared, cross-channel energy.
    /// Returns the block boundary data if a 100 ms hop just completed.
    pub(crate) fn push(&mut self, frame_energy: f64) -> Option<BlockBoundary> {
        self.ring[self.head] = frame_energy;
        self.head = (self.head + 1) % self.ring_len;
        self.frames_seen = self.frames_seen.saturating_add(1);

        self.needed_frames -= 1;
        if self.needed_frames != 0 {
            return None;
        }
        self.needed_frames = self.block_frames;

        let momentary_ms = (self.frames_seen >= self.momentary_frames as u64)
            .then(|| self.window_mean(self.momentary_frames));
        let shortterm_ms = (self.ring_len >= self.shortterm_frames
            && self.frames_seen >= self.shortterm_frames as u64)
            .then(|| self.window_mean(self.shortterm_frames));

        Some(BlockBoundary { momentary_ms, shortterm_ms })
    }

    fn window_mean(&self, window_frames: usize) -> f64 {
        debug_assert!(window_frames <= self.ring_len);
        let start = (self.head + self.ring_len - window_frames) % self.ring_len;
        let mut sum = 0.0;
        let mut idx = start;
        for _ in 0..window_frames {
            sum += self.ring[idx];
            idx += 1;
            if idx == self.ring_len {
                idx = 0;
            }
        }
        sum / window_frames as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn momentary_skipped_until_window_full() {
        let mut acc = BlockAccumulator::new(48_000, false);
        // 400ms window needs 19200 frames; first boundary at 4800 frames.
        let boundary = push_n(&mut acc, 4_800, 1.0);
        assert!(boundary.momentary_ms.is_none());
    }

    #[test]
    fn momentary_fires_once_window_full() {
        let mut acc = BlockAccumulator::new(48_000, false);
        let boundary = push_n(&mut acc, 19_200, 1.0);
        assert!(boundary.momentary_ms.is_some());
        assert!((boundary.momentary_ms.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn shortterm_requires_three_seconds() {
        let mut acc = BlockAccumulator::new(48_000, true);
        let boundary = push_n(&mut acc, 144_000, 2.0);
        assert!(boundary.momentary_ms.is_some());
        assert!(boundary.shortterm_ms.is_some());
        assert!((boundary.shortterm_ms.unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn without_shortterm_ring_is_smaller() {
        let acc = BlockAccumulator::new(48_000, false);
        assert_eq!(acc.ring_len, 19_200);
        let acc = BlockAccumulator::new(48_000, true);
        assert_eq!(acc.ring_len, 144_000);
    }

    fn push_n(acc: &mut BlockAccumulator, n: usize, value: f64) -> BlockBoundary {
        let mut last = None;
        for _ in 0..n {
            if let Some(b) = acc.push(value) {
                last = Some(b);
            }
        }
        last.expect("expected at least one boundary")
    }
}
