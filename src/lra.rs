//! Loudness range (LRA), per EBU Tech 3342

use crate::gating::absolute_gate;
use crate::history::{loudness_from_ms, WeightedBlock, RELATIVE_GATE_OFFSET_LRA};

const LOW_PERCENTILE: f64 = 0.10;
const HIGH_PERCENTILE: f64 = 0.95;

/// Compute loudness range over a set of 3 s blocks. `is_histogram` selects
/// between linear-interpolated percentiles (list mode) and bin-accumulated
/// percentiles (histogram mode).
pub(crate) fn loudness_range(blocks: Vec<WeightedBlock>, is_histogram: bool) -> f64 {
    let (gamma_i, survivors) = absolute_gate(blocks);
    if !gamma_i.is_finite() {
        return 0.0;
    }
    let gamma_r = gamma_i - RELATIVE_GATE_OFFSET_LRA;
    let relative_survivors: Vec<WeightedBlock> =
        survivors.into_iter().filter(|b| loudness_from_ms(b.ms) >= gamma_r).collect();

    let total: u64 = relative_survivors.iter().map(|b| b.weight).sum();
    if total < 2 {
        return 0.0;
    }

    if is_histogram {
        percentile_from_bins(&relative_survivors, total, LOW_PERCENTILE, HIGH_PERCENTILE)
    } else {
        percentile_from_list(&relative_survivors, LOW_PERCENTILE, HIGH_PERCENTILE)
    }
}

/// Block-list mode: expand into individually sorted loudness values and
/// linearly interpolate at `percentile * (n - 1)`.
fn percentile_from_list(blocks: &[WeightedBlock], low: f64, high: f64) -> f64 {
    let mut values: Vec<f64> = blocks.iter().map(|b| loudness_from_ms(b.ms)).collect();
    values.sort_by(|a, b| a.partial_cmp(b).expect("loudness values are finite"));

    let interpolate = |p: f64| -> f64 {
        let rank = p * (values.len() - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        if lo == hi {
            values[lo]
        } else {
            let frac = rank - lo as f64;
            values[lo] * (1.0 - frac) + values[hi] * frac
        }
    };

    interpolate(high) - interpolate(low)
}

/// Histogram mode: bins already arrive sorted ascending by loudness; walk
/// cumulative counts to find the bin containing each target rank.
fn percentile_from_bins(blocks: &[WeightedBlock], total: u64, low: f64, high: f64) -> f64 {
    let low_rank = (low * (total - 1) as f64).floor() as u64;
    let high_rank = (high * (total - 1) as f64).floor() as u64;

    let mut cumulative = 0u64;
    let mut low_value = f64::NEG_INFINITY;
    let mut high_value = f64::NEG_INFINITY;
    let mut found_low = false;
    let mut found_high = false;

    for block in blocks {
        cumulative += block.weight;
        if !found_low && cumulative > low_rank {
            low_value = loudness_from_ms(block.ms);
            found_low = true;
        }
        if !found_high && cumulative > high_rank {
            high_value = loudness_from_ms(block.ms);
            found_high = true;
        }
        if found_low && found_high {
            break;
        }
    }

    high_value - low_value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::BlockStore;

    fn ms_from_loudness(l: f64) -> f64 {
        10f64.powf((l + 0.691) / 10.0)
    }

    #[test]
    fn fewer_than_two_blocks_yields_zero() {
        let mut store = BlockStore::new(false);
        store.push(ms_from_loudness(-20.0));
        assert_eq!(loudness_range(store.entries(), false), 0.0);
    }

    #[test]
    fn two_plateaus_ten_lu_apart() {
        let mut store = BlockStore::new(false);
        for _ in 0..100 {
            store.push(ms_from_loudness(-30.0));
        }
        for _ in 0..100 {
            store.push(ms_from_loudness(-20.0));
        }
        let lra = loudness_range(store.entries(), false);
        assert!((lra - 10.0).abs() < 1.0, "lra = {lra}");
    }

    #[test]
    fn all_silence_yields_zero() {
        let mut store = BlockStore::new(false);
        for _ in 0..50 {
            store.push(0.0);
        }
        assert_eq!(loudness_range(store.entries(), false), 0.0);
    }

    #[test]
    fn histogram_and_list_agree_within_quantization() {
        let mut list = BlockStore::new(false);
        let mut hist = BlockStore::new(true);
        for i in 0..200 {
            let lufs = -30.0 + (i % 20) as f64 * 0.5;
            let ms = ms_from_loudness(lufs);
            list.push(ms);
            hist.push(ms);
        }
        let list_lra = loudness_range(list.entries(), false);
        let hist_lra = loudness_range(hist.entries(), true);
        assert!((list_lra - hist_lra).abs() < 0.5);
    }
}
