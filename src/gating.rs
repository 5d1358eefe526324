//! Two-pass absolute + relative gated loudness reduction

use crate::history::{
    loudness_from_ms, weighted_mean_loudness, WeightedBlock, ABSOLUTE_GATE_LUFS,
    RELATIVE_GATE_OFFSET_I,
};

/// Absolute-gate a set of blocks and return `(ungated_mean_loudness,
/// survivors)`. `ungated_mean_loudness` is negative infinity if nothing
/// survives the absolute gate.
///
/// This is the shared first pass of both integrated loudness and loudness
/// range: integrated applies a further −10 LU relative gate to the survivors
/// here, while LRA applies a −20 LU relative gate and then takes percentiles
/// instead of a mean.
pub(crate) fn absolute_gate(blocks: Vec<WeightedBlock>) -> (f64, Vec<WeightedBlock>) {
    let total_in = blocks.len();
    let survivors: Vec<WeightedBlock> = blocks
        .into_iter()
        .filter(|b| loudness_from_ms(b.ms) >= ABSOLUTE_GATE_LUFS)
        .collect();
    log::trace!("absolute gate: {}/{} blocks survived", survivors.len(), total_in);
    let gamma_a = weighted_mean_loudness(&survivors);
    (gamma_a, survivors)
}

/// Full two-pass gated reduction used for integrated ("global") loudness.
/// Returns negative infinity if no block survives the absolute gate.
pub(crate) fn gated_integrated_loudness(blocks: Vec<WeightedBlock>) -> f64 {
    let (gamma_a, survivors) = absolute_gate(blocks);
    if !gamma_a.is_finite() {
        return f64::NEG_INFINITY;
    }
    let gamma_r = gamma_a - RELATIVE_GATE_OFFSET_I;
    let relative_survivors: Vec<WeightedBlock> =
        survivors.into_iter().filter(|b| loudness_from_ms(b.ms) >= gamma_r).collect();
    log::trace!("relative gate: {} blocks survived at Γr = {gamma_r:.2} LUFS", relative_survivors.len());
    weighted_mean_loudness(&relative_survivors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::BlockStore;

    fn ms_from_loudness(l: f64) -> f64 {
        10f64.powf((l + 0.691) / 10.0)
    }

    #[test]
    fn all_silent_blocks_yield_neg_infinity() {
        let mut store = BlockStore::new(false);
        for _ in 0..10 {
            store.push(0.0);
        }
        assert_eq!(gated_integrated_loudness(store.entries()), f64::NEG_INFINITY);
    }

    #[test]
    fn quiet_blocks_are_absolute_gated() {
        let mut store = BlockStore::new(false);
        // A handful of loud blocks plus one far below -70 LUFS.
        for _ in 0..20 {
            store.push(ms_from_loudness(-23.0));
        }
        store.push(ms_from_loudness(-90.0));
        let loudness = gated_integrated_loudness(store.entries());
        assert!((loudness - (-23.0)).abs() < 0.1);
    }

    #[test]
    fn quiet_half_is_relative_gated() {
        let mut store = BlockStore::new(false);
        for _ in 0..100 {
            store.push(ms_from_loudness(-36.0));
        }
        for _ in 0..100 {
            store.push(ms_from_loudness(-23.0));
        }
        let loudness = gated_integrated_loudness(store.entries());
        // The quiet half sits well more than 10 LU below the loud half's
        // ungated mean, so it should be excluded and the result should track
        // the loud half closely.
        assert!((loudness - (-23.0)).abs() < 1.0);
    }
}
