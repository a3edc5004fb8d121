//! Benjamini-Hochberg false discovery rate correction.

use contactrs_core::models::container::InteractionContainer;
use contactrs_core::models::sample::Sample;

///
/// Whether q-values are corrected within each chromosome or across all
/// chromosomes of a run.
///
/// The choice changes q-value magnitudes, so it is a required, explicit
/// parameter rather than a default.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionScope {
    PerChromosome,
    Global,
}

///
/// Benjamini-Hochberg adjusted p-values, in input order.
///
/// Sorts indices by p-value, adjusts as `p * n / rank`, then enforces
/// monotonicity right to left and clamps to [0, 1].
///
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    if n == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    let n_f = n as f64;
    let mut adjusted = vec![0.0; n];
    let mut prev = f64::INFINITY;
    for rank in (0..n).rev() {
        let adj = (p_values[order[rank]] * n_f / (rank + 1) as f64).min(1.0);
        let adj = adj.min(prev);
        adjusted[order[rank]] = adj;
        prev = adj;
    }
    adjusted
}

///
/// Apply BH correction across the scored records of one container.
/// Unscored records keep `q_value = None`.
///
pub fn correct_container(container: &mut InteractionContainer) {
    let scored: Vec<(usize, f64)> = container
        .records()
        .iter()
        .enumerate()
        .filter_map(|(pos, r)| r.p_value.map(|p| (pos, p)))
        .collect();

    let q = benjamini_hochberg(&scored.iter().map(|&(_, p)| p).collect::<Vec<f64>>());
    let records = container.records_mut();
    for (&(pos, _), q) in scored.iter().zip(q) {
        records[pos].q_value = Some(q);
    }
}

///
/// Apply BH correction jointly across every scored record of every
/// chromosome in the sample.
///
pub fn correct_sample_global(sample: &mut Sample) {
    let mut keys: Vec<(usize, usize)> = Vec::new();
    let mut p_values: Vec<f64> = Vec::new();
    for (c_idx, container) in sample.containers().iter().enumerate() {
        for (r_idx, record) in container.records().iter().enumerate() {
            if let Some(p) = record.p_value {
                keys.push((c_idx, r_idx));
                p_values.push(p);
            }
        }
    }

    let q = benjamini_hochberg(&p_values);
    let containers = sample.containers_mut();
    for ((c_idx, r_idx), q) in keys.into_iter().zip(q) {
        containers[c_idx].records_mut()[r_idx].q_value = Some(q);
    }
}
