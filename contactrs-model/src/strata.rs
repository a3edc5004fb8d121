//! Distance stratification and seeded downsampling of the fitting set.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;

/// Fewest records kept per stratum when downsampling; strata smaller than
/// this are used whole.
pub const MIN_STRATUM_POINTS: usize = 50;

///
/// Equal-width bins in log-distance space.
///
/// Contact frequency decays steeply and roughly monotonically with
/// genomic distance, so strata are cut on the log scale.
///
#[derive(Debug, Clone)]
pub struct DistanceStrata {
    lo: f64,
    width: f64,
    n_bins: usize,
}

impl DistanceStrata {
    pub fn from_log_distances(log_distances: &[f64], n_bins: usize) -> Self {
        debug_assert!(n_bins > 0);
        let lo = log_distances.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = log_distances
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        let span = hi - lo;
        if !span.is_finite() || span <= 0.0 {
            // all records at one distance: a single stratum
            return DistanceStrata {
                lo: if lo.is_finite() { lo } else { 0.0 },
                width: 1.0,
                n_bins: 1,
            };
        }
        DistanceStrata {
            lo,
            width: span / n_bins as f64,
            n_bins,
        }
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn assign(&self, log_distance: f64) -> usize {
        let raw = ((log_distance - self.lo) / self.width) as usize;
        raw.min(self.n_bins - 1)
    }
}

///
/// Choose the fitting subset: within each stratum, a uniform random
/// subsample of `fraction` of its members (floored at
/// [`MIN_STRATUM_POINTS`]), drawn from an explicitly seeded generator.
///
/// Identical seed and input produce the identical subset; the subset only
/// bounds regression cost and never affects which records get scored.
///
/// Returns sorted record indices.
///
pub fn downsample_strata(
    log_distances: &[f64],
    strata: &DistanceStrata,
    fraction: f64,
    seed: u64,
) -> Vec<usize> {
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); strata.n_bins()];
    for (idx, &log_d) in log_distances.iter().enumerate() {
        members[strata.assign(log_d)].push(idx);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut keep: Vec<usize> = Vec::new();
    for stratum in &members {
        let target = ((fraction * stratum.len() as f64).ceil() as usize)
            .max(MIN_STRATUM_POINTS)
            .min(stratum.len());
        if target == stratum.len() {
            keep.extend_from_slice(stratum);
        } else {
            for pick in index::sample(&mut rng, stratum.len(), target) {
                keep.push(stratum[pick]);
            }
        }
    }
    keep.sort_unstable();
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn log_distances() -> Vec<f64> {
        (1..=1000).map(|d| (d as f64 * 1000.0).ln()).collect()
    }

    #[rstest]
    fn test_assign_covers_all_bins() {
        let log_d = log_distances();
        let strata = DistanceStrata::from_log_distances(&log_d, 10);
        let assignments: Vec<usize> = log_d.iter().map(|&x| strata.assign(x)).collect();
        assert_eq!(*assignments.iter().min().unwrap(), 0);
        assert_eq!(*assignments.iter().max().unwrap(), 9);
    }

    #[rstest]
    fn test_single_distance_degenerates_to_one_stratum() {
        let log_d = vec![5.0; 20];
        let strata = DistanceStrata::from_log_distances(&log_d, 10);
        assert_eq!(strata.n_bins(), 1);
        assert_eq!(strata.assign(5.0), 0);
    }

    #[rstest]
    fn test_downsample_deterministic_for_seed() {
        let log_d = log_distances();
        let strata = DistanceStrata::from_log_distances(&log_d, 10);
        let a = downsample_strata(&log_d, &strata, 0.2, 7);
        let b = downsample_strata(&log_d, &strata, 0.2, 7);
        assert_eq!(a, b);

        let c = downsample_strata(&log_d, &strata, 0.2, 8);
        assert_ne!(a, c);
    }

    #[rstest]
    fn test_downsample_respects_floor() {
        let log_d = log_distances();
        let strata = DistanceStrata::from_log_distances(&log_d, 10);
        let keep = downsample_strata(&log_d, &strata, 0.01, 7);

        // per stratum: ceil(fraction * n) raised to the floor, capped at n
        let mut sizes = vec![0usize; strata.n_bins()];
        for &x in &log_d {
            sizes[strata.assign(x)] += 1;
        }
        let expected: usize = sizes
            .iter()
            .map(|&n| ((0.01 * n as f64).ceil() as usize).max(MIN_STRATUM_POINTS).min(n))
            .sum();
        assert_eq!(keep.len(), expected);
        assert!(keep.len() < log_d.len());
    }

    #[rstest]
    fn test_full_fraction_keeps_everything() {
        let log_d = log_distances();
        let strata = DistanceStrata::from_log_distances(&log_d, 10);
        let keep = downsample_strata(&log_d, &strata, 1.0, 7);
        assert_eq!(keep.len(), log_d.len());
    }
}
