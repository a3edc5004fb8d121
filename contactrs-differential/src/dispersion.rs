//! Replicate dispersion estimation with shrinkage.
//!
//! Per-interaction method-of-moments estimates are noisy at realistic
//! replicate counts, so they are shrunk toward a trend of dispersion
//! against mean count fitted across all tested interactions. The blend
//! happens in log space, weighted by the per-interaction degrees of
//! freedom against [`TREND_PRIOR_DF`].

use contactrs_model::glm::{MAX_ALPHA, MIN_ALPHA};

/// Prior weight of the trend in the shrinkage blend.
pub const TREND_PRIOR_DF: f64 = 10.0;

///
/// Fitted mean-dispersion trend `alpha(m) = a0 + a1 / m`.
///
#[derive(Debug, Clone, Copy)]
pub struct DispersionTrend {
    a0: f64,
    a1: f64,
}

impl DispersionTrend {
    ///
    /// Least-squares fit of `alpha ~ 1/mean` over `(mean, alpha)` points.
    /// Negative coefficients are clamped to zero; returns `None` when the
    /// system is degenerate or both coefficients vanish.
    ///
    pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
        let usable: Vec<(f64, f64)> = points
            .iter()
            .filter(|(m, a)| *m > 0.0 && a.is_finite())
            .copied()
            .collect();
        if usable.len() < 2 {
            return None;
        }

        // normal equations for the basis [1, 1/m]
        let n = usable.len() as f64;
        let mut s_x = 0.0;
        let mut s_xx = 0.0;
        let mut s_y = 0.0;
        let mut s_xy = 0.0;
        for &(m, a) in &usable {
            let x = 1.0 / m;
            s_x += x;
            s_xx += x * x;
            s_y += a;
            s_xy += x * a;
        }
        let det = n * s_xx - s_x * s_x;
        if det.abs() < 1e-12 {
            return None;
        }
        let a0 = ((s_xx * s_y - s_x * s_xy) / det).max(0.0);
        let a1 = ((n * s_xy - s_x * s_y) / det).max(0.0);
        if a0 == 0.0 && a1 == 0.0 {
            return None;
        }
        Some(DispersionTrend { a0, a1 })
    }

    pub fn value(&self, mean: f64) -> f64 {
        let mean = mean.max(1e-8);
        (self.a0 + self.a1 / mean).clamp(MIN_ALPHA, MAX_ALPHA)
    }
}

///
/// Log-space blend of a per-interaction estimate toward the trend value,
/// weighted by the estimate's degrees of freedom.
///
pub fn shrink(mom: f64, trend: f64, df: f64) -> f64 {
    let mom = mom.clamp(MIN_ALPHA, MAX_ALPHA);
    let trend = trend.clamp(MIN_ALPHA, MAX_ALPHA);
    let w = (df / (df + TREND_PRIOR_DF)).clamp(0.0, 1.0);
    (w * mom.ln() + (1.0 - w) * trend.ln()).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::*;

    #[rstest]
    fn test_trend_recovers_known_curve() {
        // alpha = 0.05 + 2/m exactly
        let points: Vec<(f64, f64)> = (1..=50)
            .map(|k| {
                let m = k as f64 * 4.0;
                (m, 0.05 + 2.0 / m)
            })
            .collect();
        let trend = DispersionTrend::fit(&points).unwrap();
        for m in [5.0, 20.0, 100.0] {
            let expected = 0.05 + 2.0 / m;
            assert!((trend.value(m) - expected).abs() < 1e-6);
        }
    }

    #[rstest]
    fn test_trend_degenerate_inputs() {
        assert!(DispersionTrend::fit(&[]).is_none());
        assert!(DispersionTrend::fit(&[(10.0, 0.1)]).is_none());
        // identical means make the system singular
        assert!(DispersionTrend::fit(&[(10.0, 0.1), (10.0, 0.2)]).is_none());
    }

    #[rstest]
    fn test_shrink_moves_toward_trend() {
        let shrunk = shrink(1.0, 0.01, 2.0);
        assert!(shrunk < 1.0 && shrunk > 0.01);
        // more df, less shrinkage
        assert!(shrink(1.0, 0.01, 50.0) > shrunk);
    }

    #[rstest]
    fn test_shrink_zero_df_returns_trend() {
        let shrunk = shrink(1.0, 0.05, 0.0);
        assert!((shrunk - 0.05).abs() < 1e-12);
    }
}
