//! Natural cubic spline basis for the distance trend.
//!
//! The significance model regresses log expected count on a smooth
//! function of log distance. The basis here is the standard natural cubic
//! construction: cubic between knots, linear beyond the boundary knots,
//! which keeps extrapolation at extreme distances tame.

use crate::errors::ModelFitError;

#[derive(Debug, Clone)]
pub struct NaturalSpline {
    knots: Vec<f64>,
}

impl NaturalSpline {
    ///
    /// Place `df + 1` knots at evenly spaced quantiles of `xs` (boundary
    /// knots at the extremes). Duplicate quantiles collapse, reducing the
    /// effective degrees of freedom.
    ///
    pub fn from_quantiles(xs: &[f64], df: usize) -> Result<Self, ModelFitError> {
        if xs.is_empty() || df == 0 {
            return Err(ModelFitError::DegenerateData {
                nonzero: 0,
                total: xs.len(),
            });
        }

        let mut sorted = xs.to_vec();
        sorted.sort_by(f64::total_cmp);

        let k = df + 1;
        let mut knots = Vec::with_capacity(k);
        for i in 0..k {
            let q = i as f64 / (k - 1) as f64;
            let pos = q * (sorted.len() - 1) as f64;
            knots.push(sorted[pos.round() as usize]);
        }
        knots.dedup_by(|a, b| (*a - *b).abs() < 1e-12);

        if knots.len() < 2 {
            return Err(ModelFitError::DegenerateData {
                nonzero: knots.len(),
                total: xs.len(),
            });
        }
        Ok(NaturalSpline { knots })
    }

    /// Number of basis columns (intercept excluded).
    pub fn df(&self) -> usize {
        self.knots.len() - 1
    }

    /// Evaluate the basis at `x`: one linear column plus `K - 2`
    /// truncated-cubic columns.
    pub fn basis(&self, x: f64) -> Vec<f64> {
        let k = self.knots.len();
        let mut out = Vec::with_capacity(k - 1);
        out.push(x);

        let last = k - 1;
        let d_last = self.d(last - 1, x);
        for i in 0..(k - 2) {
            out.push(self.d(i, x) - d_last);
        }
        out
    }

    fn d(&self, i: usize, x: f64) -> f64 {
        let k_i = self.knots[i];
        let k_last = self.knots[self.knots.len() - 1];
        (pos_cube(x - k_i) - pos_cube(x - k_last)) / (k_last - k_i)
    }
}

fn pos_cube(v: f64) -> f64 {
    if v > 0.0 { v * v * v } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn xs() -> Vec<f64> {
        (0..=100).map(|i| i as f64 / 10.0).collect()
    }

    #[rstest]
    fn test_dimension_matches_df() {
        let spline = NaturalSpline::from_quantiles(&xs(), 4).unwrap();
        assert_eq!(spline.df(), 4);
        assert_eq!(spline.basis(3.3).len(), 4);
    }

    #[rstest]
    fn test_linear_beyond_boundary() {
        let spline = NaturalSpline::from_quantiles(&xs(), 4).unwrap();
        // second differences vanish where the natural spline is linear
        for base in [12.0, 20.0, -5.0] {
            let h = 0.5;
            let f0 = spline.basis(base);
            let f1 = spline.basis(base + h);
            let f2 = spline.basis(base + 2.0 * h);
            for j in 0..spline.df() {
                let second_diff = f2[j] - 2.0 * f1[j] + f0[j];
                assert!(
                    second_diff.abs() < 1e-7,
                    "column {j} not linear at {base}: {second_diff}"
                );
            }
        }
    }

    #[rstest]
    fn test_continuity_at_knots() {
        let spline = NaturalSpline::from_quantiles(&xs(), 4).unwrap();
        let eps = 1e-7;
        for knot in [2.5, 5.0, 7.5] {
            let below = spline.basis(knot - eps);
            let above = spline.basis(knot + eps);
            for j in 0..spline.df() {
                assert!((below[j] - above[j]).abs() < 1e-5);
            }
        }
    }

    #[rstest]
    fn test_constant_input_degenerate() {
        let flat = vec![3.0; 50];
        assert!(matches!(
            NaturalSpline::from_quantiles(&flat, 4),
            Err(ModelFitError::DegenerateData { .. })
        ));
    }

    #[rstest]
    fn test_few_distinct_values_reduce_df() {
        let xs: Vec<f64> = (0..60).map(|i| if i < 30 { 1.0 } else { 2.0 }).collect();
        let spline = NaturalSpline::from_quantiles(&xs, 4).unwrap();
        assert_eq!(spline.df(), 1);
    }
}
