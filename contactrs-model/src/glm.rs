//! Negative-binomial regression with a log link.
//!
//! Coefficients are fitted by iteratively reweighted least squares with a
//! small ridge term; the dispersion is estimated by maximizing the profile
//! log-likelihood over log-dispersion. [`fit_nb_glm`] alternates the two
//! until both stabilize.

use ndarray::{Array1, Array2};
use statrs::function::gamma::ln_gamma;

use crate::errors::ModelFitError;

pub const MIN_ALPHA: f64 = 1e-8;
pub const MAX_ALPHA: f64 = 1e8;

const RIDGE: f64 = 1e-6;
const MIN_MU: f64 = 1e-8;
const MAX_MU: f64 = 1e12;
const MAX_IRLS_ITER: usize = 100;
const IRLS_TOL: f64 = 1e-8;
const MAX_OUTER_ITER: usize = 25;
const ALPHA_TOL: f64 = 1e-5;
const BETA_CAP: f64 = 50.0;

/// A fitted negative-binomial GLM.
#[derive(Debug, Clone)]
pub struct NbGlm {
    pub beta: Array1<f64>,
    /// Dispersion: `Var(Y) = mu + alpha * mu^2`.
    pub alpha: f64,
    /// Fitted means, one per observation.
    pub mu: Vec<f64>,
    pub iterations: usize,
}

impl NbGlm {
    /// Fitted mean for a design row not necessarily seen during fitting.
    pub fn predict(&self, row: &[f64], offset: f64) -> f64 {
        let eta: f64 = row
            .iter()
            .zip(self.beta.iter())
            .map(|(x, b)| x * b)
            .sum::<f64>()
            + offset;
        eta.exp().clamp(MIN_MU, MAX_MU)
    }
}

/// Negative-binomial log-likelihood at fixed means.
pub fn nb_log_likelihood(y: &[f64], mu: &[f64], alpha: f64) -> f64 {
    let r = 1.0 / alpha.clamp(MIN_ALPHA, MAX_ALPHA);
    y.iter()
        .zip(mu.iter())
        .map(|(&yi, &mui)| {
            let mui = mui.clamp(MIN_MU, MAX_MU);
            ln_gamma(yi + r) - ln_gamma(r) - ln_gamma(yi + 1.0)
                + r * (r / (r + mui)).ln()
                + yi * (mui / (r + mui)).ln()
        })
        .sum()
}

///
/// Profile maximum-likelihood dispersion at fixed means.
///
/// Derivative-free: a coarse grid over log-dispersion brackets the
/// maximum, then golden-section search refines it. Deterministic for a
/// given input.
///
pub fn estimate_alpha(y: &[f64], mu: &[f64]) -> Result<f64, ModelFitError> {
    const GRID_POINTS: usize = 41;
    const GOLDEN_ITER: usize = 60;

    let lo = MIN_ALPHA.ln();
    let hi = MAX_ALPHA.ln();
    let step = (hi - lo) / (GRID_POINTS - 1) as f64;

    let ll_at = |log_alpha: f64| nb_log_likelihood(y, mu, log_alpha.exp());

    let mut best = lo;
    let mut best_ll = f64::NEG_INFINITY;
    for k in 0..GRID_POINTS {
        let log_alpha = lo + k as f64 * step;
        let ll = ll_at(log_alpha);
        if ll.is_finite() && ll > best_ll {
            best_ll = ll;
            best = log_alpha;
        }
    }
    if !best_ll.is_finite() {
        return Err(ModelFitError::Dispersion(
            "log-likelihood not finite anywhere on the dispersion grid".to_string(),
        ));
    }

    // golden-section refinement inside the bracketing neighbors
    let inv_phi = (5f64.sqrt() - 1.0) / 2.0;
    let mut a = (best - step).max(lo);
    let mut b = (best + step).min(hi);
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let mut fc = ll_at(c);
    let mut fd = ll_at(d);
    for _ in 0..GOLDEN_ITER {
        if (b - a).abs() < 1e-10 {
            break;
        }
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = ll_at(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = ll_at(d);
        }
    }

    Ok(((a + b) / 2.0).exp().clamp(MIN_ALPHA, MAX_ALPHA))
}

///
/// IRLS for the coefficients at fixed dispersion.
///
/// Working weights `w = mu / (1 + alpha * mu)`, working response
/// `z = (eta - offset) + (y - mu) / mu`, normal equations solved with a
/// ridge term on the diagonal. Convergence is judged on the deviance.
///
pub fn fit_nb_glm_fixed(
    y: &[f64],
    design: &Array2<f64>,
    offset: Option<&[f64]>,
    alpha: f64,
) -> Result<NbGlm, ModelFitError> {
    let n = y.len();
    let p = design.ncols();
    debug_assert_eq!(design.nrows(), n);
    let alpha = alpha.clamp(MIN_ALPHA, MAX_ALPHA);

    let off = |i: usize| offset.map_or(0.0, |o| o[i]);

    // intercept start: log of the offset-normalized mean count
    let exp_off_sum: f64 = (0..n).map(|i| off(i).exp()).sum();
    let ratio = (y.iter().sum::<f64>() / exp_off_sum).max(1e-4);
    let mut beta = Array1::zeros(p);
    beta[0] = ratio.ln();

    let mut mu: Vec<f64> = (0..n)
        .map(|i| {
            let eta: f64 = design.row(i).dot(&beta) + off(i);
            eta.exp().clamp(MIN_MU, MAX_MU)
        })
        .collect();
    let mut dev_old = -2.0 * nb_log_likelihood(y, &mu, alpha);

    for iter in 1..=MAX_IRLS_ITER {
        let mut xtwx = Array2::<f64>::zeros((p, p));
        let mut xtwz = Array1::<f64>::zeros(p);

        for i in 0..n {
            let mu_i = mu[i];
            let w = mu_i / (1.0 + alpha * mu_i);
            let eta_i = mu_i.ln();
            let z = (eta_i - off(i)) + (y[i] - mu_i) / mu_i;

            for j in 0..p {
                let xij = design[[i, j]];
                xtwz[j] += w * xij * z;
                for k in 0..p {
                    xtwx[[j, k]] += w * xij * design[[i, k]];
                }
            }
        }
        for j in 0..p {
            xtwx[[j, j]] += RIDGE;
        }

        let new_beta = solve(&xtwx, &xtwz).ok_or(ModelFitError::SingularDesign)?;
        if new_beta.iter().any(|b| !b.is_finite() || b.abs() > BETA_CAP) {
            return Err(ModelFitError::NonConvergence(iter));
        }
        beta = new_beta;

        for (i, m) in mu.iter_mut().enumerate() {
            let eta: f64 = design.row(i).dot(&beta) + off(i);
            *m = eta.exp().clamp(MIN_MU, MAX_MU);
        }

        let dev = -2.0 * nb_log_likelihood(y, &mu, alpha);
        if !dev.is_finite() {
            return Err(ModelFitError::NonConvergence(iter));
        }
        if (dev - dev_old).abs() / (dev.abs() + 0.1) < IRLS_TOL {
            return Ok(NbGlm {
                beta,
                alpha,
                mu,
                iterations: iter,
            });
        }
        dev_old = dev;
    }

    Err(ModelFitError::NonConvergence(MAX_IRLS_ITER))
}

///
/// Fit coefficients and dispersion jointly by alternating IRLS and
/// profile-likelihood dispersion updates.
///
pub fn fit_nb_glm(
    y: &[f64],
    design: &Array2<f64>,
    offset: Option<&[f64]>,
) -> Result<NbGlm, ModelFitError> {
    let n = y.len();
    let nonzero = y.iter().filter(|&&v| v > 0.0).count();
    if nonzero == 0 {
        return Err(ModelFitError::DegenerateData { nonzero, total: n });
    }

    // dispersion start from a mean-only model
    let off = |i: usize| offset.map_or(0.0, |o| o[i]);
    let exp_off_sum: f64 = (0..n).map(|i| off(i).exp()).sum();
    let ratio = (y.iter().sum::<f64>() / exp_off_sum).max(1e-4);
    let mu0: Vec<f64> = (0..n).map(|i| (ratio * off(i).exp()).clamp(MIN_MU, MAX_MU)).collect();
    let mut alpha = estimate_alpha(y, &mu0)?;

    let mut total_iterations = 0;
    for _ in 0..MAX_OUTER_ITER {
        let fit = fit_nb_glm_fixed(y, design, offset, alpha)?;
        total_iterations += fit.iterations;

        let alpha_new = estimate_alpha(y, &fit.mu)?;
        let converged = (alpha_new.ln() - alpha.ln()).abs() < ALPHA_TOL;
        alpha = alpha_new;
        if converged {
            return Ok(NbGlm {
                beta: fit.beta,
                alpha,
                mu: fit.mu,
                iterations: total_iterations,
            });
        }
    }

    Err(ModelFitError::NonConvergence(total_iterations))
}

///
/// Standard errors of the coefficients at the fitted means: square roots
/// of the diagonal of `(X'WX + ridge)^-1` with the NB working weights.
///
pub fn wald_standard_errors(
    design: &Array2<f64>,
    mu: &[f64],
    alpha: f64,
) -> Result<Array1<f64>, ModelFitError> {
    let n = design.nrows();
    let p = design.ncols();
    let alpha = alpha.clamp(MIN_ALPHA, MAX_ALPHA);

    let mut xtwx = Array2::<f64>::zeros((p, p));
    for i in 0..n {
        let w = mu[i] / (1.0 + alpha * mu[i]);
        for j in 0..p {
            for k in 0..p {
                xtwx[[j, k]] += w * design[[i, j]] * design[[i, k]];
            }
        }
    }
    for j in 0..p {
        xtwx[[j, j]] += RIDGE;
    }

    // invert by solving against unit vectors
    let mut se = Array1::zeros(p);
    for j in 0..p {
        let mut e = Array1::zeros(p);
        e[j] = 1.0;
        let col = solve(&xtwx, &e).ok_or(ModelFitError::SingularDesign)?;
        if col[j] <= 0.0 || !col[j].is_finite() {
            return Err(ModelFitError::SingularDesign);
        }
        se[j] = col[j].sqrt();
    }
    Ok(se)
}

/// Solve `A x = b` by Gaussian elimination with partial pivoting.
fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    let mut aug = Array2::<f64>::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n]] = b[i];
    }

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[[col, col]].abs();
        for row in (col + 1)..n {
            if aug[[row, col]].abs() > max_val {
                max_val = aug[[row, col]].abs();
                max_row = row;
            }
        }
        if max_val < 1e-14 {
            return None;
        }
        if max_row != col {
            for j in 0..=n {
                let tmp = aug[[col, j]];
                aug[[col, j]] = aug[[max_row, j]];
                aug[[max_row, j]] = tmp;
            }
        }

        for row in (col + 1)..n {
            let factor = aug[[row, col]] / aug[[col, col]];
            for j in col..=n {
                aug[[row, j]] -= factor * aug[[col, j]];
            }
        }
    }

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        x[i] = aug[[i, n]];
        for j in (i + 1)..n {
            x[i] -= aug[[i, j]] * x[j];
        }
        x[i] /= aug[[i, i]];
    }
    Some(x)
}
