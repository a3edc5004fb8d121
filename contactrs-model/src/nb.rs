//! Negative-binomial tail probabilities and score helpers.

use statrs::distribution::{DiscreteCDF, NegativeBinomial};

use crate::glm::{MAX_ALPHA, MIN_ALPHA};

/// Modeled standard deviation: `sqrt(mu + alpha * mu^2)`.
pub fn nb_sdev(mu: f64, alpha: f64) -> f64 {
    (mu + alpha * mu * mu).sqrt()
}

///
/// Upper-tail probability `P(X >= count)` for a negative binomial with
/// mean `mu` and dispersion `alpha`.
///
/// Parameterized for statrs as `r = 1/alpha`, `p = r / (r + mu)`, which
/// gives `E[X] = mu` and `Var(X) = mu + alpha * mu^2`.
///
pub fn nb_upper_tail(count: u32, mu: f64, alpha: f64) -> f64 {
    if count == 0 {
        return 1.0;
    }
    let mu = mu.max(1e-10);
    let r = 1.0 / alpha.clamp(MIN_ALPHA, MAX_ALPHA);
    let p = r / (r + mu);
    let dist = NegativeBinomial::new(r, p).expect("clamped NB parameters are valid");
    // P(X >= c) = P(X > c - 1)
    dist.sf(u64::from(count) - 1).clamp(0.0, 1.0)
}

/// `(count - mu) / sdev`
pub fn z_score(count: u32, mu: f64, sdev: f64) -> f64 {
    (count as f64 - mu) / sdev
}
