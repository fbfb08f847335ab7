//! Negative binomial distribution utilities

use statrs::function::gamma::ln_gamma;

/// Floor applied to fitted means before weights are computed
pub const MIN_MU: f64 = 0.5;

/// Coefficients beyond this magnitude (natural log) mark a diverging fit
pub const MAX_BETA: f64 = 30.0;

/// Maximum eta value to prevent overflow (exp(700) ≈ 1e304)
pub const MAX_ETA: f64 = 700.0;

/// Mean of the count given linear predictor and size factor: s * exp(eta)
pub fn nb_mean(eta: f64, size_factor: f64) -> f64 {
    size_factor * eta.clamp(-MAX_ETA, MAX_ETA).exp()
}

/// Var(Y) = mu + alpha * mu^2
pub fn nb_variance(mu: f64, alpha: f64) -> f64 {
    mu + alpha * mu * mu
}

/// lnΓ(k + r) - lnΓ(r) - k ln r, without cancellation when r is large
fn ln_gamma_ratio(k: f64, r: f64) -> f64 {
    if k == 0.0 {
        return 0.0;
    }
    if r < 10.0 {
        return ln_gamma(k + r) - ln_gamma(r) - k * r.ln();
    }
    // Stirling series difference
    let tail = |z: f64| {
        let z2 = z * z;
        1.0 / (12.0 * z) - 1.0 / (360.0 * z2 * z) + 1.0 / (1260.0 * z2 * z2 * z)
    };
    (r + k - 0.5) * (k / r).ln_1p() - k + tail(r + k) - tail(r)
}

/// Log-probability of observing `k` under NB(mean `mu`, dispersion `alpha`)
pub fn nb_log_likelihood(k: f64, mu: f64, alpha: f64) -> f64 {
    if mu <= 0.0 || alpha <= 0.0 {
        return f64::NEG_INFINITY;
    }

    let r = 1.0 / alpha;
    ln_gamma_ratio(k, r) - ln_gamma(k + 1.0) + k * mu.ln() - (r + k) * (alpha * mu).ln_1p()
}

/// IRLS working weight: mu / (1 + alpha * mu)
pub fn nb_weight(mu: f64, alpha: f64) -> f64 {
    mu / (1.0 + alpha * mu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nb_mean() {
        let mu = nb_mean(2.0, 1.0);
        assert!((mu - 2.0_f64.exp()).abs() < 1e-10);
    }

    #[test]
    fn test_nb_variance() {
        let var = nb_variance(10.0, 0.1);
        assert!((var - 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_nb_log_likelihood_approaches_poisson() {
        // Poisson(5) at k = 5: 5 ln 5 - 5 - ln 120
        let poisson = 5.0 * 5.0_f64.ln() - 5.0 - 120.0_f64.ln();
        let ll = nb_log_likelihood(5.0, 5.0, 1e-6);
        assert!((ll - poisson).abs() < 1e-3);
    }

    #[test]
    fn test_nb_log_likelihood_sums_to_one() {
        let total: f64 = (0..400)
            .map(|k| nb_log_likelihood(k as f64, 12.0, 0.3).exp())
            .sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_large_size_matches_direct_formula() {
        let (k, mu, alpha) = (7.0, 12.0, 0.05);
        let r = 1.0 / alpha;
        let direct = ln_gamma(k + r) - ln_gamma(r) - ln_gamma(k + 1.0)
            + r * (r / (r + mu)).ln()
            + k * (mu / (r + mu)).ln();
        assert!((nb_log_likelihood(k, mu, alpha) - direct).abs() < 1e-9);
    }

    #[test]
    fn test_nb_weight() {
        let w = nb_weight(10.0, 0.1);
        assert!((w - 5.0).abs() < 1e-10);
    }
}
