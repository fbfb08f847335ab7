//! Cook's distance outlier filtering
//!
//! Cook's distance measures the influence of each observation on the fitted
//! model: `cooks = PearsonResSq / p * H / (1 - H)^2`.

use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use crate::glm::{nb_variance, GeneFit};

/// Replicates a group needs before its samples are checked for outliers
pub const MIN_REPLICATES_FOR_COOKS: usize = 3;

/// Cook's distance per sample for one fitted gene
pub fn cooks_distance(counts: &[f64], fit: &GeneFit, alpha: f64, n_coefs: usize) -> Vec<f64> {
    counts
        .iter()
        .zip(&fit.mu)
        .zip(&fit.hat_diagonals)
        .map(|((&y, &mu), &h)| {
            let v = nb_variance(mu, alpha);
            let pearson_resid_sq = if v > 0.0 { (y - mu).powi(2) / v } else { 0.0 };
            if h.is_finite() && h < 1.0 && pearson_resid_sq.is_finite() {
                pearson_resid_sq / n_coefs as f64 * h / (1.0 - h).powi(2)
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// F(p, m - p) quantile at 0.99
pub fn default_cooks_cutoff(n_samples: usize, n_coefs: usize) -> f64 {
    if n_samples <= n_coefs {
        return f64::INFINITY;
    }
    match FisherSnedecor::new(n_coefs as f64, (n_samples - n_coefs) as f64) {
        Ok(f_dist) => f_dist.inverse_cdf(0.99),
        Err(_) => f64::INFINITY,
    }
}

/// Flag genes whose largest Cook's distance exceeds `cutoff`.
///
/// Only samples of groups with at least [`MIN_REPLICATES_FOR_COOKS`]
/// replicates are considered. A flagged outlier is let through when at
/// least three other samples have a higher count, since such a sample sits
/// on the low side of the gene's distribution.
pub fn flag_cooks_outliers(
    columns: &[Vec<f64>],
    fits: &[GeneFit],
    dispersions: &[f64],
    in_a: &[bool],
    cutoff: f64,
) -> Vec<bool> {
    let n_a = in_a.iter().filter(|&&a| a).count();
    let n_b = in_a.len() - n_a;
    let eligible: Vec<bool> = in_a
        .iter()
        .map(|&a| (if a { n_a } else { n_b }) >= MIN_REPLICATES_FOR_COOKS)
        .collect();

    let flags: Vec<bool> = columns
        .iter()
        .zip(fits)
        .zip(dispersions)
        .map(|((counts, fit), &alpha)| {
            let cooks = cooks_distance(counts, fit, alpha, 2);
            let worst = cooks
                .iter()
                .zip(&eligible)
                .enumerate()
                .filter(|(_, (c, &ok))| ok && c.is_finite())
                .max_by(|(_, (a, _)), (_, (b, _))| a.total_cmp(b))
                .map(|(j, (&c, _))| (j, c));

            match worst {
                Some((j, c)) if c > cutoff => {
                    let n_greater = counts.iter().filter(|&&y| y > counts[j]).count();
                    n_greater < 3
                }
                _ => false,
            }
        })
        .collect();

    log::debug!(
        "Cook's cutoff {:.4}: {} genes flagged",
        cutoff,
        flags.iter().filter(|&&f| f).count()
    );
    flags
}
