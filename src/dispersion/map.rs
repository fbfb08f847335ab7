//! MAP (Maximum A Posteriori) dispersion estimation
//!
//! Empirical Bayes shrinkage of the gene-wise estimates toward the fitted
//! trend, with a log-normal prior centred on the trend value.

use rayon::prelude::*;

use super::gene_wise::{cox_reid_log_likelihood, GeneDispersionInput};
use super::{maximize_on_log_scale, DispersionParams};

/// Floor of the prior variance of log dispersions
const MIN_PRIOR_VAR: f64 = 0.25;

/// Prior variance of the log dispersions and the observed variance of the
/// log residuals, as `(prior_var, var_log_disp_ests)`.
///
/// The observed variance is MAD^2 of log(gene-wise / trended) over genes
/// above 100 * min_disp; the sampling variance trigamma((m - p) / 2) is
/// subtracted from it.
pub(crate) fn estimate_prior_variance(
    gene_dispersions: &[f64],
    trended_dispersions: &[f64],
    n_samples: usize,
    n_coefs: usize,
    min_disp: f64,
) -> (f64, f64) {
    let mut log_residuals: Vec<f64> = gene_dispersions
        .iter()
        .zip(trended_dispersions)
        .filter(|(&g, &t)| g >= 100.0 * min_disp && t > 0.0 && g.is_finite() && t.is_finite())
        .map(|(&g, &t)| g.ln() - t.ln())
        .collect();

    if log_residuals.len() < 3 {
        return (MIN_PRIOR_VAR, MIN_PRIOR_VAR);
    }

    let var_log_disp_ests = mad_squared(&mut log_residuals);
    if n_samples <= n_coefs {
        return (MIN_PRIOR_VAR, var_log_disp_ests);
    }

    let df = (n_samples - n_coefs) as f64;
    let prior_var = (var_log_disp_ests - trigamma(df / 2.0)).max(MIN_PRIOR_VAR);
    log::debug!(
        "Dispersion prior: df={}, varLogDispEsts={:.4}, priorVar={:.4}",
        df,
        var_log_disp_ests,
        prior_var
    );
    (prior_var, var_log_disp_ests)
}

/// Shrink every gene toward its trended value.
///
/// Genes whose gene-wise estimate lies more than `outlier_sd` standard
/// deviations above the trend keep the gene-wise value. Returns the final
/// dispersions and the outlier flags.
#[allow(clippy::too_many_arguments)]
pub(crate) fn estimate_map_dispersions(
    inputs: &[GeneDispersionInput],
    in_a: &[bool],
    gene_dispersions: &[f64],
    trended_dispersions: &[f64],
    prior_var: f64,
    var_log_disp_ests: f64,
    max_disp: f64,
    params: &DispersionParams,
) -> (Vec<f64>, Vec<bool>) {
    let outlier_threshold = params.outlier_sd * var_log_disp_ests.sqrt();

    let results: Vec<(f64, bool)> = inputs
        .par_iter()
        .zip(gene_dispersions.par_iter().zip(trended_dispersions.par_iter()))
        .map(|(input, (&gene_disp, &trend_disp))| {
            let is_outlier = gene_disp.is_finite()
                && trend_disp > 0.0
                && gene_disp.ln() - trend_disp.ln() > outlier_threshold;
            if is_outlier {
                return (gene_disp, true);
            }

            let prior_mean = trend_disp.ln();
            let log_alpha = maximize_on_log_scale(
                |log_alpha| {
                    cox_reid_log_likelihood(input, in_a, log_alpha.exp())
                        - (log_alpha - prior_mean).powi(2) / (2.0 * prior_var)
                },
                params.min_disp.ln(),
                max_disp.ln(),
                params.grid_points,
            );
            (log_alpha.exp().clamp(params.min_disp, max_disp), false)
        })
        .collect();

    let n_outliers = results.iter().filter(|(_, o)| *o).count();
    log::debug!(
        "Dispersion upper outliers: {} (threshold={:.4})",
        n_outliers,
        outlier_threshold
    );

    results.into_iter().unzip()
}

/// MAD^2 with the normal consistency constant 1.4826
fn mad_squared(values: &mut [f64]) -> f64 {
    fn median(sorted: &[f64]) -> f64 {
        let n = sorted.len();
        if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        }
    }

    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let center = median(values);
    let mut abs_devs: Vec<f64> = values.iter().map(|&x| (x - center).abs()).collect();
    abs_devs.sort_by(|a, b| a.total_cmp(b));
    let mad = median(&abs_devs) * 1.4826;
    mad * mad
}

/// Trigamma function (derivative of digamma)
fn trigamma(x: f64) -> f64 {
    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).powi(2) - trigamma(1.0 - x);
    }

    if x >= 8.0 {
        let x2 = x * x;
        return 1.0 / x + 0.5 / x2 + 1.0 / (6.0 * x2 * x) - 1.0 / (30.0 * x2 * x2 * x);
    }

    let mut result = 0.0;
    let mut z = x;
    while z < 8.0 {
        result += 1.0 / (z * z);
        z += 1.0;
    }
    result + trigamma(z)
}
