//! Dispersion trend fitting

use crate::error::EngineError;

/// Fitted dispersion-mean relationship
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispersionTrend {
    /// dispersion = asympt_disp + extra_pois / mean
    Parametric { asympt_disp: f64, extra_pois: f64 },
    /// Trimmed mean of the gene-wise estimates, used when the parametric fit fails
    Mean(f64),
}

impl DispersionTrend {
    /// Trended dispersion at a given mean of normalized counts
    pub fn eval(&self, mean: f64) -> f64 {
        match *self {
            DispersionTrend::Parametric {
                asympt_disp,
                extra_pois,
            } => {
                if mean > 0.0 {
                    asympt_disp + extra_pois / mean
                } else {
                    asympt_disp
                }
            }
            DispersionTrend::Mean(value) => value,
        }
    }
}

/// Fit the trend, falling back to the mean when the parametric fit fails
pub(crate) fn fit_dispersion_trend(means: &[f64], dispersions: &[f64], min_disp: f64) -> DispersionTrend {
    let valid: Vec<(f64, f64)> = means
        .iter()
        .zip(dispersions)
        .filter(|(&m, &d)| m > 0.0 && d > 100.0 * min_disp && d.is_finite())
        .map(|(&m, &d)| (m, d))
        .collect();

    match fit_parametric(&valid) {
        Ok((asympt_disp, extra_pois)) => {
            log::debug!(
                "Parametric dispersion trend: asymptDisp={:.6}, extraPois={:.4}",
                asympt_disp,
                extra_pois
            );
            DispersionTrend::Parametric {
                asympt_disp,
                extra_pois,
            }
        }
        Err(e) => {
            let mean = trimmed_mean_dispersion(dispersions, min_disp);
            log::warn!("{}; using mean dispersion {:.6} as the trend", e, mean);
            DispersionTrend::Mean(mean)
        }
    }
}

/// Mean of the estimates above 10 * min_disp, trimming 0.1% at each end
fn trimmed_mean_dispersion(dispersions: &[f64], min_disp: f64) -> f64 {
    let mut usable: Vec<f64> = dispersions
        .iter()
        .filter(|&&d| d > 10.0 * min_disp && d.is_finite())
        .copied()
        .collect();
    if usable.is_empty() {
        return min_disp.max(0.1);
    }
    usable.sort_by(|a, b| a.total_cmp(b));
    let n = usable.len();
    let trim = (n as f64 * 0.001).floor() as usize;
    let kept = &usable[trim..n - trim];
    kept.iter().sum::<f64>() / kept.len() as f64
}

/// Gamma GLM with iterative residual filtering: keep points whose
/// dispersion / fitted lies in (1e-4, 15), refit, until the coefficients settle
fn fit_parametric(data: &[(f64, f64)]) -> Result<(f64, f64), EngineError> {
    let failed = |reason: &str| EngineError::TrendFit {
        reason: reason.to_string(),
    };

    if data.len() < 3 {
        return Err(failed("not enough genes for a parametric dispersion fit"));
    }

    let mut coefs = (0.1_f64, 1.0_f64);
    for _ in 0..11 {
        let old = coefs;
        let good: Vec<(f64, f64)> = data
            .iter()
            .filter(|&&(mean, disp)| {
                let fitted = coefs.0 + coefs.1 / mean;
                fitted > 0.0 && {
                    let residual = disp / fitted;
                    residual > 1e-4 && residual < 15.0
                }
            })
            .copied()
            .collect();

        if good.len() < 3 {
            return Err(failed("not enough well-fitted genes for a parametric dispersion fit"));
        }

        let (next, converged) = fit_gamma_identity(&good, coefs);
        coefs = next;

        if coefs.0 <= 0.0 || coefs.1 <= 0.0 {
            return Err(failed("parametric dispersion fit produced non-positive coefficients"));
        }

        let log_change = (coefs.0 / old.0).ln().powi(2) + (coefs.1 / old.1).ln().powi(2);
        if log_change < 1e-6 && converged {
            return Ok(coefs);
        }
    }

    Err(failed("parametric dispersion fit did not converge"))
}

fn gamma_deviance(data: &[(f64, f64)], a0: f64, a1: f64) -> f64 {
    data.iter()
        .map(|&(mean, disp)| {
            let mu = (a0 + a1 / mean).max(1e-8);
            2.0 * (-(disp / mu).ln() + (disp - mu) / mu)
        })
        .sum()
}

/// Gamma GLM with identity link, `disp ~ 1 + I(1/mean)`.
/// Returns the coefficients and whether IRLS converged.
fn fit_gamma_identity(data: &[(f64, f64)], start: (f64, f64)) -> ((f64, f64), bool) {
    let (mut a0, mut a1) = start;
    let mut dev_old = gamma_deviance(data, a0, a1);

    for _ in 0..25 {
        let (mut sw, mut swx, mut swz, mut swxx, mut swxz) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for &(mean, disp) in data {
            let x = 1.0 / mean;
            let mu = (a0 + a1 * x).max(1e-8);
            let w = 1.0 / (mu * mu);
            sw += w;
            swx += w * x;
            swz += w * disp;
            swxx += w * x * x;
            swxz += w * x * disp;
        }

        let det = sw * swxx - swx * swx;
        if det.abs() < 1e-10 {
            return ((a0, a1), false);
        }
        a0 = (swxx * swz - swx * swxz) / det;
        a1 = (sw * swxz - swx * swz) / det;

        let dev = gamma_deviance(data, a0, a1);
        if (dev_old - dev).abs() / (0.1 + dev.abs()) < 1e-8 {
            return ((a0, a1), true);
        }
        dev_old = dev;
    }
    ((a0, a1), false)
}
