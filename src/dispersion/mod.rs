//! Dispersion estimation for negative binomial models

mod gene_wise;
mod map;
mod trend;

pub use trend::DispersionTrend;

use crate::error::EngineError;
use gene_wise::{estimate_gene_dispersions, GeneDispersionInput};
use map::{estimate_map_dispersions, estimate_prior_variance};
use trend::fit_dispersion_trend;

/// Coefficients of the two-group design: intercept and group A effect
const N_COEFS: usize = 2;

/// Configurable parameters for dispersion estimation.
#[derive(Debug, Clone)]
pub struct DispersionParams {
    /// Lower bound of every dispersion estimate
    pub min_disp: f64,
    /// Outlier threshold for MAP shrinkage, in SDs of the log residuals
    pub outlier_sd: f64,
    /// Points of the coarse log-scale grid before golden-section refinement
    pub grid_points: usize,
}

impl Default for DispersionParams {
    fn default() -> Self {
        Self {
            min_disp: 1e-8,
            outlier_sd: 2.0,
            grid_points: 30,
        }
    }
}

/// All dispersion stages for one set of genes
#[derive(Debug, Clone)]
pub struct DispersionEstimates {
    /// Mean of normalized counts per gene
    pub base_means: Vec<f64>,
    pub gene_wise: Vec<f64>,
    pub trended: Vec<f64>,
    /// Final dispersions used by the GLM
    pub map: Vec<f64>,
    pub outliers: Vec<bool>,
    pub trend: DispersionTrend,
    pub prior_var: f64,
}

/// Estimate gene-wise, trended and MAP dispersions.
///
/// `columns` holds one count vector per gene, in sample order.
pub fn estimate_dispersions(
    columns: &[Vec<f64>],
    in_a: &[bool],
    size_factors: &[f64],
    params: &DispersionParams,
) -> Result<DispersionEstimates, EngineError> {
    let n_samples = in_a.len();
    if n_samples <= N_COEFS {
        return Err(EngineError::NoReplicates {
            n_samples,
            n_coefs: N_COEFS,
        });
    }
    if columns.is_empty() {
        return Err(EngineError::EmptyInput {
            reason: "no genes to estimate dispersions for".to_string(),
        });
    }

    let max_disp = (n_samples as f64).max(10.0);
    let inputs: Vec<GeneDispersionInput> = columns
        .iter()
        .map(|y| GeneDispersionInput::new(y, in_a, size_factors))
        .collect();

    let gene_wise = estimate_gene_dispersions(&inputs, in_a, max_disp, params);
    if gene_wise.iter().all(|&d| d < 100.0 * params.min_disp) {
        return Err(EngineError::DegenerateDispersions {
            min_disp: params.min_disp,
        });
    }

    let base_means: Vec<f64> = inputs.iter().map(|g| g.base_mean).collect();
    let trend = fit_dispersion_trend(&base_means, &gene_wise, params.min_disp);
    let trended: Vec<f64> = base_means.iter().map(|&m| trend.eval(m)).collect();

    let (prior_var, var_log_disp_ests) =
        estimate_prior_variance(&gene_wise, &trended, n_samples, N_COEFS, params.min_disp);
    let (map, outliers) = estimate_map_dispersions(
        &inputs,
        in_a,
        &gene_wise,
        &trended,
        prior_var,
        var_log_disp_ests,
        max_disp,
        params,
    );

    if map.iter().any(|d| !d.is_finite()) {
        return Err(EngineError::NonFinite {
            stage: "dispersion estimates".to_string(),
        });
    }

    Ok(DispersionEstimates {
        base_means,
        gene_wise,
        trended,
        map,
        outliers,
        trend,
        prior_var,
    })
}

/// Maximize `f` over `[lo, hi]`: coarse grid, then golden-section search
/// between the neighbours of the best grid point.
pub(crate) fn maximize_on_log_scale<F>(f: F, lo: f64, hi: f64, grid_points: usize) -> f64
where
    F: Fn(f64) -> f64,
{
    let n = grid_points.max(3);
    let step = (hi - lo) / (n - 1) as f64;
    let score = |x: f64| {
        let v = f(x);
        if v.is_nan() {
            f64::NEG_INFINITY
        } else {
            v
        }
    };

    let (best, _) = (0..n)
        .map(|i| (i, score(lo + step * i as f64)))
        .fold((0, f64::NEG_INFINITY), |acc, (i, v)| if v > acc.1 { (i, v) } else { acc });

    let mut a = lo + step * best.saturating_sub(1) as f64;
    let mut b = (lo + step * (best + 1) as f64).min(hi);
    let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let mut fc = score(c);
    let mut fd = score(d);

    for _ in 0..60 {
        if (b - a).abs() < 1e-7 {
            break;
        }
        if fc >= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = score(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = score(d);
        }
    }

    let mid = (a + b) / 2.0;
    let grid_best = lo + step * best as f64;
    if score(mid) >= score(grid_best) {
        mid
    } else {
        grid_best
    }
}
