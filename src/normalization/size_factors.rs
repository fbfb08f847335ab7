//! Size factor estimation using the median of ratios method

use ndarray::{Array1, ArrayView2, Axis};

use crate::error::EngineError;

/// Method for size factor estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeFactorMethod {
    /// Standard median of ratios over genes with no zero count
    Ratio,
    /// Geometric means over positive counts only, for sparse matrices
    PosCounts,
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    }
}

/// Estimate per-sample size factors from a samples x genes count matrix.
///
/// Accounts for both sequencing depth and RNA composition bias. `PosCounts`
/// rescales its factors to a geometric mean of one.
pub fn estimate_size_factors(
    counts: ArrayView2<f64>,
    method: SizeFactorMethod,
) -> Result<Array1<f64>, EngineError> {
    let (n_samples, n_genes) = counts.dim();
    if n_genes == 0 || n_samples == 0 {
        return Err(EngineError::EmptyInput {
            reason: "count matrix is empty".to_string(),
        });
    }

    // Log geometric mean per gene; None when the gene is unusable
    let log_geo_means: Vec<Option<f64>> = counts
        .axis_iter(Axis(1))
        .map(|gene| match method {
            SizeFactorMethod::Ratio => {
                if gene.iter().all(|&x| x > 0.0) {
                    Some(gene.iter().map(|&x| x.ln()).sum::<f64>() / n_samples as f64)
                } else {
                    None
                }
            }
            SizeFactorMethod::PosCounts => {
                // Divide by all samples, not just the positive ones
                let log_sum: f64 = gene.iter().filter(|&&x| x > 0.0).map(|&x| x.ln()).sum();
                if gene.iter().any(|&x| x > 0.0) {
                    Some(log_sum / n_samples as f64)
                } else {
                    None
                }
            }
        })
        .collect();

    if log_geo_means.iter().all(|g| g.is_none()) {
        return Err(EngineError::SizeFactors {
            reason: match method {
                SizeFactorMethod::Ratio => "every gene contains at least one zero".to_string(),
                SizeFactorMethod::PosCounts => "no gene has a positive count".to_string(),
            },
        });
    }

    let mut size_factors = Array1::zeros(n_samples);
    for (j, sample) in counts.axis_iter(Axis(0)).enumerate() {
        let mut log_ratios: Vec<f64> = sample
            .iter()
            .zip(&log_geo_means)
            .filter_map(|(&x, g)| match g {
                Some(g) if x > 0.0 => Some(x.ln() - g),
                _ => None,
            })
            .collect();

        size_factors[j] = if log_ratios.is_empty() {
            match method {
                SizeFactorMethod::Ratio => {
                    return Err(EngineError::SizeFactors {
                        reason: format!("no valid ratios for sample {}", j),
                    })
                }
                SizeFactorMethod::PosCounts => 1.0,
            }
        } else {
            median(&mut log_ratios).exp()
        };
    }

    if method == SizeFactorMethod::PosCounts {
        let log_mean = size_factors.iter().map(|s: &f64| s.ln()).sum::<f64>() / n_samples as f64;
        size_factors.mapv_inplace(|s| s / log_mean.exp());
    }

    if size_factors.iter().any(|&x| x <= 0.0 || !x.is_finite()) {
        return Err(EngineError::NonFinite {
            stage: "size factors".to_string(),
        });
    }

    Ok(size_factors)
}
