//! Gene-wise dispersion estimation

use rayon::prelude::*;

use super::{maximize_on_log_scale, DispersionParams};
use crate::glm::{nb_log_likelihood, MIN_MU};

/// Per-gene inputs shared by the gene-wise and MAP stages
#[derive(Debug, Clone)]
pub(crate) struct GeneDispersionInput {
    pub counts: Vec<f64>,
    /// Fitted means from the group means of normalized counts
    pub mu: Vec<f64>,
    /// Mean of normalized counts
    pub base_mean: f64,
}

impl GeneDispersionInput {
    pub fn new(counts: &[f64], in_a: &[bool], size_factors: &[f64]) -> Self {
        let mut sums = [0.0; 2];
        let mut ns = [0usize; 2];
        let mut total = 0.0;
        for ((&y, &a), &s) in counts.iter().zip(in_a).zip(size_factors) {
            let norm = y / s;
            sums[usize::from(a)] += norm;
            ns[usize::from(a)] += 1;
            total += norm;
        }
        let group_mean = [sums[0] / ns[0].max(1) as f64, sums[1] / ns[1].max(1) as f64];
        let mu = in_a
            .iter()
            .zip(size_factors)
            .map(|(&a, &s)| (s * group_mean[usize::from(a)]).max(MIN_MU))
            .collect();
        Self {
            counts: counts.to_vec(),
            mu,
            base_mean: total / counts.len().max(1) as f64,
        }
    }
}

/// Cox-Reid adjusted profile log-likelihood of `alpha`.
///
/// For the two-column design, det(X'WX) factors into the summed weights of
/// the two groups.
pub(crate) fn cox_reid_log_likelihood(input: &GeneDispersionInput, in_a: &[bool], alpha: f64) -> f64 {
    let mut ll = 0.0;
    let mut weight_a = 0.0;
    let mut weight_b = 0.0;
    for ((&y, &mu), &a) in input.counts.iter().zip(&input.mu).zip(in_a) {
        ll += nb_log_likelihood(y, mu, alpha);
        let w = 1.0 / (1.0 / mu + alpha);
        if a {
            weight_a += w;
        } else {
            weight_b += w;
        }
    }
    ll - 0.5 * (weight_a * weight_b).ln()
}

/// Maximum-likelihood dispersion for every gene
pub(crate) fn estimate_gene_dispersions(
    inputs: &[GeneDispersionInput],
    in_a: &[bool],
    max_disp: f64,
    params: &DispersionParams,
) -> Vec<f64> {
    inputs
        .par_iter()
        .map(|input| {
            let alpha = maximize_on_log_scale(
                |log_alpha| cox_reid_log_likelihood(input, in_a, log_alpha.exp()),
                params.min_disp.ln(),
                max_disp.ln(),
                params.grid_points,
            )
            .exp();
            alpha.clamp(params.min_disp, max_disp)
        })
        .collect()
}
