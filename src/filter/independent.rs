//! Independent filtering on mean expression

use crate::testing::benjamini_hochberg;

/// Number of candidate filter thresholds
const N_THETA: usize = 50;

/// Outcome of independent filtering
#[derive(Debug, Clone)]
pub struct IndependentFilter {
    /// Adjusted p-values; NaN for filtered genes
    pub padj: Vec<f64>,
    /// Quantile of base means used as the filter
    pub theta: f64,
    /// Base mean threshold; genes below it were filtered
    pub cutoff: f64,
}

/// Adjust p-values after removing low-mean genes.
///
/// Tries 50 quantiles of the base means between the share of all-zero genes
/// and 0.95, keeps the one with the most rejections at `alpha`. When no
/// threshold reaches more than 10 rejections nothing is filtered.
pub fn independent_filtering(base_means: &[f64], pvalues: &[f64], alpha: f64) -> IndependentFilter {
    let n = base_means.len();
    let mut sorted_means: Vec<f64> = base_means.iter().filter(|m| m.is_finite()).copied().collect();
    if n == 0 || sorted_means.is_empty() {
        return IndependentFilter {
            padj: benjamini_hochberg(pvalues),
            theta: 0.0,
            cutoff: 0.0,
        };
    }
    sorted_means.sort_by(|a, b| a.total_cmp(b));

    let lower = base_means.iter().filter(|&&m| m == 0.0 || !m.is_finite()).count() as f64 / n as f64;
    let upper = if lower < 0.95 { 0.95 } else { 1.0 };

    let mut best: Option<(f64, f64, Vec<f64>, usize)> = None;
    for i in 0..N_THETA {
        let theta = lower + (upper - lower) * i as f64 / (N_THETA - 1) as f64;
        let cutoff = quantile_type7(&sorted_means, theta);
        let filtered: Vec<f64> = pvalues
            .iter()
            .zip(base_means)
            .map(|(&p, &m)| if m >= cutoff { p } else { f64::NAN })
            .collect();
        let padj = benjamini_hochberg(&filtered);
        let rejections = padj.iter().filter(|&&p| p < alpha).count();
        if best.as_ref().map_or(true, |b| rejections > b.3) {
            best = Some((theta, cutoff, padj, rejections));
        }
    }

    match best {
        Some((theta, cutoff, padj, rejections)) if rejections > 10 => {
            log::debug!(
                "Independent filtering: theta={:.3}, cutoff={:.2}, rejections={}",
                theta,
                cutoff,
                rejections
            );
            IndependentFilter { padj, theta, cutoff }
        }
        _ => IndependentFilter {
            padj: benjamini_hochberg(pvalues),
            theta: 0.0,
            cutoff: 0.0,
        },
    }
}

/// Quantile with linear interpolation between order statistics (R type 7)
fn quantile_type7(sorted_x: &[f64], p: f64) -> f64 {
    let n = sorted_x.len();
    if n == 1 {
        return sorted_x[0];
    }
    let h = (n as f64 - 1.0) * p;
    let lo = (h.floor() as usize).min(n - 1);
    let hi = (h.ceil() as usize).min(n - 1);
    sorted_x[lo] + (h - lo as f64) * (sorted_x[hi] - sorted_x[lo])
}
