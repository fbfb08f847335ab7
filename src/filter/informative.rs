//! Groupwise informative-gene filtering

use rayon::prelude::*;
use serde::Deserialize;

use crate::data::{Condition, DesignCounts, DesignTable};

/// Inclusion thresholds for one filtering pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FilterThresholds {
    /// Non-zero observations required in each group
    pub min_nonzero_per_group: usize,
    /// Total count required across all samples
    pub min_total_counts: u64,
}

impl FilterThresholds {
    /// First pass
    pub const LENIENT: FilterThresholds = FilterThresholds {
        min_nonzero_per_group: 2,
        min_total_counts: 10,
    };

    /// Retry pass after a failed fit
    pub const STRICT: FilterThresholds = FilterThresholds {
        min_nonzero_per_group: 5,
        min_total_counts: 50,
    };
}

/// Per-gene summary the filter decides on
#[derive(Debug, Clone, Copy, PartialEq)]
struct GeneSignal {
    nonzero_a: usize,
    nonzero_b: usize,
    total: f64,
    variance: f64,
}

impl GeneSignal {
    fn passes(&self, thresholds: &FilterThresholds) -> bool {
        self.nonzero_a >= thresholds.min_nonzero_per_group
            && self.nonzero_b >= thresholds.min_nonzero_per_group
            && self.variance > 0.0
            && self.total >= thresholds.min_total_counts as f64
    }
}

fn gene_signal(values: &[f64], conditions: &[Condition]) -> GeneSignal {
    let n = values.len();
    let mut nonzero_a = 0;
    let mut nonzero_b = 0;
    for (&v, &c) in values.iter().zip(conditions) {
        if v > 0.0 {
            match c {
                Condition::A => nonzero_a += 1,
                Condition::B => nonzero_b += 1,
            }
        }
    }
    let total: f64 = values.iter().sum();
    // Sample variance (n - 1); undefined for a single sample
    let variance = if n > 1 {
        let mean = total / n as f64;
        values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        f64::NAN
    };
    GeneSignal {
        nonzero_a,
        nonzero_b,
        total,
        variance,
    }
}

/// Keep the genes with enough signal in both groups.
///
/// A gene survives when it has at least `min_nonzero_per_group` non-zero
/// observations in group A and in group B, a positive variance across all
/// samples, and a total count of at least `min_total_counts`. Gene order is
/// preserved; an empty result is valid output.
pub fn filter_informative(
    counts: &DesignCounts,
    design: &DesignTable,
    thresholds: &FilterThresholds,
) -> DesignCounts {
    let conditions = design.conditions();
    let keep: Vec<usize> = (0..counts.n_genes())
        .into_par_iter()
        .filter(|&j| {
            let column = counts.gene_column(j).to_vec();
            gene_signal(&column, conditions).passes(thresholds)
        })
        .collect();

    log::debug!(
        "Informative filter (nonzero/group >= {}, total >= {}): {} of {} genes kept",
        thresholds.min_nonzero_per_group,
        thresholds.min_total_counts,
        keep.len(),
        counts.n_genes()
    );

    counts.select_genes(&keep)
}
