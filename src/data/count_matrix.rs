//! Count matrix representation for RNA-seq data

use std::collections::{HashMap, HashSet};

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{DiffExpError, Result};

/// Reject identifier lists that contain the same id twice
fn ensure_unique(ids: &[String], axis: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(DiffExpError::InvalidCountMatrix {
                reason: format!("duplicate {} identifier '{}'", axis, id),
            });
        }
    }
    Ok(())
}

/// A count matrix representing RNA-seq read counts
/// Rows are genes, columns are samples
#[derive(Debug, Clone)]
pub struct CountMatrix {
    /// Raw count data (genes x samples)
    counts: Array2<f64>,
    /// Gene identifiers
    gene_ids: Vec<String>,
    /// Sample identifiers
    sample_ids: Vec<String>,
    /// Gene id -> row
    gene_lookup: HashMap<String, usize>,
    /// Sample id -> column
    sample_lookup: HashMap<String, usize>,
}

impl CountMatrix {
    /// Create a new count matrix from raw data
    pub fn new(
        counts: Array2<f64>,
        gene_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (n_genes, n_samples) = counts.dim();

        if gene_ids.len() != n_genes {
            return Err(DiffExpError::DimensionMismatch {
                expected: format!("{} gene IDs", n_genes),
                got: format!("{} gene IDs", gene_ids.len()),
            });
        }

        if sample_ids.len() != n_samples {
            return Err(DiffExpError::DimensionMismatch {
                expected: format!("{} sample IDs", n_samples),
                got: format!("{} sample IDs", sample_ids.len()),
            });
        }

        // Validate counts are non-negative finite numbers
        if counts.iter().any(|&x| x < 0.0 || !x.is_finite()) {
            return Err(DiffExpError::InvalidCountMatrix {
                reason: "Counts must be non-negative finite values".to_string(),
            });
        }

        ensure_unique(&gene_ids, "gene")?;
        ensure_unique(&sample_ids, "sample")?;

        if counts.iter().any(|&x| x != x.round()) {
            log::warn!("Some count values are not integers; they will be rounded before fitting");
        }

        let gene_lookup = gene_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let sample_lookup = sample_ids
            .iter()
            .enumerate()
            .map(|(j, id)| (id.clone(), j))
            .collect();

        Ok(Self {
            counts,
            gene_ids,
            sample_ids,
            gene_lookup,
            sample_lookup,
        })
    }

    pub fn n_genes(&self) -> usize {
        self.counts.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.counts.ncols()
    }

    /// Genes x samples view
    pub fn counts(&self) -> ArrayView2<'_, f64> {
        self.counts.view()
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// One gene's counts across all samples
    pub fn gene_counts(&self, gene_idx: usize) -> ArrayView1<'_, f64> {
        self.counts.row(gene_idx)
    }

    pub fn gene_index(&self, gene_id: &str) -> Option<usize> {
        self.gene_lookup.get(gene_id).copied()
    }

    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.sample_lookup.get(sample_id).copied()
    }

    /// Extract the given genes and samples, transposed to samples x genes
    pub fn select_transposed(
        &self,
        gene_indices: &[usize],
        sample_indices: &[usize],
    ) -> Array2<f64> {
        self.counts
            .select(Axis(0), gene_indices)
            .select(Axis(1), sample_indices)
            .reversed_axes()
            .as_standard_layout()
            .into_owned()
    }
}
