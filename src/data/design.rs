//! Two-level design: condition factor, design table and sample-major counts

use std::fmt;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::Serialize;

use crate::error::{DiffExpError, Result};

/// Level of the two-group design factor.
///
/// The caller's condition strings never take part in the model; they are
/// mapped onto these two variants, so a condition literally named "A" or
/// "B" cannot be confused with the other level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Condition {
    /// Comparison group (numerator of the fold change)
    A,
    /// Reference group (denominator of the fold change)
    B,
}

impl Condition {
    /// The baseline level of every fit
    pub const REFERENCE: Condition = Condition::B;

    /// Factor levels in model order, reference first
    pub const LEVELS: [Condition; 2] = [Condition::B, Condition::A];

    pub fn other(self) -> Condition {
        match self {
            Condition::A => Condition::B,
            Condition::B => Condition::A,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Condition::A => "A",
            Condition::B => "B",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller's original condition strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionLabels {
    pub a: String,
    pub b: String,
}

impl ConditionLabels {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }

    /// Original label of a factor level
    pub fn label(&self, condition: Condition) -> &str {
        match condition {
            Condition::A => &self.a,
            Condition::B => &self.b,
        }
    }

    /// Map a phenotype group value onto a factor level
    pub fn classify(&self, value: &str) -> Option<Condition> {
        if value == self.a {
            Some(Condition::A)
        } else if value == self.b {
            Some(Condition::B)
        } else {
            None
        }
    }
}

/// One row per retained sample with its factor level
#[derive(Debug, Clone)]
pub struct DesignTable {
    sample_ids: Vec<String>,
    conditions: Vec<Condition>,
    labels: ConditionLabels,
}

impl DesignTable {
    pub fn new(
        sample_ids: Vec<String>,
        conditions: Vec<Condition>,
        labels: ConditionLabels,
    ) -> Result<Self> {
        if sample_ids.len() != conditions.len() {
            return Err(DiffExpError::DimensionMismatch {
                expected: format!("{} conditions", sample_ids.len()),
                got: format!("{} conditions", conditions.len()),
            });
        }
        Ok(Self {
            sample_ids,
            conditions,
            labels,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn labels(&self) -> &ConditionLabels {
        &self.labels
    }

    pub fn reference(&self) -> Condition {
        Condition::REFERENCE
    }

    /// Number of samples at a level
    pub fn count(&self, condition: Condition) -> usize {
        self.conditions.iter().filter(|&&c| c == condition).count()
    }

    /// Row indices of the samples at a level
    pub fn indices(&self, condition: Condition) -> Vec<usize> {
        self.conditions
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == condition)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Counts oriented samples x genes, the layout the engine consumes
#[derive(Debug, Clone)]
pub struct DesignCounts {
    counts: Array2<f64>,
    sample_ids: Vec<String>,
    gene_ids: Vec<String>,
}

impl DesignCounts {
    pub fn new(counts: Array2<f64>, sample_ids: Vec<String>, gene_ids: Vec<String>) -> Result<Self> {
        let (n_samples, n_genes) = counts.dim();
        if sample_ids.len() != n_samples || gene_ids.len() != n_genes {
            return Err(DiffExpError::DimensionMismatch {
                expected: format!("{} samples x {} genes", n_samples, n_genes),
                got: format!("{} sample IDs, {} gene IDs", sample_ids.len(), gene_ids.len()),
            });
        }
        Ok(Self {
            counts,
            sample_ids,
            gene_ids,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.counts.nrows()
    }

    pub fn n_genes(&self) -> usize {
        self.counts.ncols()
    }

    pub fn counts(&self) -> ArrayView2<'_, f64> {
        self.counts.view()
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Counts of one gene across all samples
    pub fn gene_column(&self, gene_idx: usize) -> ArrayView1<'_, f64> {
        self.counts.column(gene_idx)
    }

    /// Keep only the given gene columns, in the given order
    pub fn select_genes(&self, gene_indices: &[usize]) -> Self {
        Self {
            counts: self.counts.select(Axis(1), gene_indices),
            sample_ids: self.sample_ids.clone(),
            gene_ids: gene_indices.iter().map(|&j| self.gene_ids[j].clone()).collect(),
        }
    }

    /// Round every count to the nearest integer
    pub fn rounded(&self) -> Self {
        Self {
            counts: self.counts.mapv(f64::round),
            sample_ids: self.sample_ids.clone(),
            gene_ids: self.gene_ids.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_reference_is_first_level() {
        assert_eq!(Condition::LEVELS[0], Condition::REFERENCE);
        assert_eq!(Condition::REFERENCE, Condition::B);
        assert_eq!(Condition::A.other(), Condition::B);
    }

    #[test]
    fn test_labels_do_not_collide_with_level_names() {
        // Caller condition "B" is the comparison group, "A" the reference
        let labels = ConditionLabels::new("B", "A");
        assert_eq!(labels.classify("B"), Some(Condition::A));
        assert_eq!(labels.classify("A"), Some(Condition::B));
        assert_eq!(labels.label(Condition::A), "B");
        assert_eq!(labels.classify("other"), None);
    }

    #[test]
    fn test_design_counts_and_indices() {
        let design = DesignTable::new(
            vec!["s1".into(), "s2".into(), "s3".into()],
            vec![Condition::A, Condition::B, Condition::A],
            ConditionLabels::new("x", "y"),
        )
        .unwrap();
        assert_eq!(design.count(Condition::A), 2);
        assert_eq!(design.indices(Condition::B), vec![1]);
    }

    #[test]
    fn test_select_and_round() {
        let counts = DesignCounts::new(
            array![[1.4, 2.6, 3.0], [4.5, 5.0, 6.49]],
            vec!["s1".into(), "s2".into()],
            vec!["g1".into(), "g2".into(), "g3".into()],
        )
        .unwrap();
        let sub = counts.rounded().select_genes(&[2, 0]);
        assert_eq!(sub.gene_ids(), &["g3".to_string(), "g1".to_string()]);
        assert_eq!(sub.counts(), array![[3.0, 1.0], [6.0, 5.0]]);
    }
}
