//! Sample/gene subsetting and design construction

use std::collections::HashSet;

use super::{Condition, ConditionLabels, CountMatrix, DesignCounts, DesignTable, PhenotypeTable};
use crate::config::AnalysisConfig;
use crate::error::{DiffExpError, Result};

/// Restrict counts and phenotype to the two requested conditions and genes.
///
/// Samples are the intersection of the count matrix columns and the
/// phenotype index (in count-matrix order), narrowed to those labelled
/// `condition_a` or `condition_b` in the group column. Genes are the
/// requested ids present in the matrix, in request order, first occurrence
/// kept. The returned counts are samples x genes and row-aligned with the
/// design table.
pub fn build_subset(
    counts: &CountMatrix,
    phenotype: &PhenotypeTable,
    gene_ids: &[String],
    condition_a: &str,
    condition_b: &str,
    config: &AnalysisConfig,
) -> Result<(DesignCounts, DesignTable)> {
    let common: Vec<(usize, usize)> = counts
        .sample_ids()
        .iter()
        .enumerate()
        .filter_map(|(j, id)| phenotype.sample_index(id).map(|row| (j, row)))
        .collect();

    if common.len() < config.min_samples {
        return Err(DiffExpError::InsufficientSamples {
            found: common.len(),
            required: config.min_samples,
        });
    }

    let groups = phenotype.require_column(&config.group_column)?;
    let labels = ConditionLabels::new(condition_a, condition_b);

    let mut sample_indices = Vec::new();
    let mut sample_ids = Vec::new();
    let mut conditions = Vec::new();
    for &(col, row) in &common {
        if let Some(condition) = labels.classify(&groups[row]) {
            sample_indices.push(col);
            sample_ids.push(counts.sample_ids()[col].clone());
            conditions.push(condition);
        }
    }

    if sample_indices.is_empty() {
        return Err(DiffExpError::NoMatchingConditions {
            condition_a: condition_a.to_string(),
            condition_b: condition_b.to_string(),
        });
    }

    let mut seen = HashSet::new();
    let gene_indices: Vec<usize> = gene_ids
        .iter()
        .filter(|g| seen.insert(g.as_str()))
        .filter_map(|g| counts.gene_index(g))
        .collect();

    if gene_indices.is_empty() {
        return Err(DiffExpError::NoGenesFound {
            requested: gene_ids.len(),
        });
    }

    let design = DesignTable::new(sample_ids.clone(), conditions, labels)?;
    let n_a = design.count(Condition::A);
    let n_b = design.count(Condition::B);
    if n_a < config.min_group_size || n_b < config.min_group_size {
        return Err(DiffExpError::InsufficientGroupSize {
            n_a,
            n_b,
            required: config.min_group_size,
        });
    }

    let gene_subset: Vec<String> = gene_indices
        .iter()
        .map(|&i| counts.gene_ids()[i].clone())
        .collect();
    let design_counts = DesignCounts::new(
        counts.select_transposed(&gene_indices, &sample_indices),
        sample_ids,
        gene_subset,
    )?;

    log::debug!(
        "Subset: {} common samples, {} in design (A={}, B={}), {} of {} requested genes present",
        common.len(),
        design.n_samples(),
        n_a,
        n_b,
        design_counts.n_genes(),
        gene_ids.len()
    );

    Ok((design_counts, design))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    /// 3 genes x 6 samples; s6 has no phenotype row, p7 has no counts column
    fn fixture(groups: &[&str]) -> (CountMatrix, PhenotypeTable) {
        let counts = Array2::from_shape_fn((3, 6), |(i, j)| (10 * i + j) as f64);
        let matrix = CountMatrix::new(
            counts,
            strings(&["g1", "g2", "g3"]),
            strings(&["s1", "s2", "s3", "s4", "s5", "s6"]),
        )
        .unwrap();

        let mut ids = strings(&["s1", "s2", "s3", "s4", "s5"]);
        ids.push("p7".to_string());
        let mut pheno = PhenotypeTable::new(ids).unwrap();
        pheno.add_column("sample_type", strings(groups)).unwrap();
        (matrix, pheno)
    }

    #[test]
    fn test_subset_orientation_and_reference() {
        let (counts, pheno) = fixture(&["T", "N", "T", "N", "X", "T"]);
        let (design_counts, design) = build_subset(
            &counts,
            &pheno,
            &strings(&["g3", "g1"]),
            "T",
            "N",
            &AnalysisConfig::default(),
        )
        .unwrap();

        assert_eq!(design_counts.n_samples(), 4);
        assert_eq!(design_counts.gene_ids(), &strings(&["g3", "g1"])[..]);
        assert_eq!(design.sample_ids(), &strings(&["s1", "s2", "s3", "s4"])[..]);
        assert_eq!(
            design.conditions(),
            &[Condition::A, Condition::B, Condition::A, Condition::B]
        );
        assert_eq!(design.reference(), Condition::B);
        // s2 is the second column of the matrix; g3 is row 2
        assert_eq!(design_counts.counts()[[1, 0]], 21.0);
    }

    #[test]
    fn test_insufficient_samples() {
        let counts = CountMatrix::new(
            Array2::ones((1, 3)),
            strings(&["g1"]),
            strings(&["s1", "s2", "s3"]),
        )
        .unwrap();
        let mut pheno = PhenotypeTable::new(strings(&["s1", "s2", "s3"])).unwrap();
        pheno.add_column("sample_type", strings(&["T", "N", "T"])).unwrap();

        let err = build_subset(&counts, &pheno, &strings(&["g1"]), "T", "N", &AnalysisConfig::default())
            .unwrap_err();
        assert!(matches!(err, DiffExpError::InsufficientSamples { found: 3, required: 4 }));
    }

    #[test]
    fn test_no_matching_conditions() {
        let (counts, pheno) = fixture(&["T", "N", "T", "N", "X", "T"]);
        let err = build_subset(&counts, &pheno, &strings(&["g1"]), "Q", "R", &AnalysisConfig::default())
            .unwrap_err();
        assert!(matches!(err, DiffExpError::NoMatchingConditions { .. }));
    }

    #[test]
    fn test_no_genes_found() {
        let (counts, pheno) = fixture(&["T", "N", "T", "N", "X", "T"]);
        let err = build_subset(&counts, &pheno, &strings(&["nope"]), "T", "N", &AnalysisConfig::default())
            .unwrap_err();
        assert!(matches!(err, DiffExpError::NoGenesFound { requested: 1 }));
    }

    #[test]
    fn test_group_too_small_reports_both_counts() {
        let (counts, pheno) = fixture(&["T", "T", "T", "N", "X", "N"]);
        let err = build_subset(&counts, &pheno, &strings(&["g1"]), "T", "N", &AnalysisConfig::default())
            .unwrap_err();
        match err {
            DiffExpError::InsufficientGroupSize { n_a, n_b, required } => {
                assert_eq!((n_a, n_b, required), (3, 1, 2));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_group_column() {
        let (counts, pheno) = fixture(&["T", "N", "T", "N", "X", "T"]);
        let config = AnalysisConfig {
            group_column: "condition".to_string(),
            ..AnalysisConfig::default()
        };
        let err = build_subset(&counts, &pheno, &strings(&["g1"]), "T", "N", &config).unwrap_err();
        assert!(matches!(err, DiffExpError::InvalidPhenotype { .. }));
    }
}
