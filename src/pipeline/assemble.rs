//! Response packaging

use std::collections::BTreeMap;

use crate::data::{Condition, DesignTable};
use crate::io::{AnalysisResult, GeneStatRow};

/// Tally samples per original condition label and package the response.
pub fn assemble(
    dataset_id: &str,
    condition_a: &str,
    condition_b: &str,
    design: &DesignTable,
    rows: Vec<GeneStatRow>,
) -> AnalysisResult {
    let mut sample_counts = BTreeMap::new();
    for &condition in &Condition::LEVELS {
        let n = design.count(condition);
        if n > 0 {
            *sample_counts
                .entry(design.labels().label(condition).to_string())
                .or_insert(0) += n;
        }
    }

    AnalysisResult {
        dataset_id: dataset_id.to_string(),
        condition_a: condition_a.to_string(),
        condition_b: condition_b.to_string(),
        sample_counts,
        results: rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ConditionLabels;

    #[test]
    fn test_counts_keyed_by_original_labels() {
        let design = DesignTable::new(
            (0..5).map(|i| format!("s{}", i)).collect(),
            vec![Condition::A, Condition::B, Condition::A, Condition::A, Condition::B],
            ConditionLabels::new("Primary Tumor", "Solid Tissue Normal"),
        )
        .unwrap();

        let result = assemble(
            "MOCK",
            "Primary Tumor",
            "Solid Tissue Normal",
            &design,
            vec![GeneStatRow::absent("g1")],
        );
        assert_eq!(result.sample_counts["Primary Tumor"], 3);
        assert_eq!(result.sample_counts["Solid Tissue Normal"], 2);
        assert_eq!(result.sample_counts.values().sum::<usize>(), design.n_samples());
        assert_eq!(result.results.len(), 1);
    }

    #[test]
    fn test_labels_named_like_levels() {
        // "B" is the caller's comparison group here, not the reference level
        let design = DesignTable::new(
            vec!["s1".into(), "s2".into(), "s3".into()],
            vec![Condition::A, Condition::A, Condition::B],
            ConditionLabels::new("B", "A"),
        )
        .unwrap();

        let result = assemble("MOCK", "B", "A", &design, Vec::new());
        assert_eq!(result.sample_counts["B"], 2);
        assert_eq!(result.sample_counts["A"], 1);
    }
}
