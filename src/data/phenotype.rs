//! Sample-indexed phenotype table

use std::collections::{HashMap, HashSet};

use crate::error::{DiffExpError, Result};

/// Phenotype annotations, one row per sample
#[derive(Debug, Clone)]
pub struct PhenotypeTable {
    /// Sample identifiers (the table index)
    sample_ids: Vec<String>,
    /// Categorical columns (column name -> value for each sample)
    columns: HashMap<String, Vec<String>>,
    /// Sample id -> row
    lookup: HashMap<String, usize>,
}

impl PhenotypeTable {
    /// Create an empty table indexed by `sample_ids`
    pub fn new(sample_ids: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(sample_ids.len());
        for id in &sample_ids {
            if !seen.insert(id.as_str()) {
                return Err(DiffExpError::InvalidPhenotype {
                    reason: format!("duplicate sample ID '{}'", id),
                });
            }
        }
        let lookup = sample_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Ok(Self {
            sample_ids,
            columns: HashMap::new(),
            lookup,
        })
    }

    /// Add a categorical column
    pub fn add_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.sample_ids.len() {
            return Err(DiffExpError::DimensionMismatch {
                expected: format!("{} values", self.sample_ids.len()),
                got: format!("{} values", values.len()),
            });
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    /// Get sample IDs
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get number of samples
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get the values of a column
    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    /// Get a column or fail naming the missing column
    pub fn require_column(&self, name: &str) -> Result<&[String]> {
        self.column(name).ok_or_else(|| DiffExpError::InvalidPhenotype {
            reason: format!("column '{}' not found", name),
        })
    }

    /// Get all column names (sorted)
    pub fn column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.columns.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get row index by sample ID
    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.lookup.get(sample_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PhenotypeTable {
        let mut pheno = PhenotypeTable::new(vec![
            "s1".to_string(),
            "s2".to_string(),
            "s3".to_string(),
        ])
        .unwrap();
        pheno
            .add_column(
                "sample_type",
                vec!["Tumor".to_string(), "Normal".to_string(), "Tumor".to_string()],
            )
            .unwrap();
        pheno
    }

    #[test]
    fn test_column_lookup() {
        let pheno = table();
        assert_eq!(pheno.column("sample_type").unwrap()[1], "Normal");
        assert_eq!(pheno.sample_index("s3"), Some(2));
        assert!(pheno.require_column("batch").is_err());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut pheno = table();
        assert!(pheno.add_column("batch", vec!["b1".to_string()]).is_err());
    }

    #[test]
    fn test_duplicate_samples_rejected() {
        let result = PhenotypeTable::new(vec!["s1".to_string(), "s1".to_string()]);
        assert!(matches!(result, Err(DiffExpError::InvalidPhenotype { .. })));
    }
}
