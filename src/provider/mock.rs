//! Synthetic negative binomial dataset

use std::collections::HashSet;
use std::hash::Hasher;

use ndarray::Array2;

use super::{DataProvider, LoadedDataset};
use crate::config::MockConfig;
use crate::data::{CountMatrix, PhenotypeTable};
use crate::error::{DiffExpError, Result};
use crate::rng::MersenneTwister;

/// Dataset id served by the mock provider (matched case-insensitively)
pub const MOCK_DATASET_ID: &str = "MOCK";

/// Size of the fixed mock gene list
pub const MOCK_GENE_POOL: usize = 5000;

/// The first `n` ids of the mock gene list (at most [`MOCK_GENE_POOL`])
pub fn mock_gene_ids(n: usize) -> Vec<String> {
    (1..=n.min(MOCK_GENE_POOL))
        .map(|i| format!("ENSG{:011}", 100_000 + i))
        .collect()
}

fn gene_seed(seed: u64, gene_id: &str) -> u64 {
    let mut hasher = fnv::FnvHasher::default();
    hasher.write(gene_id.as_bytes());
    seed ^ hasher.finish()
}

/// Mock data with `n_per_group` samples of each condition
#[derive(Debug, Clone)]
pub struct MockDataProvider {
    config: MockConfig,
    group_column: String,
}

impl MockDataProvider {
    pub fn new(config: MockConfig, group_column: &str) -> Self {
        Self {
            config,
            group_column: group_column.to_string(),
        }
    }

    /// Mock padding first, then requested genes not already in it
    pub fn padded_genes(&self, genes: &[String]) -> Vec<String> {
        let mut padded = mock_gene_ids(self.config.pad_genes);
        let mut seen: HashSet<String> = padded.iter().cloned().collect();
        for gene in genes {
            if seen.insert(gene.clone()) {
                padded.push(gene.clone());
            }
        }
        padded
    }

    /// Generate counts for `genes` and a phenotype labelling the first half
    /// of the samples `condition_a` and the second half `condition_b`.
    ///
    /// A gene's counts depend only on the seed and its own id.
    pub fn generate(&self, genes: &[String], condition_a: &str, condition_b: &str) -> Result<(CountMatrix, PhenotypeTable)> {
        let n_per_group = self.config.n_per_group;
        let n_samples = 2 * n_per_group;

        let mut sample_rng = MersenneTwister::from_u64(self.config.seed);
        let size_factors: Vec<f64> = (0..n_samples).map(|_| (0.25 * sample_rng.rnorm()).exp()).collect();

        let mut counts = Array2::zeros((genes.len(), n_samples));
        let mut n_de = 0;
        for (i, gene) in genes.iter().enumerate() {
            let mut rng = MersenneTwister::from_u64(gene_seed(self.config.seed, gene));
            let base_mean = (100f64.ln() + 1.5 * rng.rnorm()).exp();
            let dispersion = 0.05 + 1.0 / base_mean;

            let lfc = if rng.runif() < self.config.de_fraction {
                n_de += 1;
                let magnitude = 1.0 + 2.0 * rng.runif();
                if rng.runif() < 0.5 {
                    magnitude
                } else {
                    -magnitude
                }
            } else {
                0.0
            };

            for (j, sf) in size_factors.iter().enumerate() {
                let group_mean = if j < n_per_group { base_mean * lfc.exp2() } else { base_mean };
                counts[[i, j]] = rng.rnbinom(sf * group_mean, dispersion) as f64;
            }
        }

        let sample_ids: Vec<String> = (1..=n_samples).map(|j| format!("MOCK_S{:04}", j)).collect();
        let groups = (0..n_samples)
            .map(|j| (if j < n_per_group { condition_a } else { condition_b }).to_string())
            .collect();
        let mut phenotype = PhenotypeTable::new(sample_ids.clone())?;
        phenotype.add_column(&self.group_column, groups)?;

        log::debug!(
            "Mock dataset: {} genes ({} differential) x {} samples",
            genes.len(),
            n_de,
            n_samples
        );
        Ok((CountMatrix::new(counts, genes.to_vec(), sample_ids)?, phenotype))
    }
}

impl DataProvider for MockDataProvider {
    fn load(&self, dataset_id: &str, genes: &[String], condition_a: &str, condition_b: &str) -> Result<LoadedDataset> {
        if !dataset_id.eq_ignore_ascii_case(MOCK_DATASET_ID) {
            return Err(DiffExpError::UnknownDataset {
                dataset_id: dataset_id.to_string(),
                reason: format!("the mock provider only serves '{}'", MOCK_DATASET_ID),
            });
        }

        let analysis_genes = self.padded_genes(genes);
        let (counts, phenotype) = self.generate(&analysis_genes, condition_a, condition_b)?;
        Ok(LoadedDataset {
            counts,
            phenotype,
            analysis_genes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(pad_genes: usize) -> MockDataProvider {
        MockDataProvider::new(
            MockConfig {
                n_per_group: 6,
                pad_genes,
                ..MockConfig::default()
            },
            "sample_type",
        )
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_padding_is_union() {
        let mock = provider(3);
        let first = mock_gene_ids(1).remove(0);
        let padded = mock.padded_genes(&[first.clone(), "TP53".to_string(), "TP53".to_string()]);
        assert_eq!(padded.len(), 4);
        assert_eq!(padded[0], first);
        assert_eq!(padded[3], "TP53");
    }

    #[test]
    fn test_pool_caps_padding() {
        assert_eq!(mock_gene_ids(MOCK_GENE_POOL + 10).len(), MOCK_GENE_POOL);
    }

    #[test]
    fn test_gene_counts_independent_of_other_genes() {
        let mock = provider(0);
        let (alone, _) = mock.generate(&strings(&["g7"]), "T", "N").unwrap();
        let (together, _) = mock.generate(&strings(&["g1", "g7", "g9"]), "T", "N").unwrap();
        assert_eq!(alone.gene_counts(0), together.gene_counts(1));
    }

    #[test]
    fn test_phenotype_layout() {
        let mock = provider(0);
        let data = mock.load("mock", &strings(&["g1", "g2"]), "Primary Tumor", "Normal").unwrap();
        assert_eq!(data.counts.n_samples(), 12);
        let groups = data.phenotype.column("sample_type").unwrap();
        assert_eq!(groups.iter().filter(|g| *g == "Primary Tumor").count(), 6);
        assert_eq!(groups[11], "Normal");
        assert_eq!(data.analysis_genes, strings(&["g1", "g2"]));
    }

    #[test]
    fn test_rejects_other_ids() {
        let mock = provider(0);
        assert!(matches!(
            mock.load("TCGA-BRCA", &strings(&["g1"]), "T", "N"),
            Err(DiffExpError::UnknownDataset { .. })
        ));
    }
}
