//! Datasets stored as `<dir>/<dataset_id>/{counts,phenotype}.tsv`

use std::path::{Path, PathBuf};

use super::{DataProvider, LoadedDataset};
use crate::error::{DiffExpError, Result};
use crate::io::{read_count_matrix, read_phenotype};

pub const COUNTS_FILE: &str = "counts.tsv";
pub const PHENOTYPE_FILE: &str = "phenotype.tsv";

#[derive(Debug, Clone)]
pub struct FileDataProvider {
    root: PathBuf,
    group_column: String,
}

impl FileDataProvider {
    pub fn new<P: AsRef<Path>>(root: P, group_column: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            group_column: group_column.to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a dataset; ids that could escape the root are rejected
    fn dataset_dir(&self, dataset_id: &str) -> Result<PathBuf> {
        let unsafe_id = dataset_id.is_empty()
            || dataset_id.contains(['/', '\\'])
            || dataset_id.contains("..")
            || dataset_id.starts_with('.');
        if unsafe_id {
            return Err(DiffExpError::UnknownDataset {
                dataset_id: dataset_id.to_string(),
                reason: "dataset ids may not contain path separators".to_string(),
            });
        }

        let dir = self.root.join(dataset_id);
        if !dir.join(COUNTS_FILE).is_file() || !dir.join(PHENOTYPE_FILE).is_file() {
            return Err(DiffExpError::UnknownDataset {
                dataset_id: dataset_id.to_string(),
                reason: format!("no {} and {} under {}", COUNTS_FILE, PHENOTYPE_FILE, dir.display()),
            });
        }
        Ok(dir)
    }
}

impl DataProvider for FileDataProvider {
    fn load(&self, dataset_id: &str, genes: &[String], _condition_a: &str, _condition_b: &str) -> Result<LoadedDataset> {
        let dir = self.dataset_dir(dataset_id)?;
        let counts = read_count_matrix(dir.join(COUNTS_FILE))?;
        let phenotype = read_phenotype(dir.join(PHENOTYPE_FILE))?;
        phenotype.require_column(&self.group_column)?;

        log::info!(
            "Loaded dataset '{}': {} genes x {} samples",
            dataset_id,
            counts.n_genes(),
            counts.n_samples()
        );
        Ok(LoadedDataset {
            counts,
            phenotype,
            analysis_genes: genes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CountMatrix, PhenotypeTable};
    use crate::io::write_dataset;
    use ndarray::array;
    use tempfile::tempdir;

    fn write_fixture(root: &Path) {
        let counts = CountMatrix::new(
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            vec!["g1".into(), "g2".into()],
            vec!["s1".into(), "s2".into(), "s3".into()],
        )
        .unwrap();
        let mut phenotype = PhenotypeTable::new(vec!["s1".into(), "s2".into(), "s3".into()]).unwrap();
        phenotype
            .add_column("sample_type", vec!["T".into(), "N".into(), "T".into()])
            .unwrap();
        write_dataset(root.join("BRCA"), &counts, &phenotype, "sample_type").unwrap();
    }

    #[test]
    fn test_loads_dataset_directory() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path());
        let provider = FileDataProvider::new(dir.path(), "sample_type");
        let data = provider.load("BRCA", &["g2".to_string()], "T", "N").unwrap();
        assert_eq!(data.counts.n_genes(), 2);
        assert_eq!(data.analysis_genes, vec!["g2".to_string()]);
    }

    #[test]
    fn test_rejects_traversal() {
        let dir = tempdir().unwrap();
        let provider = FileDataProvider::new(dir.path(), "sample_type");
        for id in ["../etc", "a/b", "..", ".hidden"] {
            assert!(matches!(
                provider.load(id, &[], "T", "N"),
                Err(DiffExpError::UnknownDataset { .. })
            ));
        }
    }

    #[test]
    fn test_missing_dataset() {
        let dir = tempdir().unwrap();
        let provider = FileDataProvider::new(dir.path(), "sample_type");
        assert!(matches!(
            provider.load("LUAD", &[], "T", "N"),
            Err(DiffExpError::UnknownDataset { .. })
        ));
    }

    #[test]
    fn test_missing_group_column() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path());
        let provider = FileDataProvider::new(dir.path(), "tissue");
        assert!(provider.load("BRCA", &[], "T", "N").is_err());
    }
}
