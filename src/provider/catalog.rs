//! Dataset id routing

use super::{DataProvider, FileDataProvider, LoadedDataset, MockDataProvider, MOCK_DATASET_ID};
use crate::config::ServiceConfig;
use crate::error::{DiffExpError, Result};

/// `MOCK` goes to the mock generator; anything else to the data directory
/// when one is configured.
#[derive(Debug, Clone)]
pub struct DatasetCatalog {
    mock: MockDataProvider,
    files: Option<FileDataProvider>,
}

impl DatasetCatalog {
    pub fn new(mock: MockDataProvider, files: Option<FileDataProvider>) -> Self {
        Self { mock, files }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        let group_column = &config.analysis.group_column;
        Self::new(
            MockDataProvider::new(config.mock.clone(), group_column),
            config
                .data
                .dir
                .as_ref()
                .map(|dir| FileDataProvider::new(dir, group_column)),
        )
    }

    pub fn mock(&self) -> &MockDataProvider {
        &self.mock
    }
}

impl DataProvider for DatasetCatalog {
    fn load(&self, dataset_id: &str, genes: &[String], condition_a: &str, condition_b: &str) -> Result<LoadedDataset> {
        if dataset_id.eq_ignore_ascii_case(MOCK_DATASET_ID) {
            return self.mock.load(dataset_id, genes, condition_a, condition_b);
        }
        match &self.files {
            Some(files) => files.load(dataset_id, genes, condition_a, condition_b),
            None => Err(DiffExpError::UnknownDataset {
                dataset_id: dataset_id.to_string(),
                reason: "Only MOCK mode is enabled. Use datasetId='MOCK'.".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_mock_only_without_data_dir() {
        let catalog = DatasetCatalog::from_config(&ServiceConfig::default());
        let err = catalog.load("TCGA-BRCA", &["g1".to_string()], "T", "N").unwrap_err();
        assert!(err.to_string().contains("Only MOCK mode is enabled"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_routes_to_files_when_configured() {
        let mut config = ServiceConfig::default();
        config.data.dir = Some(PathBuf::from("/nonexistent"));
        let catalog = DatasetCatalog::from_config(&config);
        let err = catalog.load("LUAD", &[], "T", "N").unwrap_err();
        assert!(!err.to_string().contains("Only MOCK mode"));
    }
}
