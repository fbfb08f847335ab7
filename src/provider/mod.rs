//! Data provisioning: where counts and phenotype for a dataset id come from

mod catalog;
mod files;
mod mock;

pub use catalog::DatasetCatalog;
pub use files::FileDataProvider;
pub use mock::{mock_gene_ids, MockDataProvider, MOCK_DATASET_ID, MOCK_GENE_POOL};

use crate::data::{CountMatrix, PhenotypeTable};
use crate::error::Result;

/// Counts and phenotype of one dataset, plus the genes to subset on
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    /// Genes x samples
    pub counts: CountMatrix,
    pub phenotype: PhenotypeTable,
    /// Gene universe handed to the subset builder; may be wider than the request
    pub analysis_genes: Vec<String>,
}

/// Source of datasets addressed by id.
///
/// Implementations must be usable from several requests at once.
pub trait DataProvider: Send + Sync {
    fn load(
        &self,
        dataset_id: &str,
        genes: &[String],
        condition_a: &str,
        condition_b: &str,
    ) -> Result<LoadedDataset>;
}
