//! rust_diffexp: differential expression over RNA-seq counts
//!
//! Given a dataset, two condition labels and a gene list, the crate subsets
//! the counts to the two groups, keeps informative genes, fits a
//! DESeq2-style negative binomial model (retrying once with stricter
//! filtering when the fit fails) and reports per-gene statistics in the
//! caller's gene order.
//!
//! # Example
//!
//! ```ignore
//! use rust_diffexp::prelude::*;
//!
//! let service = DiffExpService::from_config(&ServiceConfig::default());
//! let result = service.analyze(&DiffExpRequest {
//!     dataset_id: "MOCK".into(),
//!     gene_ids: vec!["ENSG00000141510".into()],
//!     condition_a: "Primary Tumor".into(),
//!     condition_b: "Solid Tissue Normal".into(),
//! })?;
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod dispersion;
pub mod engine;
pub mod error;
pub mod filter;
pub mod glm;
pub mod io;
pub mod normalization;
pub mod pipeline;
pub mod provider;
pub mod rng;
pub mod server;
pub mod service;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{AnalysisConfig, EngineParams, MockConfig, ServiceConfig};
    pub use crate::data::{build_subset, Condition, ConditionLabels, CountMatrix, DesignCounts, DesignTable, PhenotypeTable};
    pub use crate::engine::{NbGlmEngine, NbGlmFit, StatisticalEngine};
    pub use crate::error::{DiffExpError, EngineError, Result};
    pub use crate::filter::{filter_informative, FilterThresholds};
    pub use crate::io::{
        read_count_matrix, read_phenotype, write_dataset, write_json, write_results, AnalysisResult,
        ContrastResults, GeneStatRow,
    };
    pub use crate::pipeline::{assemble, reconcile, run_differential_expression, run_pipeline, FitOutcome, FitStage};
    pub use crate::provider::{DataProvider, DatasetCatalog, FileDataProvider, LoadedDataset, MockDataProvider, MOCK_DATASET_ID};
    pub use crate::service::{DiffExpRequest, DiffExpService};
}
