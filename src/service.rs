//! Request handling shared by the HTTP server and the CLI

use std::collections::HashSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::{AnalysisConfig, ServiceConfig};
use crate::engine::{NbGlmEngine, StatisticalEngine};
use crate::error::{DiffExpError, Result};
use crate::io::AnalysisResult;
use crate::pipeline::run_pipeline;
use crate::provider::{DataProvider, DatasetCatalog};

/// Body of `POST /diffexp`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffExpRequest {
    pub dataset_id: String,
    pub gene_ids: Vec<String>,
    pub condition_a: String,
    pub condition_b: String,
}

impl DiffExpRequest {
    /// Trimmed copy with empty and repeated gene ids removed
    pub fn validate(&self) -> Result<DiffExpRequest> {
        let mut seen = HashSet::new();
        let gene_ids: Vec<String> = self
            .gene_ids
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty() && seen.insert(*g))
            .map(String::from)
            .collect();

        let cleaned = DiffExpRequest {
            dataset_id: self.dataset_id.trim().to_string(),
            gene_ids,
            condition_a: self.condition_a.trim().to_string(),
            condition_b: self.condition_b.trim().to_string(),
        };

        if cleaned.dataset_id.is_empty()
            || cleaned.gene_ids.is_empty()
            || cleaned.condition_a.is_empty()
            || cleaned.condition_b.is_empty()
        {
            return Err(DiffExpError::InvalidRequest {
                reason: "Missing required fields.".to_string(),
            });
        }
        Ok(cleaned)
    }
}

/// A data provider and an engine behind one `analyze` call
pub struct DiffExpService<P, E> {
    provider: P,
    engine: E,
    config: AnalysisConfig,
}

impl DiffExpService<DatasetCatalog, NbGlmEngine> {
    /// Catalog and built-in engine as configured
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            DatasetCatalog::from_config(config),
            NbGlmEngine::new(config.engine.clone()),
            config.analysis.clone(),
        )
    }
}

impl<P: DataProvider, E: StatisticalEngine> DiffExpService<P, E> {
    pub fn new(provider: P, engine: E, config: AnalysisConfig) -> Self {
        Self {
            provider,
            engine,
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Validate, load, and run the pipeline for one request
    pub fn analyze(&self, request: &DiffExpRequest) -> Result<AnalysisResult> {
        let start = Instant::now();
        let request = request.validate()?;
        log::info!(
            "Request: dataset '{}', {} genes, '{}' vs '{}'",
            request.dataset_id,
            request.gene_ids.len(),
            request.condition_a,
            request.condition_b
        );

        let data = self.provider.load(
            &request.dataset_id,
            &request.gene_ids,
            &request.condition_a,
            &request.condition_b,
        )?;
        let result = run_pipeline(
            &data.counts,
            &data.phenotype,
            &data.analysis_genes,
            &request,
            &self.engine,
            &self.config,
        );

        match &result {
            Ok(res) => log::info!(
                "Request for '{}' finished in {:.2?}: {} result rows",
                request.dataset_id,
                start.elapsed(),
                res.results.len()
            ),
            Err(e) => log::warn!(
                "Request for '{}' failed after {:.2?}: {}",
                request.dataset_id,
                start.elapsed(),
                e
            ),
        }
        result
    }
}
