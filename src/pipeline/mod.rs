//! Analysis pipeline: subset, fit with strict retry, reconcile, assemble
//!
//! Each call runs the stages strictly in sequence on its own matrices; no
//! state is shared between calls.

mod assemble;
mod orchestrator;
mod reconcile;

pub use assemble::assemble;
pub use orchestrator::{run_differential_expression, FitOutcome, FittedGenes};
pub use reconcile::reconcile;

use std::collections::HashSet;
use std::fmt;

use crate::config::AnalysisConfig;
use crate::data::{build_subset, CountMatrix, PhenotypeTable};
use crate::engine::StatisticalEngine;
use crate::error::Result;
use crate::io::AnalysisResult;
use crate::service::DiffExpRequest;

/// Filtering pass a fit attempt ran on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStage {
    Lenient,
    Strict,
}

impl fmt::Display for FitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FitStage::Lenient => "lenient",
            FitStage::Strict => "strict",
        })
    }
}

/// Run one validated request against loaded data.
///
/// `analysis_genes` is the gene universe for subsetting; it may be wider
/// than the request (mock padding). The response lists the requested genes
/// present in the subset, in request order. Requested genes missing from
/// the counts matrix are dropped without a row.
pub fn run_pipeline<E: StatisticalEngine>(
    counts: &CountMatrix,
    phenotype: &PhenotypeTable,
    analysis_genes: &[String],
    request: &DiffExpRequest,
    engine: &E,
    config: &AnalysisConfig,
) -> Result<AnalysisResult> {
    let (design_counts, design) = build_subset(
        counts,
        phenotype,
        analysis_genes,
        &request.condition_a,
        &request.condition_b,
        config,
    )?;

    let fitted = run_differential_expression(&design_counts, &design, design.reference(), engine, config)
        .into_result()?;
    log::info!(
        "Fit succeeded after {} filtering on {} genes",
        fitted.stage,
        fitted.genes_used.len()
    );

    let in_subset: HashSet<&str> = design_counts.gene_ids().iter().map(String::as_str).collect();
    let (requested, unknown): (Vec<String>, Vec<String>) = request
        .gene_ids
        .iter()
        .cloned()
        .partition(|g| in_subset.contains(g.as_str()));
    if !unknown.is_empty() {
        log::warn!(
            "{} requested gene(s) not in the counts matrix were dropped: {}",
            unknown.len(),
            unknown.join(", ")
        );
    }

    let rows = reconcile(&fitted.results, &fitted.genes_used, &requested);
    Ok(assemble(
        &request.dataset_id,
        &request.condition_a,
        &request.condition_b,
        &design,
        rows,
    ))
}
