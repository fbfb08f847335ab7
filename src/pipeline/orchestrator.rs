//! Fit orchestration: lenient attempt, one strict retry, terminal failure

use super::FitStage;
use crate::config::AnalysisConfig;
use crate::data::{Condition, DesignCounts, DesignTable};
use crate::engine::StatisticalEngine;
use crate::error::{DiffExpError, EngineError, Result};
use crate::filter::filter_informative;
use crate::io::ContrastResults;

/// Statistics of a successful fit
#[derive(Debug, Clone)]
pub struct FittedGenes {
    /// Attempt that succeeded
    pub stage: FitStage,
    /// Genes in the matrix the engine fitted
    pub genes_used: Vec<String>,
    /// Contrast of the non-reference level over the reference, restricted to `genes_used`
    pub results: ContrastResults,
}

/// Tagged outcome of the two-attempt fit
#[derive(Debug)]
pub enum FitOutcome {
    Fitted(FittedGenes),
    Terminal(DiffExpError),
}

impl FitOutcome {
    pub fn into_result(self) -> Result<FittedGenes> {
        match self {
            FitOutcome::Fitted(fitted) => Ok(fitted),
            FitOutcome::Terminal(err) => Err(err),
        }
    }
}

/// Where the state machine stands before an engine call
enum Attempt {
    Lenient(DesignCounts),
    Strict {
        counts: DesignCounts,
        lenient_error: EngineError,
    },
}

impl Attempt {
    fn stage(&self) -> FitStage {
        match self {
            Attempt::Lenient(_) => FitStage::Lenient,
            Attempt::Strict { .. } => FitStage::Strict,
        }
    }

    fn counts(&self) -> &DesignCounts {
        match self {
            Attempt::Lenient(counts) | Attempt::Strict { counts, .. } => counts,
        }
    }
}

fn too_few(stage: FitStage, counts: &DesignCounts, config: &AnalysisConfig) -> Option<DiffExpError> {
    (counts.n_genes() < config.min_informative_genes).then(|| DiffExpError::TooFewInformativeGenes {
        stage,
        found: counts.n_genes(),
        required: config.min_informative_genes,
    })
}

/// Run the engine on the informative genes of `counts`.
///
/// Counts are rounded, then filtered with the lenient thresholds. If the
/// engine rejects the lenient matrix, the strict thresholds are applied to
/// it and the fit is retried exactly once. A retry failure is terminal.
pub fn run_differential_expression<E: StatisticalEngine>(
    counts: &DesignCounts,
    design: &DesignTable,
    reference: Condition,
    engine: &E,
    config: &AnalysisConfig,
) -> FitOutcome {
    let lenient = filter_informative(&counts.rounded(), design, &config.lenient);
    log::info!(
        "Lenient filter kept {} of {} genes",
        lenient.n_genes(),
        counts.n_genes()
    );
    if let Some(err) = too_few(FitStage::Lenient, &lenient, config) {
        return FitOutcome::Terminal(err);
    }

    let mut attempt = Attempt::Lenient(lenient);
    loop {
        let stage = attempt.stage();
        log::info!("Fit attempt ({}) on {} genes", stage, attempt.counts().n_genes());

        let error = match engine.fit(attempt.counts(), design, config.workers) {
            Ok(fit) => {
                let counts = attempt.counts();
                return match engine.contrast(&fit, reference.other(), reference) {
                    Ok(results) => {
                        let genes_used = counts.gene_ids().to_vec();
                        FitOutcome::Fitted(FittedGenes {
                            stage,
                            results: results.restrict_to(&genes_used),
                            genes_used,
                        })
                    }
                    Err(e) => FitOutcome::Terminal(DiffExpError::FitFailed {
                        reason: format!("contrast after {} fit: {}", stage, e),
                    }),
                };
            }
            Err(e) => e,
        };

        attempt = match attempt {
            Attempt::Lenient(lenient) => {
                log::warn!("Lenient fit failed ({}); retrying with strict filtering", error);
                let strict = filter_informative(&lenient, design, &config.strict);
                log::info!(
                    "Strict filter kept {} of {} genes",
                    strict.n_genes(),
                    lenient.n_genes()
                );
                if let Some(err) = too_few(FitStage::Strict, &strict, config) {
                    return FitOutcome::Terminal(err);
                }
                Attempt::Strict {
                    counts: strict,
                    lenient_error: error,
                }
            }
            Attempt::Strict { lenient_error, .. } => {
                log::warn!("Strict fit failed ({})", error);
                return FitOutcome::Terminal(DiffExpError::FitFailed {
                    reason: format!("{} (lenient attempt: {})", error, lenient_error),
                });
            }
        };
    }
}
