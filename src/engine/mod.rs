//! Statistical engine: the seam the fit orchestrator calls through, and the
//! built-in negative binomial GLM implementation

use crate::config::EngineParams;
use crate::data::{Condition, DesignCounts, DesignTable};
use crate::dispersion::{estimate_dispersions, DispersionEstimates, DispersionParams};
use crate::error::EngineError;
use crate::filter::{default_cooks_cutoff, flag_cooks_outliers, independent_filtering};
use crate::glm::{fit_glm, GeneFit, GlmFitParams};
use crate::io::ContrastResults;
use crate::normalization::{estimate_size_factors, SizeFactorMethod};
use crate::testing::{benjamini_hochberg, wald_test};

/// A fitting engine for the single two-level design `~ condition`.
///
/// `fit` takes integer counts (samples x genes) and fails on inputs it
/// cannot model. `contrast` reports per-gene statistics for `numerator`
/// over `denominator`, using NaN for anything it could not estimate.
pub trait StatisticalEngine: Send + Sync {
    type Fit;

    fn fit(&self, counts: &DesignCounts, design: &DesignTable, workers: usize) -> Result<Self::Fit, EngineError>;

    fn contrast(
        &self,
        fit: &Self::Fit,
        numerator: Condition,
        denominator: Condition,
    ) -> Result<ContrastResults, EngineError>;
}

/// Fitted state of [`NbGlmEngine`]
#[derive(Debug, Clone)]
pub struct NbGlmFit {
    pub gene_ids: Vec<String>,
    pub size_factors: Vec<f64>,
    pub dispersions: DispersionEstimates,
    pub fits: Vec<GeneFit>,
    /// Genes with a Cook's distance outlier
    pub cooks_outliers: Vec<bool>,
}

/// DESeq2-style engine: median-of-ratios size factors, shrunken
/// dispersions, per-gene IRLS and Wald tests.
#[derive(Debug, Clone, Default)]
pub struct NbGlmEngine {
    params: EngineParams,
}

impl NbGlmEngine {
    pub fn new(params: EngineParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    fn fit_in_pool(&self, counts: &DesignCounts, design: &DesignTable) -> Result<NbGlmFit, EngineError> {
        let size_factors = match estimate_size_factors(counts.counts(), SizeFactorMethod::Ratio) {
            Ok(sf) => sf,
            Err(e) => {
                log::warn!("{}; falling back to positive-count size factors", e);
                estimate_size_factors(counts.counts(), SizeFactorMethod::PosCounts)?
            }
        };
        let size_factors = size_factors.to_vec();
        log::debug!("Size factors: {:?}", size_factors);

        let in_a: Vec<bool> = design.conditions().iter().map(|&c| c == Condition::A).collect();
        let columns: Vec<Vec<f64>> = (0..counts.n_genes()).map(|j| counts.gene_column(j).to_vec()).collect();

        let disp_params = DispersionParams {
            min_disp: self.params.min_disp,
            outlier_sd: self.params.outlier_sd,
            ..DispersionParams::default()
        };
        let dispersions = estimate_dispersions(&columns, &in_a, &size_factors, &disp_params)?;
        log::debug!(
            "Dispersions: trend {:?}, prior variance {:.4}",
            dispersions.trend,
            dispersions.prior_var
        );

        let glm_params = GlmFitParams {
            maxit: self.params.max_irls_iter,
            beta_tol: self.params.beta_tol,
        };
        let fits = fit_glm(&columns, &in_a, &size_factors, &dispersions.map, &glm_params);

        let cooks_outliers = if self.params.cooks_filter {
            let cutoff = default_cooks_cutoff(counts.n_samples(), 2);
            flag_cooks_outliers(&columns, &fits, &dispersions.map, &in_a, cutoff)
        } else {
            vec![false; columns.len()]
        };

        Ok(NbGlmFit {
            gene_ids: counts.gene_ids().to_vec(),
            size_factors,
            dispersions,
            fits,
            cooks_outliers,
        })
    }
}

impl StatisticalEngine for NbGlmEngine {
    type Fit = NbGlmFit;

    fn fit(&self, counts: &DesignCounts, design: &DesignTable, workers: usize) -> Result<NbGlmFit, EngineError> {
        if counts.n_genes() == 0 {
            return Err(EngineError::EmptyInput {
                reason: "no genes to fit".to_string(),
            });
        }
        if counts.n_samples() != design.n_samples() {
            return Err(EngineError::EmptyInput {
                reason: format!(
                    "{} count rows for {} design samples",
                    counts.n_samples(),
                    design.n_samples()
                ),
            });
        }

        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| EngineError::WorkerPool {
                workers,
                reason: e.to_string(),
            })?;

        log::info!(
            "Fitting {} genes x {} samples with {} worker(s)",
            counts.n_genes(),
            counts.n_samples(),
            workers
        );
        pool.install(|| self.fit_in_pool(counts, design))
    }

    fn contrast(
        &self,
        fit: &NbGlmFit,
        numerator: Condition,
        denominator: Condition,
    ) -> Result<ContrastResults, EngineError> {
        if numerator == denominator {
            return Err(EngineError::InvalidContrast {
                reason: format!("numerator and denominator are both '{}'", numerator),
            });
        }

        let sign = if numerator == Condition::A { 1.0 } else { -1.0 };
        let base_means = &fit.dispersions.base_means;
        let wald = wald_test(&fit.fits, base_means, sign);

        let pvalues: Vec<f64> = wald
            .pvalues
            .iter()
            .zip(&fit.cooks_outliers)
            .map(|(&p, &outlier)| if outlier { f64::NAN } else { p })
            .collect();

        let padj = if self.params.independent_filtering {
            independent_filtering(base_means, &pvalues, self.params.alpha).padj
        } else {
            benjamini_hochberg(&pvalues)
        };

        let results = ContrastResults {
            gene_ids: fit.gene_ids.clone(),
            base_means: base_means.clone(),
            log2_fold_changes: wald.log2_fold_changes,
            lfc_se: wald.lfc_se,
            stat: wald.stats,
            pvalues,
            padj,
            numerator,
            denominator,
        };
        log::info!("{} vs {}: {}", numerator, denominator, results.summary(self.params.alpha));
        Ok(results)
    }
}
