//! Service configuration
//!
//! Every section has a `Default` matching the thresholds the service was
//! tuned with, so an empty (or missing) TOML file is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DiffExpError, Result};
use crate::filter::FilterThresholds;

/// Top-level configuration, one table per concern.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub analysis: AnalysisConfig,
    pub engine: EngineParams,
    pub mock: MockConfig,
    pub server: ServerConfig,
    pub data: DataConfig,
}

impl ServiceConfig {
    /// Load configuration from a TOML file, or use the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path)?;
                let config: ServiceConfig = toml::from_str(&text)?;
                log::info!("Loaded configuration from {}", path.display());
                config
            }
            None => ServiceConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;
        if a.group_column.trim().is_empty() {
            return Err(DiffExpError::Config {
                reason: "analysis.group_column must not be empty".to_string(),
            });
        }
        if a.min_group_size == 0 || a.min_informative_genes == 0 {
            return Err(DiffExpError::Config {
                reason: "analysis.min_group_size and analysis.min_informative_genes must be positive"
                    .to_string(),
            });
        }
        if a.strict.min_nonzero_per_group < a.lenient.min_nonzero_per_group
            || a.strict.min_total_counts < a.lenient.min_total_counts
        {
            return Err(DiffExpError::Config {
                reason: "strict filter thresholds must not be looser than the lenient ones"
                    .to_string(),
            });
        }
        if !(self.engine.alpha > 0.0 && self.engine.alpha < 1.0) {
            return Err(DiffExpError::Config {
                reason: format!("engine.alpha must lie in (0, 1), got {}", self.engine.alpha),
            });
        }
        if self.engine.min_disp <= 0.0 {
            return Err(DiffExpError::Config {
                reason: "engine.min_disp must be positive".to_string(),
            });
        }
        if self.mock.n_per_group == 0 {
            return Err(DiffExpError::Config {
                reason: "mock.n_per_group must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Thresholds for subsetting, filtering and the retry strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Phenotype column holding the condition label
    pub group_column: String,
    /// Minimum samples shared by counts and phenotype
    pub min_samples: usize,
    /// Minimum samples per condition group
    pub min_group_size: usize,
    /// Minimum genes that must survive a filtering pass
    pub min_informative_genes: usize,
    /// First-pass filter
    pub lenient: FilterThresholds,
    /// Filter applied before the single retry
    pub strict: FilterThresholds,
    /// Worker threads handed to the statistical engine
    pub workers: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            group_column: "sample_type".to_string(),
            min_samples: 4,
            min_group_size: 2,
            min_informative_genes: 10,
            lenient: FilterThresholds::LENIENT,
            strict: FilterThresholds::STRICT,
            workers: 1,
        }
    }
}

/// Parameters of the built-in negative binomial engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Significance level targeted by independent filtering
    pub alpha: f64,
    /// Lower bound for dispersion estimates
    pub min_disp: f64,
    /// Maximum IRLS iterations per gene
    pub max_irls_iter: usize,
    /// Relative deviance change treated as convergence
    pub beta_tol: f64,
    /// Blank p-values of genes with Cook's distance outliers
    pub cooks_filter: bool,
    /// Optimise a base-mean threshold before BH adjustment
    pub independent_filtering: bool,
    /// Genes this many prior SDs above the trend keep their gene-wise dispersion
    pub outlier_sd: f64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            min_disp: 1e-8,
            max_irls_iter: 100,
            beta_tol: 1e-8,
            cooks_filter: true,
            independent_filtering: true,
            outlier_sd: 2.0,
        }
    }
}

/// Synthetic dataset settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Samples generated for each condition
    pub n_per_group: usize,
    /// Mock genes added around the requested ones
    pub pad_genes: usize,
    /// Base seed; each gene mixes in a hash of its id
    pub seed: u64,
    /// Fraction of genes simulated as differentially expressed
    pub de_fraction: f64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            n_per_group: 80,
            pad_genes: 1000,
            seed: 42,
            de_fraction: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Location of file-backed datasets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: Option<PathBuf>,
}
