//! Error types for rust_diffexp

use thiserror::Error;

use crate::pipeline::FitStage;

/// Main error type for differential expression requests
#[derive(Error, Debug)]
pub enum DiffExpError {
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Not enough overlapping samples between counts and phenotype ({found} found, {required} required).")]
    InsufficientSamples { found: usize, required: usize },

    #[error("No samples match the requested conditions ('{condition_a}', '{condition_b}').")]
    NoMatchingConditions {
        condition_a: String,
        condition_b: String,
    },

    #[error("None of the {requested} requested genes were found in the counts matrix.")]
    NoGenesFound { requested: usize },

    #[error("Too few samples per group (A={n_a}, B={n_b}); at least {required} per group are required.")]
    InsufficientGroupSize {
        n_a: usize,
        n_b: usize,
        required: usize,
    },

    #[error("Too few informative genes after {stage} filtering ({found}, need at least {required}). Add more genes or widen your selection.")]
    TooFewInformativeGenes {
        stage: FitStage,
        found: usize,
        required: usize,
    },

    #[error("DE failed even after stricter filtering: {reason}")]
    FitFailed { reason: String },

    #[error("Unknown dataset '{dataset_id}': {reason}")]
    UnknownDataset { dataset_id: String, reason: String },

    #[error("Invalid count matrix: {reason}")]
    InvalidCountMatrix { reason: String },

    #[error("Invalid phenotype table: {reason}")]
    InvalidPhenotype { reason: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl DiffExpError {
    /// Whether the error describes a malformed or unsatisfiable request
    /// rather than a server-side fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DiffExpError::InvalidRequest { .. }
                | DiffExpError::InsufficientSamples { .. }
                | DiffExpError::NoMatchingConditions { .. }
                | DiffExpError::NoGenesFound { .. }
                | DiffExpError::InsufficientGroupSize { .. }
                | DiffExpError::TooFewInformativeGenes { .. }
                | DiffExpError::FitFailed { .. }
                | DiffExpError::UnknownDataset { .. }
                | DiffExpError::InvalidCountMatrix { .. }
                | DiffExpError::InvalidPhenotype { .. }
        )
    }
}

/// Failures raised by the statistical engine while fitting or testing.
///
/// These never leave the fit orchestrator directly; a failed attempt either
/// escalates to the strict retry or is reported as [`DiffExpError::FitFailed`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("no replicates: {n_samples} samples for {n_coefs} coefficients")]
    NoReplicates { n_samples: usize, n_coefs: usize },

    #[error("empty input: {reason}")]
    EmptyInput { reason: String },

    #[error("size factor estimation failed: {reason}")]
    SizeFactors { reason: String },

    #[error("all gene-wise dispersion estimates are within 2 orders of magnitude from the minimum value ({min_disp:e})")]
    DegenerateDispersions { min_disp: f64 },

    #[error("dispersion trend fit failed: {reason}")]
    TrendFit { reason: String },

    #[error("non-finite value in {stage}")]
    NonFinite { stage: String },

    #[error("invalid contrast: {reason}")]
    InvalidContrast { reason: String },

    #[error("could not start {workers} worker threads: {reason}")]
    WorkerPool { workers: usize, reason: String },
}

/// Result type alias for rust_diffexp operations
pub type Result<T> = std::result::Result<T, DiffExpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_size_message_reports_both_counts() {
        let err = DiffExpError::InsufficientGroupSize {
            n_a: 5,
            n_b: 1,
            required: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("A=5"));
        assert!(msg.contains("B=1"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_io_errors_are_server_side() {
        let err: DiffExpError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert!(!err.is_client_error());
    }
}
