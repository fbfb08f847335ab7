//! Differential expression results and the response shape

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::data::Condition;

/// Per-gene statistics from the engine, stored column-wise.
///
/// NaN marks values the engine could not estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct ContrastResults {
    pub gene_ids: Vec<String>,
    /// Mean of normalized counts across all samples
    pub base_means: Vec<f64>,
    pub log2_fold_changes: Vec<f64>,
    /// Standard error of log2 fold change
    pub lfc_se: Vec<f64>,
    /// Wald statistic
    pub stat: Vec<f64>,
    pub pvalues: Vec<f64>,
    /// Adjusted p-values (BH corrected)
    pub padj: Vec<f64>,
    pub numerator: Condition,
    pub denominator: Condition,
}

impl ContrastResults {
    /// All-NaN results for the given genes
    pub fn new(gene_ids: Vec<String>, numerator: Condition, denominator: Condition) -> Self {
        let n = gene_ids.len();
        Self {
            gene_ids,
            base_means: vec![f64::NAN; n],
            log2_fold_changes: vec![f64::NAN; n],
            lfc_se: vec![f64::NAN; n],
            stat: vec![f64::NAN; n],
            pvalues: vec![f64::NAN; n],
            padj: vec![f64::NAN; n],
            numerator,
            denominator,
        }
    }

    pub fn n_genes(&self) -> usize {
        self.gene_ids.len()
    }

    /// Keep only the rows whose gene is in `genes`, in the current order
    pub fn restrict_to(&self, genes: &[String]) -> ContrastResults {
        let keep: Vec<usize> = self
            .gene_ids
            .iter()
            .enumerate()
            .filter(|(_, g)| genes.contains(g))
            .map(|(i, _)| i)
            .collect();
        let pick = |col: &[f64]| keep.iter().map(|&i| col[i]).collect::<Vec<f64>>();
        ContrastResults {
            gene_ids: keep.iter().map(|&i| self.gene_ids[i].clone()).collect(),
            base_means: pick(&self.base_means),
            log2_fold_changes: pick(&self.log2_fold_changes),
            lfc_se: pick(&self.lfc_se),
            stat: pick(&self.stat),
            pvalues: pick(&self.pvalues),
            padj: pick(&self.padj),
            numerator: self.numerator,
            denominator: self.denominator,
        }
    }

    /// Row of one gene, with NaN turned into absent values
    pub fn row(&self, i: usize) -> GeneStatRow {
        let finite = |v: f64| if v.is_nan() { None } else { Some(v) };
        GeneStatRow {
            gene_id: self.gene_ids[i].clone(),
            log2_fold_change: finite(self.log2_fold_changes[i]),
            pvalue: finite(self.pvalues[i]),
            padj: finite(self.padj[i]),
            base_mean: finite(self.base_means[i]),
            stat: finite(self.stat[i]),
        }
    }

    /// Gene id to row index
    pub fn index(&self) -> HashMap<&str, usize> {
        self.gene_ids
            .iter()
            .enumerate()
            .map(|(i, g)| (g.as_str(), i))
            .collect()
    }

    pub fn summary(&self, alpha: f64) -> ResultsSummary {
        let significant: Vec<usize> = (0..self.n_genes()).filter(|&i| self.padj[i] < alpha).collect();
        ResultsSummary {
            total_genes: self.n_genes(),
            genes_tested: self.pvalues.iter().filter(|p| p.is_finite()).count(),
            significant: significant.len(),
            upregulated: significant.iter().filter(|&&i| self.log2_fold_changes[i] > 0.0).count(),
            downregulated: significant.iter().filter(|&&i| self.log2_fold_changes[i] < 0.0).count(),
            alpha,
        }
    }
}

/// Summary of one contrast
#[derive(Debug, Clone)]
pub struct ResultsSummary {
    pub total_genes: usize,
    pub genes_tested: usize,
    pub significant: usize,
    pub upregulated: usize,
    pub downregulated: usize,
    pub alpha: f64,
}

impl std::fmt::Display for ResultsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} genes, {} tested, {} with padj < {} ({} up, {} down)",
            self.total_genes,
            self.genes_tested,
            self.significant,
            self.alpha,
            self.upregulated,
            self.downregulated
        )
    }
}

/// One gene of the response; every statistic is optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneStatRow {
    pub gene_id: String,
    pub log2_fold_change: Option<f64>,
    pub pvalue: Option<f64>,
    pub padj: Option<f64>,
    pub base_mean: Option<f64>,
    pub stat: Option<f64>,
}

impl GeneStatRow {
    /// Row with every statistic absent
    pub fn absent(gene_id: &str) -> Self {
        Self {
            gene_id: gene_id.to_string(),
            log2_fold_change: None,
            pvalue: None,
            padj: None,
            base_mean: None,
            stat: None,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.log2_fold_change.is_none()
            && self.pvalue.is_none()
            && self.padj.is_none()
            && self.base_mean.is_none()
            && self.stat.is_none()
    }
}

/// Final response of one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub dataset_id: String,
    pub condition_a: String,
    pub condition_b: String,
    /// Samples per original condition label
    pub sample_counts: BTreeMap<String, usize>,
    pub results: Vec<GeneStatRow>,
}
