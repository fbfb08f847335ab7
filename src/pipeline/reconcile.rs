//! Reindex engine output to the caller's gene order

use std::collections::HashSet;

use crate::io::{ContrastResults, GeneStatRow};

/// One row per requested gene, in request order.
///
/// Rows come from `results` when the gene was part of the fitted set
/// `genes_used`; every other requested gene gets a row with all statistics
/// absent. NaN never reaches the output.
pub fn reconcile(results: &ContrastResults, genes_used: &[String], requested: &[String]) -> Vec<GeneStatRow> {
    let used: HashSet<&str> = genes_used.iter().map(String::as_str).collect();
    let index = results.index();

    requested
        .iter()
        .map(|gene| match index.get(gene.as_str()) {
            Some(&i) if used.contains(gene.as_str()) => results.row(i),
            _ => GeneStatRow::absent(gene),
        })
        .collect()
}
