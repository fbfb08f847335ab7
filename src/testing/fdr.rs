//! Benjamini-Hochberg false discovery rate adjustment

/// Adjust p-values with the Benjamini-Hochberg step-up procedure.
///
/// NaN p-values stay NaN and do not count toward the number of tests.
pub fn benjamini_hochberg(pvalues: &[f64]) -> Vec<f64> {
    let mut ranked: Vec<usize> = (0..pvalues.len()).filter(|&i| !pvalues[i].is_nan()).collect();
    let m = ranked.len();
    let mut padj = vec![f64::NAN; pvalues.len()];
    if m == 0 {
        return padj;
    }

    ranked.sort_by(|&a, &b| pvalues[a].total_cmp(&pvalues[b]));

    let mut cummin = f64::INFINITY;
    for (rank, &i) in ranked.iter().enumerate().rev() {
        let adj = (pvalues[i] * m as f64 / (rank + 1) as f64).min(1.0);
        cummin = cummin.min(adj);
        padj[i] = cummin;
    }
    padj
}
