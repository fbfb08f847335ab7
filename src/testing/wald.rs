//! Wald test for differential expression

use std::f64::consts::LN_2;

use super::pvalue::calculate_pvalue;
use crate::glm::GeneFit;

/// Per-gene Wald statistics for the group coefficient, on the log2 scale
#[derive(Debug, Clone, Default)]
pub struct WaldStatistics {
    pub log2_fold_changes: Vec<f64>,
    pub lfc_se: Vec<f64>,
    pub stats: Vec<f64>,
    pub pvalues: Vec<f64>,
}

/// Test the group coefficient of every fit against zero.
///
/// `sign` is -1.0 when the contrast is taken in the reverse direction
/// (reference level as numerator). Genes with all-zero counts get a zero
/// fold change and no statistic.
pub fn wald_test(fits: &[GeneFit], base_means: &[f64], sign: f64) -> WaldStatistics {
    let mut out = WaldStatistics::default();
    for (fit, &base_mean) in fits.iter().zip(base_means) {
        if base_mean == 0.0 {
            out.log2_fold_changes.push(0.0);
            out.lfc_se.push(0.0);
            out.stats.push(f64::NAN);
            out.pvalues.push(f64::NAN);
            continue;
        }

        let beta = fit.beta[1] * sign;
        let se = fit.standard_errors[1];
        let stat = if se > 0.0 { beta / se } else { f64::NAN };
        out.log2_fold_changes.push(beta / LN_2);
        out.lfc_se.push(se / LN_2);
        out.stats.push(stat);
        out.pvalues.push(calculate_pvalue(stat));
    }
    out
}
