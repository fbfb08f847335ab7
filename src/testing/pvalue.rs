//! P-value calculation from test statistics

use statrs::function::erf::erfc;

/// Two-sided p-value of a standard normal statistic, 2 * P(Z > |z|)
pub fn calculate_pvalue(z: f64) -> f64 {
    if !z.is_finite() {
        return f64::NAN;
    }
    erfc(z.abs() / std::f64::consts::SQRT_2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pvalue_symmetric() {
        let p1 = calculate_pvalue(2.0);
        let p2 = calculate_pvalue(-2.0);
        assert!((p1 - p2).abs() < 1e-10);
    }

    #[test]
    fn test_pvalue_known_quantile() {
        assert!((calculate_pvalue(1.959963984540054) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_pvalue_zero() {
        assert!((calculate_pvalue(0.0) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_pvalue_non_finite() {
        assert!(calculate_pvalue(f64::NAN).is_nan());
        assert!(calculate_pvalue(f64::INFINITY).is_nan());
    }
}
