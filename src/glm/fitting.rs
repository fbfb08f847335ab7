//! GLM fitting using Iteratively Reweighted Least Squares (IRLS)
//!
//! The model is `log mu_ij = log s_j + beta0 + beta1 * [sample j in group A]`,
//! so every normal-equation system is 2 x 2 and is solved in closed form.

use rayon::prelude::*;

use super::negative_binomial::{nb_log_likelihood, nb_mean, nb_weight, MAX_BETA, MIN_MU};

/// Ridge penalty added to X'WX (natural log scale)
const RIDGE: f64 = 1e-6;

/// Configurable parameters for GLM fitting.
#[derive(Debug, Clone)]
pub struct GlmFitParams {
    /// Maximum IRLS iterations
    pub maxit: usize,
    /// Relative deviance change treated as convergence
    pub beta_tol: f64,
}

impl Default for GlmFitParams {
    fn default() -> Self {
        Self {
            maxit: 100,
            beta_tol: 1e-8,
        }
    }
}

/// Fit of one gene
#[derive(Debug, Clone)]
pub struct GeneFit {
    /// [intercept, group A effect], natural log
    pub beta: [f64; 2],
    /// Standard errors of `beta`
    pub standard_errors: [f64; 2],
    /// Fitted means per sample
    pub mu: Vec<f64>,
    /// Diagonal of the weighted hat matrix per sample
    pub hat_diagonals: Vec<f64>,
    pub converged: bool,
    pub log_likelihood: f64,
}

/// Symmetric 2 x 2 matrix [[a, b], [b, d]]
#[derive(Debug, Clone, Copy)]
struct Sym2 {
    a: f64,
    b: f64,
    d: f64,
}

impl Sym2 {
    fn det(&self) -> f64 {
        self.a * self.d - self.b * self.b
    }

    fn inverse(&self) -> Option<Sym2> {
        let det = self.det();
        if !(det.is_finite() && det > 0.0) {
            return None;
        }
        Some(Sym2 {
            a: self.d / det,
            b: -self.b / det,
            d: self.a / det,
        })
    }

    fn solve(&self, rhs: [f64; 2]) -> Option<[f64; 2]> {
        let inv = self.inverse()?;
        Some([
            inv.a * rhs[0] + inv.b * rhs[1],
            inv.b * rhs[0] + inv.d * rhs[1],
        ])
    }

    /// self * other * self for symmetric operands
    fn sandwich(&self, other: &Sym2) -> Sym2 {
        // P = self * other
        let p11 = self.a * other.a + self.b * other.b;
        let p12 = self.a * other.b + self.b * other.d;
        let p21 = self.b * other.a + self.d * other.b;
        let p22 = self.b * other.b + self.d * other.d;
        Sym2 {
            a: p11 * self.a + p12 * self.b,
            b: p11 * self.b + p12 * self.d,
            d: p21 * self.b + p22 * self.d,
        }
    }

    /// x' M x for the design row x = [1, indicator]
    fn quad_form(&self, in_a: bool) -> f64 {
        if in_a {
            self.a + 2.0 * self.b + self.d
        } else {
            self.a
        }
    }
}

/// X'WX for the two-column design
fn information(weights: &[f64], in_a: &[bool]) -> Sym2 {
    let total: f64 = weights.iter().sum();
    let group_a: f64 = weights
        .iter()
        .zip(in_a)
        .filter(|(_, &a)| a)
        .map(|(&w, _)| w)
        .sum();
    Sym2 {
        a: total,
        b: group_a,
        d: group_a,
    }
}

fn linear_predictor(beta: &[f64; 2], in_a: bool) -> f64 {
    if in_a {
        beta[0] + beta[1]
    } else {
        beta[0]
    }
}

/// Starting values: group means of log(normalized count + 0.1)
fn initial_beta(counts: &[f64], in_a: &[bool], size_factors: &[f64]) -> [f64; 2] {
    let mut sums = [0.0; 2];
    let mut ns = [0usize; 2];
    for ((&y, &a), &s) in counts.iter().zip(in_a).zip(size_factors) {
        let g = usize::from(a);
        sums[g] += (y / s + 0.1).ln();
        ns[g] += 1;
    }
    let mean_b = sums[0] / ns[0].max(1) as f64;
    let mean_a = sums[1] / ns[1].max(1) as f64;
    [mean_b, mean_a - mean_b]
}

/// Fit one gene by IRLS.
pub fn fit_single_gene(
    counts: &[f64],
    in_a: &[bool],
    size_factors: &[f64],
    alpha: f64,
    params: &GlmFitParams,
) -> GeneFit {
    let n = counts.len();
    let mut beta = initial_beta(counts, in_a, size_factors);
    let mut converged = false;
    let mut dev_old = 0.0_f64;

    let mut mus = vec![0.0; n];
    let mut weights = vec![0.0; n];

    for iter in 0..params.maxit {
        let mut rhs = [0.0; 2];
        for i in 0..n {
            let mu = nb_mean(linear_predictor(&beta, in_a[i]), size_factors[i]).max(MIN_MU);
            let w = nb_weight(mu, alpha);
            let z = (mu / size_factors[i]).ln() + (counts[i] - mu) / mu;
            weights[i] = w;
            rhs[0] += w * z;
            if in_a[i] {
                rhs[1] += w * z;
            }
        }

        let mut xtwx = information(&weights, in_a);
        xtwx.a += RIDGE;
        xtwx.d += RIDGE;
        beta = match xtwx.solve(rhs) {
            Some(b) => b,
            None => break,
        };

        if beta.iter().any(|b| b.abs() > MAX_BETA || !b.is_finite()) {
            break;
        }

        for i in 0..n {
            mus[i] = nb_mean(linear_predictor(&beta, in_a[i]), size_factors[i]).max(MIN_MU);
        }
        let dev: f64 = mus
            .iter()
            .zip(counts)
            .map(|(&mu, &y)| -2.0 * nb_log_likelihood(y, mu, alpha))
            .sum();

        let conv_test = (dev - dev_old).abs() / (dev.abs() + 0.1);
        if conv_test.is_nan() {
            break;
        }
        if iter > 0 && conv_test < params.beta_tol {
            converged = true;
            break;
        }
        dev_old = dev;
    }

    for i in 0..n {
        mus[i] = nb_mean(linear_predictor(&beta, in_a[i]), size_factors[i]).max(MIN_MU);
        weights[i] = nb_weight(mus[i], alpha);
    }

    let xtwx = information(&weights, in_a);
    let ridged = Sym2 {
        a: xtwx.a + RIDGE,
        b: xtwx.b,
        d: xtwx.d + RIDGE,
    };

    let (standard_errors, hat_diagonals) = match ridged.inverse() {
        Some(inv) => {
            let cov = inv.sandwich(&xtwx);
            let se = [cov.a.max(0.0).sqrt(), cov.d.max(0.0).sqrt()];
            let hat = weights
                .iter()
                .zip(in_a)
                .map(|(&w, &a)| w * inv.quad_form(a))
                .collect();
            (se, hat)
        }
        None => ([f64::NAN; 2], vec![f64::NAN; n]),
    };

    let log_likelihood = mus
        .iter()
        .zip(counts)
        .map(|(&mu, &y)| nb_log_likelihood(y, mu, alpha))
        .sum();

    GeneFit {
        beta,
        standard_errors,
        mu: mus,
        hat_diagonals,
        converged,
        log_likelihood,
    }
}

/// Fit every gene (columns of `counts`, samples x genes)
pub fn fit_glm(
    columns: &[Vec<f64>],
    in_a: &[bool],
    size_factors: &[f64],
    dispersions: &[f64],
    params: &GlmFitParams,
) -> Vec<GeneFit> {
    let fits: Vec<GeneFit> = columns
        .par_iter()
        .zip(dispersions.par_iter())
        .map(|(y, &alpha)| fit_single_gene(y, in_a, size_factors, alpha, params))
        .collect();

    let n_unconverged = fits.iter().filter(|f| !f.converged).count();
    if n_unconverged > 0 {
        log::warn!("{} genes did not converge in IRLS", n_unconverged);
    }
    fits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_group_means() {
        // Unit size factors: exp(beta0) is the B mean, exp(beta0 + beta1) the A mean
        let counts = [40.0, 44.0, 36.0, 10.0, 12.0, 8.0];
        let in_a = [true, true, true, false, false, false];
        let sf = [1.0; 6];

        let fit = fit_single_gene(&counts, &in_a, &sf, 0.05, &GlmFitParams::default());
        assert!(fit.converged);
        assert!((fit.beta[0].exp() - 10.0).abs() < 1e-4);
        assert!(((fit.beta[0] + fit.beta[1]).exp() - 40.0).abs() < 1e-3);
        assert!(fit.standard_errors.iter().all(|s| s.is_finite() && *s > 0.0));
    }

    #[test]
    fn test_hat_diagonals_sum_to_rank() {
        let counts = [20.0, 25.0, 18.0, 30.0, 35.0, 28.0];
        let in_a = [true, true, true, false, false, false];
        let sf = [0.8, 1.0, 1.2, 0.9, 1.1, 1.0];

        let fit = fit_single_gene(&counts, &in_a, &sf, 0.1, &GlmFitParams::default());
        let trace: f64 = fit.hat_diagonals.iter().sum();
        assert!((trace - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_size_factors_offset_the_mean() {
        let counts = [20.0, 40.0, 20.0, 40.0];
        let in_a = [true, true, false, false];
        let sf = [1.0, 2.0, 1.0, 2.0];

        let fit = fit_single_gene(&counts, &in_a, &sf, 0.01, &GlmFitParams::default());
        assert!(fit.beta[1].abs() < 1e-6);
        assert!((fit.beta[0].exp() - 20.0).abs() < 1e-3);
    }
}
