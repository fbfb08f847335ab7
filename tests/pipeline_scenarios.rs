//! End-to-end pipeline behaviour against a scripted engine

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ndarray::Array2;
use rust_diffexp::prelude::*;

/// Engine that fails its first `failures` fits, then reports fixed statistics
struct ScriptedEngine {
    failures: usize,
    calls: AtomicUsize,
    fitted_sizes: Mutex<Vec<usize>>,
}

impl ScriptedEngine {
    fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
            fitted_sizes: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StatisticalEngine for ScriptedEngine {
    type Fit = Vec<String>;

    fn fit(&self, counts: &DesignCounts, _design: &DesignTable, _workers: usize) -> std::result::Result<Vec<String>, EngineError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.fitted_sizes.lock().unwrap().push(counts.n_genes());
        if call < self.failures {
            return Err(EngineError::DegenerateDispersions { min_disp: 1e-8 });
        }
        Ok(counts.gene_ids().to_vec())
    }

    fn contrast(
        &self,
        fit: &Vec<String>,
        numerator: Condition,
        denominator: Condition,
    ) -> std::result::Result<ContrastResults, EngineError> {
        let n = fit.len();
        let mut res = ContrastResults::new(fit.clone(), numerator, denominator);
        res.base_means = (0..n).map(|i| 100.0 + i as f64).collect();
        res.log2_fold_changes = vec![1.25; n];
        res.lfc_se = vec![0.25; n];
        res.stat = vec![5.0; n];
        res.pvalues = vec![1e-4; n];
        res.padj = vec![1e-3; n];
        // last gene could not be tested
        if n > 0 {
            res.pvalues[n - 1] = f64::NAN;
            res.padj[n - 1] = f64::NAN;
        }
        Ok(res)
    }
}

struct Dataset {
    counts: CountMatrix,
    phenotype: PhenotypeTable,
}

/// `rows[g]` holds gene g's counts: `n_a` Tumor samples then `n_b` Normal samples
fn dataset(n_a: usize, n_b: usize, rows: &[(String, Vec<f64>)]) -> Dataset {
    let n = n_a + n_b;
    let sample_ids: Vec<String> = (1..=n).map(|i| format!("s{}", i)).collect();
    let mut counts = Array2::zeros((rows.len(), n));
    for (g, (_, values)) in rows.iter().enumerate() {
        for (s, v) in values.iter().enumerate() {
            counts[[g, s]] = *v;
        }
    }
    let counts = CountMatrix::new(counts, rows.iter().map(|(id, _)| id.clone()).collect(), sample_ids.clone()).unwrap();

    let mut phenotype = PhenotypeTable::new(sample_ids).unwrap();
    let groups = (0..n)
        .map(|s| if s < n_a { "Tumor".to_string() } else { "Normal".to_string() })
        .collect();
    phenotype.add_column("sample_type", groups).unwrap();
    Dataset { counts, phenotype }
}

/// Non-zero in every sample, varying, deep enough for the strict pass
fn strong_gene(id: &str, g: usize, n: usize) -> (String, Vec<f64>) {
    (id.to_string(), (0..n).map(|s| (20 + 3 * g + 2 * s) as f64).collect())
}

/// Non-zero in exactly two samples per group: passes lenient, fails strict
fn sparse_gene(id: &str, n_a: usize, n: usize) -> (String, Vec<f64>) {
    let values = (0..n)
        .map(|s| if s < 2 || (s >= n_a && s < n_a + 2) { 4.0 + s as f64 } else { 0.0 })
        .collect();
    (id.to_string(), values)
}

fn zero_gene(id: &str, n: usize) -> (String, Vec<f64>) {
    (id.to_string(), vec![0.0; n])
}

fn request(genes: &[String]) -> DiffExpRequest {
    DiffExpRequest {
        dataset_id: "TEST".to_string(),
        gene_ids: genes.to_vec(),
        condition_a: "Tumor".to_string(),
        condition_b: "Normal".to_string(),
    }
}

fn run(data: &Dataset, genes: &[String], engine: &ScriptedEngine) -> Result<AnalysisResult> {
    run_pipeline(
        &data.counts,
        &data.phenotype,
        genes,
        &request(genes),
        engine,
        &AnalysisConfig::default(),
    )
}

fn ids(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}{}", prefix, i)).collect()
}

#[test]
fn scenario_a_first_attempt_succeeds() {
    let genes = ids("G", 20);
    let rows: Vec<_> = genes.iter().enumerate().map(|(g, id)| strong_gene(id, g, 10)).collect();
    let data = dataset(5, 5, &rows);
    let engine = ScriptedEngine::new(0);

    let result = run(&data, &genes, &engine).unwrap();

    assert_eq!(engine.calls(), 1);
    assert_eq!(result.results.len(), 20);
    assert_eq!(result.sample_counts.values().sum::<usize>(), 10);
    assert_eq!(result.sample_counts["Tumor"], 5);
    assert_eq!(result.sample_counts["Normal"], 5);
    let order: Vec<&String> = result.results.iter().map(|r| &r.gene_id).collect();
    assert_eq!(order, genes.iter().collect::<Vec<_>>());
    assert_eq!(result.results[0].log2_fold_change, Some(1.25));
    // NaN from the engine is reported as absent
    assert_eq!(result.results[19].pvalue, None);
    assert_eq!(result.results[19].log2_fold_change, Some(1.25));
}

#[test]
fn scenario_b_single_reference_sample() {
    let genes = ids("G", 20);
    let rows: Vec<_> = genes.iter().enumerate().map(|(g, id)| strong_gene(id, g, 6)).collect();
    let data = dataset(5, 1, &rows);
    let engine = ScriptedEngine::new(0);

    let err = run(&data, &genes, &engine).unwrap_err();

    assert!(matches!(err, DiffExpError::InsufficientGroupSize { n_a: 5, n_b: 1, .. }));
    assert!(err.to_string().contains("A=5"));
    assert!(err.to_string().contains("B=1"));
    assert_eq!(engine.calls(), 0);
}

#[test]
fn scenario_c_too_few_informative_genes() {
    let genes = ids("G", 20);
    let rows: Vec<_> = genes
        .iter()
        .enumerate()
        .map(|(g, id)| if g < 4 { strong_gene(id, g, 10) } else { zero_gene(id, 10) })
        .collect();
    let data = dataset(5, 5, &rows);
    let engine = ScriptedEngine::new(0);

    let err = run(&data, &genes, &engine).unwrap_err();

    assert!(matches!(
        err,
        DiffExpError::TooFewInformativeGenes {
            stage: FitStage::Lenient,
            found: 4,
            required: 10
        }
    ));
    assert_eq!(engine.calls(), 0);
}

#[test]
fn scenario_d_strict_retry_after_fit_failure() {
    let strong = ids("S", 15);
    let sparse = ids("W", 15);
    let mut rows: Vec<_> = strong.iter().enumerate().map(|(g, id)| strong_gene(id, g, 10)).collect();
    rows.extend(sparse.iter().map(|id| sparse_gene(id, 5, 10)));
    let data = dataset(5, 5, &rows);
    // interleave so the response order differs from the matrix order
    let requested: Vec<String> = strong.iter().zip(&sparse).flat_map(|(s, w)| [w.clone(), s.clone()]).collect();
    let engine = ScriptedEngine::new(1);

    let result = run(&data, &requested, &engine).unwrap();

    assert_eq!(engine.calls(), 2);
    assert_eq!(*engine.fitted_sizes.lock().unwrap(), vec![30, 15]);
    assert_eq!(result.results.len(), 30);
    for (row, gene) in result.results.iter().zip(&requested) {
        assert_eq!(&row.gene_id, gene);
        if gene.starts_with('W') {
            assert!(row.is_absent(), "{} was filtered out and must be absent", gene);
        } else {
            assert!(row.base_mean.is_some(), "{} was fitted", gene);
        }
    }
}

#[test]
fn strict_retry_failure_is_terminal() {
    let genes = ids("G", 20);
    let rows: Vec<_> = genes.iter().enumerate().map(|(g, id)| strong_gene(id, g, 10)).collect();
    let data = dataset(5, 5, &rows);
    let engine = ScriptedEngine::new(5);

    let err = run(&data, &genes, &engine).unwrap_err();

    assert!(matches!(err, DiffExpError::FitFailed { .. }));
    assert!(err.to_string().starts_with("DE failed even after stricter filtering"));
    assert_eq!(engine.calls(), 2);
}

#[test]
fn strict_filter_leaving_too_few_genes_is_terminal() {
    let strong = ids("S", 6);
    let sparse = ids("W", 10);
    let mut rows: Vec<_> = strong.iter().enumerate().map(|(g, id)| strong_gene(id, g, 10)).collect();
    rows.extend(sparse.iter().map(|id| sparse_gene(id, 5, 10)));
    let data = dataset(5, 5, &rows);
    let genes: Vec<String> = strong.iter().chain(&sparse).cloned().collect();
    let engine = ScriptedEngine::new(1);

    let err = run(&data, &genes, &engine).unwrap_err();

    assert!(matches!(
        err,
        DiffExpError::TooFewInformativeGenes {
            stage: FitStage::Strict,
            found: 6,
            ..
        }
    ));
    assert_eq!(engine.calls(), 1);
}

#[test]
fn scenario_e_unknown_gene_is_dropped_not_reported() {
    let genes = ids("G", 12);
    let rows: Vec<_> = genes.iter().enumerate().map(|(g, id)| strong_gene(id, g, 10)).collect();
    let data = dataset(5, 5, &rows);
    let mut requested = genes.clone();
    requested.insert(3, "GHOST".to_string());
    let engine = ScriptedEngine::new(0);

    let result = run(&data, &requested, &engine).unwrap();

    assert_eq!(result.results.len(), 12);
    assert!(result.results.iter().all(|r| r.gene_id != "GHOST"));
    assert_eq!(result.results[3].gene_id, "G3");
}

#[test]
fn scenario_e_all_genes_unknown() {
    let genes = ids("G", 12);
    let rows: Vec<_> = genes.iter().enumerate().map(|(g, id)| strong_gene(id, g, 10)).collect();
    let data = dataset(5, 5, &rows);
    let engine = ScriptedEngine::new(0);

    let err = run(&data, &["X1".to_string(), "X2".to_string()], &engine).unwrap_err();

    assert!(matches!(err, DiffExpError::NoGenesFound { requested: 2 }));
    assert_eq!(engine.calls(), 0);
}

#[test]
fn padding_genes_are_fitted_but_not_reported() {
    let genes = ids("G", 15);
    let rows: Vec<_> = genes.iter().enumerate().map(|(g, id)| strong_gene(id, g, 10)).collect();
    let data = dataset(5, 5, &rows);
    let requested = vec!["G14".to_string(), "G2".to_string()];
    let engine = ScriptedEngine::new(0);

    let result = run_pipeline(
        &data.counts,
        &data.phenotype,
        &genes,
        &request(&requested),
        &engine,
        &AnalysisConfig::default(),
    )
    .unwrap();

    assert_eq!(*engine.fitted_sizes.lock().unwrap(), vec![15]);
    let order: Vec<&str> = result.results.iter().map(|r| r.gene_id.as_str()).collect();
    assert_eq!(order, vec!["G14", "G2"]);
}

#[test]
fn condition_labels_named_like_levels() {
    let genes = ids("G", 12);
    let rows: Vec<_> = genes.iter().enumerate().map(|(g, id)| strong_gene(id, g, 7)).collect();
    let mut data = dataset(4, 3, &rows);
    // relabel: the comparison group is literally called "B"
    let groups = (0..7).map(|s| if s < 4 { "B".to_string() } else { "A".to_string() }).collect();
    data.phenotype = PhenotypeTable::new((1..=7).map(|i| format!("s{}", i)).collect()).unwrap();
    data.phenotype.add_column("sample_type", groups).unwrap();

    let engine = ScriptedEngine::new(0);
    let mut req = request(&genes);
    req.condition_a = "B".to_string();
    req.condition_b = "A".to_string();
    let result = run_pipeline(
        &data.counts,
        &data.phenotype,
        &genes,
        &req,
        &engine,
        &AnalysisConfig::default(),
    )
    .unwrap();

    assert_eq!(result.sample_counts["B"], 4);
    assert_eq!(result.sample_counts["A"], 3);
    assert_eq!(result.condition_a, "B");
}
