//! Delimited-text reading and writing for count matrices, phenotype tables
//! and results

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use ndarray::Array2;

use super::results::AnalysisResult;
use crate::data::{CountMatrix, PhenotypeTable};
use crate::error::{DiffExpError, Result};

/// Tab when the header line contains one, comma otherwise
fn detect_delimiter(path: &Path) -> Result<u8> {
    let mut header = String::new();
    BufReader::new(File::open(path)?).read_line(&mut header)?;
    Ok(if header.contains('\t') { b'\t' } else { b',' })
}

/// Header plus non-empty data rows
fn read_table(path: &Path) -> Result<(StringRecord, Vec<StringRecord>)> {
    let mut reader = ReaderBuilder::new()
        .delimiter(detect_delimiter(path)?)
        .trim(Trim::All)
        .from_path(path)?;
    let header = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        rows.push(record);
    }
    Ok((header, rows))
}

/// Read a count matrix.
///
/// Expected format: first column is gene IDs, first row is sample IDs.
pub fn read_count_matrix<P: AsRef<Path>>(path: P) -> Result<CountMatrix> {
    let (header, rows) = read_table(path.as_ref())?;
    if header.len() < 2 {
        return Err(DiffExpError::InvalidCountMatrix {
            reason: "Not enough columns in header".to_string(),
        });
    }
    if rows.is_empty() {
        return Err(DiffExpError::InvalidCountMatrix {
            reason: "No genes found in count matrix".to_string(),
        });
    }

    let sample_ids: Vec<String> = header.iter().skip(1).map(String::from).collect();
    let n_samples = sample_ids.len();
    let mut gene_ids = Vec::with_capacity(rows.len());
    let mut counts = Array2::zeros((rows.len(), n_samples));

    for (i, row) in rows.iter().enumerate() {
        gene_ids.push(row.get(0).unwrap_or_default().to_string());
        for (j, value) in row.iter().skip(1).enumerate() {
            counts[[i, j]] = value.parse::<f64>().map_err(|_| DiffExpError::InvalidCountMatrix {
                reason: format!("Invalid count value '{}' for gene '{}'", value, gene_ids[i]),
            })?;
        }
    }

    CountMatrix::new(counts, gene_ids, sample_ids)
}

/// Read a phenotype table.
///
/// Expected format: first column is sample IDs, remaining columns are
/// categorical annotations.
pub fn read_phenotype<P: AsRef<Path>>(path: P) -> Result<PhenotypeTable> {
    let (header, rows) = read_table(path.as_ref())?;
    if rows.is_empty() {
        return Err(DiffExpError::InvalidPhenotype {
            reason: "No samples found in phenotype table".to_string(),
        });
    }

    let sample_ids: Vec<String> = rows.iter().map(|r| r.get(0).unwrap_or_default().to_string()).collect();
    let mut table = PhenotypeTable::new(sample_ids)?;
    for (col, name) in header.iter().enumerate().skip(1) {
        let values = rows.iter().map(|r| r.get(col).unwrap_or_default().to_string()).collect();
        table.add_column(name, values)?;
    }
    Ok(table)
}

/// Write a count matrix as TSV (genes x samples, integer counts)
pub fn write_count_matrix<P: AsRef<Path>>(path: P, matrix: &CountMatrix) -> Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    let mut header = vec!["gene_id".to_string()];
    header.extend(matrix.sample_ids().iter().cloned());
    writer.write_record(&header)?;

    for (gene_id, row) in matrix.gene_ids().iter().zip(matrix.counts().rows()) {
        let mut record = vec![gene_id.clone()];
        record.extend(row.iter().map(|&c| format!("{}", c.round() as u64)));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the given phenotype columns as TSV, sample id first
pub fn write_phenotype<P: AsRef<Path>>(path: P, table: &PhenotypeTable, columns: &[&str]) -> Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    let mut header = vec!["sample_id"];
    header.extend_from_slice(columns);
    writer.write_record(&header)?;

    let values: Vec<&[String]> = columns
        .iter()
        .map(|c| table.require_column(c))
        .collect::<Result<_>>()?;
    for (i, sample) in table.sample_ids().iter().enumerate() {
        let mut record = vec![sample.as_str()];
        record.extend(values.iter().map(|col| col[i].as_str()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "NA".to_string(), |v| format!("{}", v))
}

/// Write result rows as TSV, `NA` for absent statistics
pub fn write_results<P: AsRef<Path>>(path: P, result: &AnalysisResult) -> Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    writer.write_record(["geneId", "baseMean", "log2FoldChange", "stat", "pvalue", "padj"])?;
    for row in &result.results {
        writer.write_record([
            row.gene_id.clone(),
            format_value(row.base_mean),
            format_value(row.log2_fold_change),
            format_value(row.stat),
            format_value(row.pvalue),
            format_value(row.padj),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the full response as pretty-printed JSON
pub fn write_json<P: AsRef<Path>>(path: P, result: &AnalysisResult) -> Result<()> {
    let mut file = File::create(path)?;
    serde_json::to_writer_pretty(&mut file, result)?;
    writeln!(file)?;
    Ok(())
}

/// Write a dataset in the `<dir>/counts.tsv` + `<dir>/phenotype.tsv` layout
pub fn write_dataset<P: AsRef<Path>>(
    dir: P,
    counts: &CountMatrix,
    phenotype: &PhenotypeTable,
    group_column: &str,
) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    write_count_matrix(dir.join("counts.tsv"), counts)?;
    write_phenotype(dir.join("phenotype.tsv"), phenotype, &[group_column])?;
    Ok(())
}
