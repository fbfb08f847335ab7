//! Input/Output: result and response types, delimited-text files

mod csv;
mod results;

pub use self::csv::{
    read_count_matrix, read_phenotype, write_count_matrix, write_dataset, write_json, write_phenotype,
    write_results,
};
pub use results::{AnalysisResult, ContrastResults, GeneStatRow, ResultsSummary};
