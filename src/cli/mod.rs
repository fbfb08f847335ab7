//! Command-line interface for rust_diffexp

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rust_diffexp")]
#[command(version)]
#[command(about = "Differential expression service over RNA-seq counts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE",
        long_help = "TOML configuration file.\n\
            Tables: [analysis], [engine], [mock], [server], [data].\n\
            Every key is optional; missing keys keep their defaults.")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    #[command(
        long_about = "Run the HTTP server.\n\n\
            Serves POST /diffexp and GET /health with permissive CORS.",
        after_long_help = "\
Examples:
  rust_diffexp serve
  rust_diffexp serve --bind 0.0.0.0:8000 --data-dir /data/tcga --workers 4"
    )]
    Serve {
        /// Address to listen on [default: from config, 127.0.0.1:8000]
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Directory of file-backed datasets
        #[arg(long, value_name = "DIR",
            long_help = "Directory of file-backed datasets.\n\
                Each dataset is a subdirectory holding counts.tsv and phenotype.tsv.\n\
                Without it only datasetId=MOCK is served.")]
        data_dir: Option<PathBuf>,

        /// Worker threads for the statistical engine
        #[arg(short = 't', long)]
        workers: Option<usize>,
    },

    /// Run one analysis and write the results
    #[command(
        long_about = "Run one analysis and write the results.\n\n\
            Output format follows the file extension: .json writes the full\n\
            response, anything else a TSV of per-gene statistics with NA for\n\
            values that could not be estimated. Without -o the JSON response\n\
            is printed to stdout.",
        after_long_help = "\
Examples:
  rust_diffexp run --dataset MOCK --genes ENSG00000141510,ENSG00000171862 \\
    --condition-a \"Primary Tumor\" --condition-b \"Solid Tissue Normal\"

  rust_diffexp run --dataset BRCA --data-dir /data/tcga --genes TP53,BRCA1 \\
    --condition-a \"Primary Tumor\" --condition-b \"Solid Tissue Normal\" -o brca.tsv"
    )]
    Run {
        /// Dataset id (MOCK or a directory under --data-dir)
        #[arg(short, long)]
        dataset: String,

        /// Comma-separated gene ids
        #[arg(short, long, value_delimiter = ',', required = true)]
        genes: Vec<String>,

        /// Comparison condition (numerator)
        #[arg(long)]
        condition_a: String,

        /// Reference condition (denominator)
        #[arg(long)]
        condition_b: String,

        /// Directory of file-backed datasets
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,

        /// Output file (.json or .tsv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Worker threads for the statistical engine
        #[arg(short = 't', long)]
        workers: Option<usize>,
    },

    /// Write a mock dataset in the file-backed layout
    #[command(
        long_about = "Write a mock dataset in the file-backed layout.\n\n\
            Produces counts.tsv and phenotype.tsv in the output directory, so the\n\
            dataset can be served with --data-dir.",
        after_long_help = "\
Examples:
  rust_diffexp mock --genes TP53,BRCA1 --condition-a Tumor --condition-b Normal \\
    --out-dir data/DEMO"
    )]
    Mock {
        /// Comma-separated gene ids added to the mock padding
        #[arg(short, long, value_delimiter = ',', required = true)]
        genes: Vec<String>,

        #[arg(long)]
        condition_a: String,

        #[arg(long)]
        condition_b: String,

        /// Output directory
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,
    },
}
