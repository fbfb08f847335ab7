//! rust_diffexp command-line interface

use std::path::{Path, PathBuf};

use clap::Parser;
use log::{info, LevelFilter};

use rust_diffexp::cli::{Cli, Commands};
use rust_diffexp::prelude::*;
use rust_diffexp::server::{serve, AppState};

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let result = ServiceConfig::load(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Serve {
            bind,
            data_dir,
            workers,
        } => run_server(config, bind, data_dir, workers),
        Commands::Run {
            dataset,
            genes,
            condition_a,
            condition_b,
            data_dir,
            output,
            workers,
        } => {
            let config = with_overrides(config, data_dir, workers)?;
            let request = DiffExpRequest {
                dataset_id: dataset,
                gene_ids: genes,
                condition_a,
                condition_b,
            };
            run_analysis(&config, &request, output.as_deref())
        }
        Commands::Mock {
            genes,
            condition_a,
            condition_b,
            out_dir,
        } => write_mock(&config, &genes, &condition_a, &condition_b, &out_dir),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Apply command-line overrides and re-check the result
fn with_overrides(mut config: ServiceConfig, data_dir: Option<PathBuf>, workers: Option<usize>) -> Result<ServiceConfig> {
    if let Some(dir) = data_dir {
        config.data.dir = Some(dir);
    }
    if let Some(workers) = workers {
        config.analysis.workers = workers;
    }
    config.validate()?;
    Ok(config)
}

fn run_server(config: ServiceConfig, bind: Option<String>, data_dir: Option<PathBuf>, workers: Option<usize>) -> Result<()> {
    let mut config = with_overrides(config, data_dir, workers)?;
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    match &config.data.dir {
        Some(dir) => info!("Serving MOCK and datasets under {}", dir.display()),
        None => info!("Serving MOCK only"),
    }

    let state = AppState::new(DiffExpService::from_config(&config));
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(serve(state, &config.server.bind))
}

fn run_analysis(config: &ServiceConfig, request: &DiffExpRequest, output: Option<&Path>) -> Result<()> {
    let service = DiffExpService::from_config(config);
    let result = service.analyze(request)?;

    match output {
        Some(path) if path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("json")) => {
            write_json(path, &result)?;
            info!("Results written to: {}", path.display());
        }
        Some(path) => {
            write_results(path, &result)?;
            info!("Results written to: {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    let tested = result.results.iter().filter(|r| r.pvalue.is_some()).count();
    info!(
        "{} genes reported, {} with p-values; samples: {:?}",
        result.results.len(),
        tested,
        result.sample_counts
    );
    Ok(())
}

fn write_mock(config: &ServiceConfig, genes: &[String], condition_a: &str, condition_b: &str, out_dir: &Path) -> Result<()> {
    let catalog = DatasetCatalog::from_config(config);
    let data = catalog
        .mock()
        .load(MOCK_DATASET_ID, genes, condition_a, condition_b)?;
    write_dataset(out_dir, &data.counts, &data.phenotype, &config.analysis.group_column)?;
    info!(
        "Mock dataset written to {} ({} genes x {} samples)",
        out_dir.display(),
        data.counts.n_genes(),
        data.counts.n_samples()
    );
    Ok(())
}
