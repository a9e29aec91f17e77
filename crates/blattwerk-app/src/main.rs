// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk — document structural analysis
//
// Entry point. Initialises logging, parses arguments, runs one analysis and
// prints a short summary.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use services::data_dir;
use services::run::{RunRequest, run};

#[derive(Parser)]
#[command(name = "blattwerk")]
#[command(version)]
#[command(about = "Analyze document pages: layout blocks, table grids, visual artifacts and page statistics", long_about = None)]
struct Cli {
    /// Input file: a PDF or a JSON document description
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output directory (defaults to a fresh run directory under the data dir)
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// JSON analyzer configuration
    #[arg(short, long, value_name = "FILE", env = "BLATTWERK_CONFIG")]
    config: Option<PathBuf>,

    /// Concurrent page workers, overrides the configuration
    #[arg(short, long)]
    workers: Option<usize>,

    /// Directory with the recognition models (needs the `ocr` feature)
    #[arg(long, value_name = "DIR", env = "BLATTWERK_MODELS")]
    models: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let out = cli.out.clone().unwrap_or_else(|| data_dir::run_dir(&cli.input));
    let request = RunRequest {
        input: cli.input,
        config: cli.config,
        out,
        workers: cli.workers,
        models: cli.models,
    };

    tracing::info!(input = %request.input.display(), out = %request.out.display(), "Blattwerk starting");

    match run(&request).await {
        Ok(outcome) => {
            let meta = &outcome.meta;
            println!(
                "{}: {}/{} pages, {} blocks, {} table candidates, {} artifacts",
                meta.file.name,
                meta.pages_completed,
                meta.pages_count,
                meta.text_blocks.len(),
                meta.table_candidates.len(),
                meta.artifacts.len()
            );
            println!("qa: {}", meta.qa.summary);
            for file in &outcome.files {
                println!("  {}", file.display());
            }
            if meta.cancelled { ExitCode::from(130) } else { ExitCode::SUCCESS }
        }
        Err(err) => {
            tracing::error!(error = %err, "Run failed");
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
