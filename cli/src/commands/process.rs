// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

//! Run the filter chain over a request state document

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use fedattr_core::{FilterChain, FilterConfigManifest, FilterOutcome, RequestState};

#[derive(Args)]
pub struct ProcessArgs {
    /// Request state JSON file ("-" for stdin)
    #[arg(short, long, value_name = "FILE")]
    state: PathBuf,

    /// Only run the filter at this position
    #[arg(long, value_name = "INDEX")]
    filter: Option<usize>,
}

pub async fn execute(args: ProcessArgs, config_override: Option<PathBuf>) -> Result<()> {
    let config = FilterConfigManifest::load(config_override).context("Failed to load configuration")?;
    let chain = FilterChain::from_config(&config).context("Failed to construct filter chain")?;

    let mut state = read_state(&args.state)?;

    let outcome = match args.filter {
        Some(index) => chain.run_one(index, &mut state).await,
        None => chain.run(&mut state).await,
    }
    .context("Filter processing failed")?;

    if let FilterOutcome::Redirect(target) = &outcome {
        eprintln!("{} pipeline would redirect to {}", "→".yellow(), target);
    }
    info!("Processing finished: {:?}", outcome);

    println!("{}", state.to_json_pretty()?);
    Ok(())
}

fn read_state(path: &Path) -> Result<RequestState> {
    let content = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read request state from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read request state: {:?}", path))?
    };

    RequestState::from_json_str(&content).context("Failed to parse request state JSON")
}
