// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use fedattr_core::domain::config::{FilterDefinition, DEFAULT_CAPABILITY_ATTRIBUTE};
use fedattr_core::{FilterChain, FilterConfigManifest};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file and construct every filter
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!("  2. ./fedattr.yaml");
        println!("  3. /etc/fedattr/config.yaml");
        println!();
    }

    let config = FilterConfigManifest::load(config_override).context("Failed to load configuration")?;

    println!("{}", "Registry:".bold());
    println!("  URL: {}", config.spec.registry.url);
    println!("  User: {}", config.spec.registry.user);
    println!("  Interface: {:?}", config.spec.registry.interface);
    println!("  Timeout: {}s", config.spec.registry.timeout_secs);
    println!();

    println!("{}", "Filters:".bold());
    for (index, filter) in config.spec.filters.iter().enumerate() {
        match filter {
            FilterDefinition::Attributes(attrs) => {
                println!("  [{}] {}", index, "attributes".bold());
                for (source, destination) in attrs.attr_map.iter().flatten() {
                    println!("      {} → {:?}", source, destination);
                }
            }
            FilterDefinition::Capabilities(caps) => {
                println!("  [{}] {}", index, "capabilities".bold());
                println!(
                    "      into: {}",
                    caps.capability_attribute.as_deref().unwrap_or(DEFAULT_CAPABILITY_ATTRIBUTE)
                );
                println!(
                    "      urn: {}:res:<resource>:<value>#{}",
                    caps.urn_namespace.as_deref().unwrap_or_default(),
                    caps.urn_authority.as_deref().unwrap_or_default()
                );
                for (source, resource) in caps.res_attr_map.iter().flatten() {
                    println!("      {} → {}", source, resource);
                }
            }
        }
    }
    println!();

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = FilterConfigManifest::load(config_path).context("Failed to load configuration")?;
    let chain = FilterChain::from_config(&config).context("Failed to construct filter chain")?;

    println!(
        "{} Configuration '{}' is valid ({} filters)",
        "✓".green(),
        config.metadata.name,
        chain.len()
    );

    Ok(())
}
