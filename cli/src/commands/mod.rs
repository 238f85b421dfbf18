// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the fedattr CLI

pub mod config;
pub mod process;

pub use self::config::ConfigCommand;
pub use self::process::ProcessArgs;
