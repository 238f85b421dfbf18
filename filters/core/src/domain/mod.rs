// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

pub mod config;
pub mod errors;
pub mod registry;
pub mod state;
pub mod value;
