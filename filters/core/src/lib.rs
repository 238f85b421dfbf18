// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

//! # fedattr core
//!
//! Attribute processing for federation login pipelines: fetch principal
//! attributes from the identity registry, map them onto protocol attribute
//! names, and synthesize capability URNs.
//!
//! ## Layers
//!
//! - `domain`: value shapes, request state, configuration, errors, registry trait
//! - `application`: the processing filters and the chain that runs them
//! - `infrastructure`: registry RPC transport

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::attribute_mapper::AttributeMapper;
pub use application::capability_synthesizer::CapabilitySynthesizer;
pub use application::pipeline::{FilterChain, FilterOutcome, ProcessingFilter};
pub use domain::config::FilterConfigManifest;
pub use domain::errors::FilterError;
pub use domain::state::RequestState;
