// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

//! Processing Pipeline
//!
//! Host-facing seam: each filter mutates the request state and tells the host
//! whether to continue or to redirect the user agent.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::attribute_mapper::AttributeMapper;
use super::capability_synthesizer::CapabilitySynthesizer;
use crate::domain::config::{FilterConfigManifest, FilterDefinition, RegistryConfig, RegistryInterface};
use crate::domain::errors::FilterError;
use crate::domain::registry::RegistryAdapter;
use crate::domain::state::RequestState;
use crate::infrastructure::rpc_adapter::RpcRegistryAdapter;
use crate::infrastructure::rpc_connector::RpcConnector;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Continue the pipeline with the mutated state
    Continue,
    /// Hand the user agent over to an interactive step
    Redirect(String),
}

#[async_trait]
pub trait ProcessingFilter: Send + Sync {
    fn name(&self) -> &str;

    async fn process(&self, state: &mut RequestState) -> Result<FilterOutcome, FilterError>;
}

/// Ordered list of filters sharing one registry client
pub struct FilterChain {
    filters: Vec<Box<dyn ProcessingFilter>>,
}

impl FilterChain {
    pub fn new(filters: Vec<Box<dyn ProcessingFilter>>) -> Self {
        Self { filters }
    }

    /// Construct every configured filter. Any configuration error aborts
    /// construction before a request is processed.
    pub fn from_config(manifest: &FilterConfigManifest) -> Result<Self, FilterError> {
        manifest.validate()?;

        // One adapter per interface flavor, shared by every filter using it
        let mut adapters: IndexMap<RegistryInterface, Arc<dyn RegistryAdapter>> = IndexMap::new();
        let mut filters: Vec<Box<dyn ProcessingFilter>> = Vec::with_capacity(manifest.spec.filters.len());

        for definition in &manifest.spec.filters {
            debug!("Constructing {} filter", definition.kind());
            let filter: Box<dyn ProcessingFilter> = match definition {
                FilterDefinition::Attributes(config) => {
                    let interface = config.effective_interface(&manifest.spec.registry);
                    let adapter = match adapters.get(&interface) {
                        Some(adapter) => adapter.clone(),
                        None => {
                            let adapter = registry_adapter(&manifest.spec.registry, interface)?;
                            adapters.insert(interface, adapter.clone());
                            adapter
                        }
                    };
                    Box::new(AttributeMapper::new(config.clone(), adapter)?)
                }
                FilterDefinition::Capabilities(config) => Box::new(CapabilitySynthesizer::new(config.clone())?),
            };
            filters.push(filter);
        }

        info!("Filter chain ready with {} filters", filters.len());
        Ok(Self { filters })
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run all filters in order, stopping at the first redirect or error
    pub async fn run(&self, state: &mut RequestState) -> Result<FilterOutcome, FilterError> {
        for filter in &self.filters {
            debug!("Running {} filter", filter.name());
            if let FilterOutcome::Redirect(target) = filter.process(state).await? {
                info!("Filter {} requested redirect to {}", filter.name(), target);
                return Ok(FilterOutcome::Redirect(target));
            }
        }
        Ok(FilterOutcome::Continue)
    }

    /// Run a single filter by position
    pub async fn run_one(&self, index: usize, state: &mut RequestState) -> Result<FilterOutcome, FilterError> {
        let filter = self.filters.get(index).ok_or_else(|| {
            FilterError::invalid_config(format!(
                "filter index {} out of range (chain has {} filters)",
                index,
                self.filters.len()
            ))
        })?;
        filter.process(state).await
    }
}

/// Select the adapter for an interface flavor
pub fn registry_adapter(
    config: &RegistryConfig,
    interface: RegistryInterface,
) -> Result<Arc<dyn RegistryAdapter>, FilterError> {
    match interface {
        RegistryInterface::Rpc => {
            let connector = Arc::new(RpcConnector::from_config(config)?);
            Ok(Arc::new(RpcRegistryAdapter::new(connector)))
        }
        RegistryInterface::Ldap => Err(FilterError::invalid_config(
            "registry interface 'ldap' is not supported by this build",
        )),
    }
}
