// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

//! Attribute Mapper
//!
//! Fetches registry attributes for the resolved principal and merges their
//! normalized values into the released attributes under the configured
//! destination names. Existing destination values are kept; fetched values
//! are appended after them.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Registry → federation attribute mapping
//! - **Integration:** Identity resolution → AttributeMapper → later filters

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::pipeline::{FilterOutcome, ProcessingFilter};
use crate::domain::config::{AttributeMap, AttributeMapperConfig};
use crate::domain::errors::FilterError;
use crate::domain::registry::RegistryAdapter;
use crate::domain::state::{PrincipalId, RequestState};

pub struct AttributeMapper {
    attr_map: AttributeMap,
    registry: Arc<dyn RegistryAdapter>,
}

impl AttributeMapper {
    /// Build from filter configuration. `attrMap` is mandatory.
    pub fn new(config: AttributeMapperConfig, registry: Arc<dyn RegistryAdapter>) -> Result<Self, FilterError> {
        let entries = config.attr_map.ok_or_else(|| {
            FilterError::invalid_config("attributes filter: missing mandatory configuration option 'attrMap'")
        })?;
        Self::with_map(AttributeMap::new(entries)?, registry)
    }

    pub fn with_map(attr_map: AttributeMap, registry: Arc<dyn RegistryAdapter>) -> Result<Self, FilterError> {
        if attr_map.is_empty() {
            return Err(FilterError::invalid_config(
                "attributes filter: 'attrMap' must map at least one attribute",
            ));
        }
        info!("Attribute mapper configured with {} source attributes", attr_map.len());
        Ok(Self { attr_map, registry })
    }

    fn resolve_principal(state: &RequestState) -> Result<PrincipalId, FilterError> {
        state.principal_id().cloned().ok_or(FilterError::MissingPrincipal)
    }

    /// Fetch and merge mapped attributes into `state.attributes`.
    ///
    /// Without a resolved principal this is a logged no-op. Registry failures
    /// propagate untouched; the host decides whether they abort the login.
    pub async fn apply(&self, state: &mut RequestState) -> Result<(), FilterError> {
        let principal = match Self::resolve_principal(state) {
            Ok(principal) => principal,
            Err(FilterError::MissingPrincipal) => {
                debug!("'identity.principalId' not found in request state; skipping attribute mapping");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let fetched = self
            .registry
            .get_user_attributes(&principal, &self.attr_map.source_names())
            .await?;

        for (source, raw) in fetched {
            let Some(destinations) = self.attr_map.destinations(&source) else {
                warn!("Registry returned unrequested attribute '{}'; ignoring", source);
                continue;
            };

            let values = raw.normalize();

            debug!(
                "Registry attribute {} fetched. Value [{}] is being merged into [{}]",
                source,
                values.join(","),
                destinations.join(",")
            );

            for destination in destinations {
                state.append_values(destination, &values);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ProcessingFilter for AttributeMapper {
    fn name(&self) -> &str {
        "attributes"
    }

    async fn process(&self, state: &mut RequestState) -> Result<FilterOutcome, FilterError> {
        self.apply(state).await?;
        Ok(FilterOutcome::Continue)
    }
}
