// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

//! Capability Synthesizer
//!
//! Derives namespaced capability URNs from attributes already present in the
//! request state:
//!
//! ```text
//! {urnNamespace}:res:{resource}:{percent-encoded value}#{urnAuthority}
//! ```
//!
//! Capabilities are compared downstream by exact string equality, so the
//! value encoding must stay RFC 3986 (`-_.~` and alphanumerics untouched).

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::HashSet;
use tracing::{debug, info};

use super::pipeline::{FilterOutcome, ProcessingFilter};
use crate::domain::config::{CapabilitySynthesizerConfig, ResourceAttributeMap, DEFAULT_CAPABILITY_ATTRIBUTE};
use crate::domain::errors::FilterError;
use crate::domain::state::RequestState;

/// Everything outside the RFC 3986 unreserved set
const URN_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

pub fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, URN_VALUE).to_string()
}

#[derive(Debug, Clone)]
pub struct CapabilitySynthesizer {
    capability_attribute: String,
    urn_namespace: String,
    urn_authority: String,
    res_attr_map: ResourceAttributeMap,
}

impl Default for CapabilitySynthesizer {
    fn default() -> Self {
        Self {
            capability_attribute: DEFAULT_CAPABILITY_ATTRIBUTE.to_string(),
            urn_namespace: String::new(),
            urn_authority: String::new(),
            res_attr_map: ResourceAttributeMap::new(),
        }
    }
}

impl CapabilitySynthesizer {
    /// Build from configuration. Empty namespace/authority are accepted and
    /// yield degenerate URNs such as `:res:x:y#`.
    pub fn new(config: CapabilitySynthesizerConfig) -> Result<Self, FilterError> {
        let defaults = Self::default();
        let capability_attribute = config
            .capability_attribute
            .unwrap_or(defaults.capability_attribute);

        if capability_attribute.is_empty() {
            return Err(FilterError::invalid_config(
                "capabilities filter: 'capabilityAttribute' cannot be empty",
            ));
        }

        let synthesizer = Self {
            capability_attribute,
            urn_namespace: config.urn_namespace.unwrap_or(defaults.urn_namespace),
            urn_authority: config.urn_authority.unwrap_or(defaults.urn_authority),
            res_attr_map: config.res_attr_map.unwrap_or(defaults.res_attr_map),
        };

        info!(
            "Capability synthesizer configured: {} resources into '{}'",
            synthesizer.res_attr_map.len(),
            synthesizer.capability_attribute
        );

        Ok(synthesizer)
    }

    pub fn capability_attribute(&self) -> &str {
        &self.capability_attribute
    }

    pub fn capability_urn(&self, resource: &str, value: &str) -> String {
        format!(
            "{}:res:{}:{}#{}",
            self.urn_namespace,
            resource,
            percent_encode(value),
            self.urn_authority
        )
    }

    /// Append capabilities for every non-blank source value, then dedupe the
    /// capability attribute keeping first occurrences.
    pub fn apply(&self, state: &mut RequestState) {
        debug!("Processing capabilities filter");

        let mut capabilities = Vec::new();
        for (source, resource) in &self.res_attr_map {
            let Some(values) = state.attribute(source) else {
                continue;
            };
            for value in values.iter().filter(|v| !v.trim().is_empty()) {
                let capability = self.capability_urn(resource, value);
                debug!("Adding capability {:?}", capability);
                capabilities.push(capability);
            }
        }

        if !capabilities.is_empty() {
            state.append_values(&self.capability_attribute, &capabilities);
        }

        if let Some(existing) = state.attributes.get_mut(&self.capability_attribute) {
            dedupe_in_place(existing);
        }
    }
}

fn dedupe_in_place(values: &mut Vec<String>) {
    let mut seen = HashSet::with_capacity(values.len());
    values.retain(|v| seen.insert(v.clone()));
}

#[async_trait]
impl ProcessingFilter for CapabilitySynthesizer {
    fn name(&self) -> &str {
        "capabilities"
    }

    async fn process(&self, state: &mut RequestState) -> Result<FilterOutcome, FilterError> {
        self.apply(state);
        Ok(FilterOutcome::Continue)
    }
}
