// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

// RPC Registry Adapter
//
// Anti-Corruption Layer over the registry RPC API. Translates attribute
// objects ({namespace, friendlyName, value, ...}) into domain values keyed by
// their full registry name.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::rpc_connector::{RpcConnector, RpcParams};
use crate::domain::errors::FilterError;
use crate::domain::registry::{FetchedAttributes, RegistryAdapter};
use crate::domain::state::PrincipalId;
use crate::domain::value::RawValue;

const ATTRIBUTES_MANAGER: &str = "attributesManager";
const GET_ATTRIBUTES: &str = "getAttributes";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcAttribute {
    namespace: String,
    friendly_name: String,
    #[serde(default)]
    value: Value,
}

impl RpcAttribute {
    fn full_name(&self) -> String {
        format!("{}:{}", self.namespace, self.friendly_name)
    }
}

pub struct RpcRegistryAdapter {
    connector: Arc<RpcConnector>,
}

impl RpcRegistryAdapter {
    pub fn new(connector: Arc<RpcConnector>) -> Self {
        Self { connector }
    }
}

/// Numeric ids travel as numbers; anything else as text
fn principal_param(principal: &PrincipalId) -> Value {
    principal
        .as_str()
        .parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(principal.as_str()))
}

#[async_trait]
impl RegistryAdapter for RpcRegistryAdapter {
    async fn get_user_attributes(
        &self,
        principal: &PrincipalId,
        attribute_names: &[String],
    ) -> Result<FetchedAttributes, FilterError> {
        if attribute_names.is_empty() {
            return Err(FilterError::invalid_config(
                "at least one attribute name is required to query the registry",
            ));
        }

        let mut params = RpcParams::new();
        params.insert("user".to_string(), principal_param(principal));
        params.insert("attrNames".to_string(), json!(attribute_names));

        let response = self
            .connector
            .get(ATTRIBUTES_MANAGER, GET_ATTRIBUTES, &params)
            .await?;

        let attributes: Vec<RpcAttribute> =
            serde_json::from_value(response.clone()).map_err(|e| FilterError::RegistryUnavailable {
                operation: format!("GET {}/{}", ATTRIBUTES_MANAGER, GET_ATTRIBUTES),
                params: format!("user={}", principal),
                response: response.to_string(),
                reason: format!("unexpected response structure: {}", e),
            })?;

        let mut fetched = FetchedAttributes::with_capacity(attributes.len());
        for attribute in attributes {
            let name = attribute.full_name();
            let value = RawValue::from_json(&name, &attribute.value)?;
            fetched.insert(name, value);
        }

        debug!(
            "Fetched {} of {} requested attributes for principal {}",
            fetched.len(),
            attribute_names.len(),
            principal
        );

        Ok(fetched)
    }
}
