// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

//! Request State
//!
//! Per-authentication data bag shared by every step of the login pipeline.
//! Filters only ever touch `Attributes`; the rest of the document is carried
//! through untouched.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Released attributes: name -> ordered values. Order and duplicates inside one
/// attribute are significant (entitlements in particular).
pub type Attributes = IndexMap<String, Vec<String>>;

/// Registry identifier of the authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "PrincipalIdRepr", into = "String")]
pub struct PrincipalId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum PrincipalIdRepr {
    Text(String),
    Numeric(u64),
}

impl From<PrincipalIdRepr> for PrincipalId {
    fn from(repr: PrincipalIdRepr) -> Self {
        match repr {
            PrincipalIdRepr::Text(s) => PrincipalId(s),
            PrincipalIdRepr::Numeric(n) => PrincipalId(n.to_string()),
        }
    }
}

impl From<PrincipalId> for String {
    fn from(id: PrincipalId) -> Self {
        id.0
    }
}

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output of upstream identity resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "principalId", default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<PrincipalId>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestState {
    #[serde(rename = "Attributes", default)]
    pub attributes: Attributes,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,

    /// Host-owned keys not interpreted here
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RequestState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State with a resolved principal, as left behind by identity resolution
    pub fn with_principal(principal_id: impl Into<String>) -> Self {
        Self {
            identity: Some(Identity {
                principal_id: Some(PrincipalId::new(principal_id)),
                extra: serde_json::Map::new(),
            }),
            ..Self::default()
        }
    }

    pub fn principal_id(&self) -> Option<&PrincipalId> {
        self.identity.as_ref().and_then(|i| i.principal_id.as_ref())
    }

    pub fn attribute(&self, name: &str) -> Option<&[String]> {
        self.attributes.get(name).map(Vec::as_slice)
    }

    /// Append values to an attribute, keeping whatever it already holds
    pub fn append_values(&mut self, name: &str, values: &[String]) {
        self.attributes
            .entry(name.to_string())
            .or_default()
            .extend_from_slice(values);
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
