// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

//! Attribute Values
//!
//! Closed set of value shapes the registry can return, and their
//! normalization into an ordered list of strings.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Absorb registry value heterogeneity in one place

use indexmap::IndexMap;
use serde_json::Value;

use super::errors::FilterError;

/// Canonical in-memory shape of any fetched or derived attribute value
pub type NormalizedValue = Vec<String>;

/// Attribute value as returned by the registry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RawValue {
    /// Attribute was not part of the response at all. Adapters leave such
    /// attributes out of their result instead of emitting this variant.
    #[default]
    Absent,
    /// Attribute is defined but has no value
    Null,
    Scalar(String),
    List(Vec<String>),
    /// Language-tagged or otherwise keyed value; keys are informational only
    Keyed(IndexMap<String, String>),
}

impl RawValue {
    /// Classify a decoded JSON value.
    ///
    /// Numbers, booleans and containers holding anything other than strings
    /// are rejected with [`FilterError::UnsupportedValueShape`].
    pub fn from_json(attribute_name: &str, value: &Value) -> Result<Self, FilterError> {
        let unsupported = || FilterError::UnsupportedValueShape {
            attribute_name: attribute_name.to_string(),
        };

        match value {
            Value::Null => Ok(RawValue::Null),
            Value::String(s) => Ok(RawValue::Scalar(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(unsupported))
                .collect::<Result<Vec<_>, _>>()
                .map(RawValue::List),
            Value::Object(entries) => entries
                .iter()
                .map(|(k, v)| {
                    v.as_str()
                        .map(|s| (k.clone(), s.to_string()))
                        .ok_or_else(unsupported)
                })
                .collect::<Result<IndexMap<_, _>, _>>()
                .map(RawValue::Keyed),
            Value::Bool(_) | Value::Number(_) => Err(unsupported()),
        }
    }

    /// Convert into the canonical ordered sequence. Total over every variant.
    pub fn normalize(self) -> NormalizedValue {
        match self {
            RawValue::Absent | RawValue::Null => Vec::new(),
            RawValue::Scalar(s) => vec![s],
            RawValue::List(items) => items,
            RawValue::Keyed(entries) => entries.into_values().collect(),
        }
    }
}
