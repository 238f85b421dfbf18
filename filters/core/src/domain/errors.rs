// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

//! Filter Errors
//!
//! Error taxonomy shared by the registry client, the value normalizer and both
//! processing filters.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Typed failures propagated to the hosting pipeline

/// Errors raised while constructing or running attribute filters
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// Operator error in configuration. Raised before any request is processed.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Upstream identity resolution did not populate `identity.principalId`.
    #[error("Principal id not present in request state")]
    MissingPrincipal,

    /// Transport, timeout or decoding failure while talking to the registry.
    #[error("Registry unavailable during {operation}: {reason} (params: {params}, response: {response})")]
    RegistryUnavailable {
        operation: String,
        params: String,
        response: String,
        reason: String,
    },

    /// The registry decoded the request and rejected it.
    #[error("Registry error {code} ({name}) during {operation}: {message}")]
    RegistryError {
        code: String,
        name: String,
        message: String,
        operation: String,
    },

    #[error("Unsupported value shape for attribute '{attribute_name}'. Supported: null, string, list, map")]
    UnsupportedValueShape { attribute_name: String },
}

impl FilterError {
    /// Configuration errors indicate an operator mistake and must abort startup.
    /// Everything else is a per-request condition left to host policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FilterError::InvalidConfiguration(_) | FilterError::UnsupportedValueShape { .. }
        )
    }

    /// Whether the error came from the registry round-trip
    pub fn is_registry_failure(&self) -> bool {
        matches!(
            self,
            FilterError::RegistryUnavailable { .. } | FilterError::RegistryError { .. }
        )
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!("Configuration error: {}", message);
        FilterError::InvalidConfiguration(message)
    }
}
