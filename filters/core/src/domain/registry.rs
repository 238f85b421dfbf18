// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

// Registry Domain Interface (Anti-Corruption Layer)
//
// Isolates filters from the registry's wire protocol. Implementations live in
// infrastructure/; each interface flavor (RPC today) provides one adapter.

use async_trait::async_trait;
use indexmap::IndexMap;

use super::errors::FilterError;
use super::state::PrincipalId;
use super::value::RawValue;

/// Fetched attributes keyed by registry attribute name, in response order
pub type FetchedAttributes = IndexMap<String, RawValue>;

#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    /// Fetch the named attributes of a principal.
    ///
    /// `attribute_names` must be non-empty. Names unknown to the registry are
    /// simply missing from the result; a defined attribute without a value is
    /// returned as [`RawValue::Null`].
    async fn get_user_attributes(
        &self,
        principal: &PrincipalId,
        attribute_names: &[String],
    ) -> Result<FetchedAttributes, FilterError>;
}
