// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

//! Registry RPC Connector
//!
//! Executes named manager/method calls against the registry's JSON RPC
//! endpoint and classifies every failure into [`FilterError`].
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Wire-level access to the registry
//! - **Integration:** Registry HTTP API → decoded JSON → registry adapters
//!
//! The registry is unreliable by nature. Calls carry an explicit timeout and
//! are never retried here; fallback is the host's decision.
//!
//! # Usage
//!
//! ```ignore
//! let connector = RpcConnector::new("https://registry.example.org/krb/rpc/", "proxy", "secret", Duration::from_secs(5))?;
//! let attrs = connector
//!     .get("attributesManager", "getAttributes", &params)
//!     .await?;
//! ```

use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::domain::config::RegistryConfig;
use crate::domain::errors::FilterError;

/// Ordered call parameters (JSON object semantics)
pub type RpcParams = Map<String, Value>;

pub struct RpcConnector {
    rpc_url: String,
    user: String,
    password: String,
    client: Client,
}

impl RpcConnector {
    pub fn new(
        rpc_url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FilterError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FilterError::invalid_config(format!("Cannot build HTTP client: {}", e)))?;

        let mut rpc_url = rpc_url.into();
        if !rpc_url.ends_with('/') {
            rpc_url.push('/');
        }

        Ok(Self {
            rpc_url,
            user: user.into(),
            password: password.into(),
            client,
        })
    }

    pub fn from_config(config: &RegistryConfig) -> Result<Self, FilterError> {
        if config.url.is_empty() {
            return Err(FilterError::invalid_config("registry.url cannot be empty"));
        }
        Self::new(
            config.url.clone(),
            config.user.clone(),
            config.resolve_password()?,
            config.timeout(),
        )
    }

    fn uri(&self, manager: &str, method: &str) -> String {
        format!("{}json/{}/{}", self.rpc_url, manager, method)
    }

    /// Call with URL-encoded query parameters
    pub async fn get(&self, manager: &str, method: &str, params: &RpcParams) -> Result<Value, FilterError> {
        let uri = self.uri(manager, method);
        let query = encode_query(params);
        let operation = format!("GET {}/{}", manager, method);

        let target = if query.is_empty() {
            uri.clone()
        } else {
            format!("{}?{}", uri, query)
        };

        let sent = self
            .client
            .get(&target)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await;

        let (status, body) = read_response(sent, &operation, &query).await?;
        debug!("registry RPC: GET call {} with params: {}, response: {}", uri, query, body);

        decode_response(status, &body, &operation, &query)
    }

    /// Call with a JSON body
    pub async fn post(&self, manager: &str, method: &str, params: &RpcParams) -> Result<Value, FilterError> {
        let uri = self.uri(manager, method);
        let params_json = Value::Object(params.clone()).to_string();
        let operation = format!("POST {}/{}", manager, method);

        let sent = self
            .client
            .post(&uri)
            .basic_auth(&self.user, Some(&self.password))
            .header("Content-Type", "application/json")
            .body(params_json.clone())
            .send()
            .await;

        let (status, body) = read_response(sent, &operation, &params_json).await?;
        debug!("registry RPC: POST call {} with params: {}, response: {}", uri, params_json, body);

        decode_response(status, &body, &operation, &params_json)
    }
}

async fn read_response(
    sent: reqwest::Result<reqwest::Response>,
    operation: &str,
    params: &str,
) -> Result<(StatusCode, String), FilterError> {
    let unavailable = |reason: String| FilterError::RegistryUnavailable {
        operation: operation.to_string(),
        params: params.to_string(),
        response: String::new(),
        reason,
    };

    let response = sent.map_err(|e| {
        let reason = if e.is_timeout() {
            format!("request timed out: {}", e)
        } else {
            format!("request failed: {}", e)
        };
        warn!("Registry call {} failed: {}", operation, reason);
        unavailable(reason)
    })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| unavailable(format!("failed to read response body: {}", e)))?;

    Ok((status, body))
}

/// Classify a raw registry response.
///
/// An `errorId` in the decoded body always wins over the HTTP status.
fn decode_response(status: StatusCode, body: &str, operation: &str, params: &str) -> Result<Value, FilterError> {
    let unavailable = |reason: String| FilterError::RegistryUnavailable {
        operation: operation.to_string(),
        params: params.to_string(),
        response: body.to_string(),
        reason,
    };

    let result: Value = serde_json::from_str(body)
        .map_err(|e| unavailable(format!("cannot decode response: {}", e)))?;

    if let Some(error_id) = result.get("errorId") {
        let field = |key: &str| {
            result
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let code = match error_id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        warn!("Registry rejected {}: {} ({})", operation, code, field("name"));
        return Err(FilterError::RegistryError {
            code,
            name: field("name"),
            message: format!("{}\ncall: {}, params: {}", field("message"), operation, params),
            operation: operation.to_string(),
        });
    }

    if !status.is_success() {
        return Err(unavailable(format!("HTTP {}", status)));
    }

    Ok(result)
}

/// Encode parameters as a query string.
///
/// Lists use repeated empty brackets (`name[]=a&name[]=b`); the registry
/// rejects positional indices.
pub fn encode_query(params: &RpcParams) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in params {
        append_param(&mut serializer, name, value);
    }
    serializer.finish()
}

fn append_param(serializer: &mut form_urlencoded::Serializer<'_, String>, name: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => {
            serializer.append_pair(name, s);
        }
        Value::Bool(b) => {
            serializer.append_pair(name, if *b { "1" } else { "0" });
        }
        Value::Number(n) => {
            serializer.append_pair(name, &n.to_string());
        }
        Value::Array(items) => {
            let key = format!("{}[]", name);
            for item in items {
                append_param(serializer, &key, item);
            }
        }
        Value::Object(entries) => {
            for (sub, item) in entries {
                append_param(serializer, &format!("{}[{}]", name, sub), item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> RpcParams {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_lists_use_empty_brackets() {
        let query = encode_query(&params(json!({
            "user": 3197,
            "attrNames": ["urn:a", "urn:b"]
        })));
        assert_eq!(query, "user=3197&attrNames%5B%5D=urn%3Aa&attrNames%5B%5D=urn%3Ab");
        assert!(!query.contains("%5B0%5D"));
    }

    #[test]
    fn test_nested_and_null_params() {
        let query = encode_query(&params(json!({"a": null, "b": {"c": "d"}, "e": true})));
        assert_eq!(query, "b%5Bc%5D=d&e=1");
    }

    #[test]
    fn test_error_id_wins_over_status() {
        let body = r#"{"errorId":"1a2b","name":"UserNotExistsException","message":"User not found"}"#;
        for status in [StatusCode::OK, StatusCode::INTERNAL_SERVER_ERROR] {
            match decode_response(status, body, "GET usersManager/getUserById", "id=1") {
                Err(FilterError::RegistryError { code, name, message, .. }) => {
                    assert_eq!(code, "1a2b");
                    assert_eq!(name, "UserNotExistsException");
                    assert!(message.starts_with("User not found"));
                }
                other => panic!("expected RegistryError, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_undecodable_body_is_unavailable() {
        let err = decode_response(StatusCode::OK, "<html>oops</html>", "GET m/x", "").unwrap_err();
        match err {
            FilterError::RegistryUnavailable { response, .. } => assert_eq!(response, "<html>oops</html>"),
            other => panic!("expected RegistryUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_non_success_without_error_id_is_unavailable() {
        let err = decode_response(StatusCode::BAD_GATEWAY, "{}", "GET m/x", "").unwrap_err();
        assert!(matches!(err, FilterError::RegistryUnavailable { .. }));
    }

    #[test]
    fn test_uri_layout() {
        let connector =
            RpcConnector::new("https://registry.example.org/krb/rpc", "u", "p", Duration::from_secs(1)).unwrap();
        assert_eq!(
            connector.uri("attributesManager", "getAttributes"),
            "https://registry.example.org/krb/rpc/json/attributesManager/getAttributes"
        );
    }
}
