// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

// Filter Configuration Types
//
// Defines the configuration schema consumed at construction time:
// - Manifest format (apiVersion/kind/metadata/spec)
// - Registry connection parameters
// - Ordered filter definitions (attribute mapping, capability synthesis)
//
// Polymorphic destination shapes are collapsed into one canonical ordered
// sequence here so request-time code only handles a single shape.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::errors::FilterError;

pub const API_VERSION: &str = "fedattr/v1";
pub const KIND: &str = "FilterConfig";
pub const DEFAULT_CAPABILITY_ATTRIBUTE: &str = "eduPersonEntitlement";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfigManifest {
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: FilterConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfigSpec {
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Filters in pipeline order
    #[serde(default)]
    pub filters: Vec<FilterDefinition>,
}

/// Transport flavor used to reach the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryInterface {
    #[default]
    Rpc,
    Ldap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// RPC base URL; `json/{manager}/{method}` is appended per call
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub user: String,

    /// Plain value or `env:VAR_NAME`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub interface: RegistryInterface,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: None,
            timeout_secs: default_timeout_secs(),
            interface: RegistryInterface::default(),
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the password (supports "env:VAR_NAME" syntax)
    pub fn resolve_password(&self) -> Result<String, FilterError> {
        match &self.password {
            Some(p) => match p.strip_prefix("env:") {
                Some(var_name) => std::env::var(var_name).map_err(|_| {
                    FilterError::invalid_config(format!(
                        "Environment variable not set: {}",
                        var_name
                    ))
                }),
                None => Ok(p.clone()),
            },
            None => Ok(String::new()),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// One configured pipeline filter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterDefinition {
    Attributes(AttributeMapperConfig),
    Capabilities(CapabilitySynthesizerConfig),
}

impl FilterDefinition {
    pub fn kind(&self) -> &'static str {
        match self {
            FilterDefinition::Attributes(_) => "attributes",
            FilterDefinition::Capabilities(_) => "capabilities",
        }
    }
}

/// Destination configured either as one name or an ordered list of names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DestinationSpec {
    One(String),
    Many(Vec<String>),
}

impl DestinationSpec {
    fn into_names(self) -> Vec<String> {
        match self {
            DestinationSpec::One(name) => vec![name],
            DestinationSpec::Many(names) => names,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeMapperConfig {
    #[serde(rename = "attrMap", default, skip_serializing_if = "Option::is_none")]
    pub attr_map: Option<IndexMap<String, DestinationSpec>>,

    /// Overrides `registry.interface` for this filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<RegistryInterface>,
}

impl AttributeMapperConfig {
    /// Interface this filter talks to the registry through
    pub fn effective_interface(&self, registry: &RegistryConfig) -> RegistryInterface {
        self.interface.unwrap_or(registry.interface)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilitySynthesizerConfig {
    #[serde(rename = "capabilityAttribute", default, skip_serializing_if = "Option::is_none")]
    pub capability_attribute: Option<String>,

    #[serde(rename = "urnNamespace", default, skip_serializing_if = "Option::is_none")]
    pub urn_namespace: Option<String>,

    #[serde(rename = "urnAuthority", default, skip_serializing_if = "Option::is_none")]
    pub urn_authority: Option<String>,

    #[serde(rename = "resAttrMap", default, skip_serializing_if = "Option::is_none")]
    pub res_attr_map: Option<IndexMap<String, String>>,
}

/// Registry attribute name -> destination attribute names (never empty)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap(IndexMap<String, Vec<String>>);

impl AttributeMap {
    pub fn new(entries: IndexMap<String, DestinationSpec>) -> Result<Self, FilterError> {
        let mut map = IndexMap::with_capacity(entries.len());
        for (source, spec) in entries {
            let destinations = spec.into_names();
            if destinations.is_empty() {
                return Err(FilterError::invalid_config(format!(
                    "attrMap entry '{}' has no destination attribute",
                    source
                )));
            }
            if destinations.iter().any(|d| d.is_empty()) {
                return Err(FilterError::invalid_config(format!(
                    "attrMap entry '{}' has an empty destination name",
                    source
                )));
            }
            map.insert(source, destinations);
        }
        Ok(Self(map))
    }

    pub fn destinations(&self, source: &str) -> Option<&[String]> {
        self.0.get(source).map(Vec::as_slice)
    }

    pub fn source_names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Source attribute name -> resource label, in configuration order
pub type ResourceAttributeMap = IndexMap<String, String>;

impl FilterConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml_str(&content)?)
    }

    /// Parse configuration; shape errors surface as `InvalidConfiguration`
    pub fn from_yaml_str(yaml: &str) -> Result<Self, FilterError> {
        serde_yaml::from_str(yaml).map_err(|e| FilterError::invalid_config(e.to_string()))
    }

    /// Discover configuration file using precedence order
    /// 1. FEDATTR_CONFIG_PATH environment variable
    /// 2. ./fedattr.yaml (working directory)
    /// 3. /etc/fedattr/config.yaml
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("FEDATTR_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./fedattr.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        let system_config = PathBuf::from("/etc/fedattr/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load from an explicit path or discovery. Absence is an error.
    pub fn load(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let path = match cli_path.or_else(Self::discover_config) {
            Some(path) => path,
            None => anyhow::bail!("No configuration file found in standard locations"),
        };
        tracing::info!("Loading configuration from {:?}", path);
        let mut config = Self::from_yaml_file(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the registry section
    pub fn apply_env_overrides(&mut self) {
        let registry = &mut self.spec.registry;

        if let Ok(val) = std::env::var("FEDATTR_REGISTRY_URL") {
            tracing::info!("Environment override: FEDATTR_REGISTRY_URL={}", val);
            registry.url = val;
        }
        if let Ok(val) = std::env::var("FEDATTR_REGISTRY_USER") {
            tracing::info!("Environment override: FEDATTR_REGISTRY_USER={}", val);
            registry.user = val;
        }
        if let Ok(val) = std::env::var("FEDATTR_REGISTRY_PASSWORD") {
            tracing::info!("Environment override: FEDATTR_REGISTRY_PASSWORD=<redacted>");
            registry.password = Some(val);
        }
        if let Ok(val) = std::env::var("FEDATTR_REGISTRY_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => {
                    tracing::info!("Environment override: FEDATTR_REGISTRY_TIMEOUT_SECS={}", secs);
                    registry.timeout_secs = secs;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for FEDATTR_REGISTRY_TIMEOUT_SECS: '{}'. Expected a positive integer. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if self.api_version != API_VERSION {
            return Err(FilterError::invalid_config(format!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version, API_VERSION
            )));
        }

        if self.kind != KIND {
            return Err(FilterError::invalid_config(format!(
                "Invalid kind: '{}'. Must be '{}'",
                self.kind, KIND
            )));
        }

        if self.spec.registry.timeout_secs == 0 {
            return Err(FilterError::invalid_config("registry.timeout_secs must be positive"));
        }

        let needs_registry = self
            .spec
            .filters
            .iter()
            .any(|f| matches!(f, FilterDefinition::Attributes(_)));
        if needs_registry && self.spec.registry.url.is_empty() {
            return Err(FilterError::invalid_config(
                "registry.url cannot be empty when an attributes filter is configured",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
apiVersion: fedattr/v1
kind: FilterConfig
metadata:
  name: egi-proxy
spec:
  registry:
    url: https://perun.example.org/krb/rpc/
    user: proxy
    password: secret
  filters:
    - type: attributes
      attrMap:
        "urn:perun:user:attribute-def:def:preferredMail": mail
        "urn:perun:user:attribute-def:virt:eduPersonEntitlement":
          - eduPersonEntitlement
          - entitlement
    - type: capabilities
      urnNamespace: "urn:mace:egi.eu"
      urnAuthority: aai.egi.eu
      resAttrMap:
        cscaleUserCategory: "c-scale:user-category"
        cscaleCompany: "c-scale:company"
"#;

    #[test]
    fn test_parse_sample() {
        let manifest = FilterConfigManifest::from_yaml_str(SAMPLE).unwrap();
        manifest.validate().unwrap();

        assert_eq!(manifest.spec.registry.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(manifest.spec.registry.interface, RegistryInterface::Rpc);
        assert_eq!(manifest.spec.filters.len(), 2);

        let FilterDefinition::Attributes(attrs) = &manifest.spec.filters[0] else {
            panic!("expected attributes filter first");
        };
        let map = AttributeMap::new(attrs.attr_map.clone().unwrap()).unwrap();
        assert_eq!(
            map.destinations("urn:perun:user:attribute-def:def:preferredMail").unwrap(),
            ["mail"]
        );
        assert_eq!(
            map.destinations("urn:perun:user:attribute-def:virt:eduPersonEntitlement")
                .unwrap(),
            ["eduPersonEntitlement", "entitlement"]
        );

        let FilterDefinition::Capabilities(caps) = &manifest.spec.filters[1] else {
            panic!("expected capabilities filter second");
        };
        let keys: Vec<_> = caps.res_attr_map.as_ref().unwrap().keys().collect();
        assert_eq!(keys, ["cscaleUserCategory", "cscaleCompany"]);
    }

    #[test]
    fn test_destination_of_wrong_shape_is_rejected() {
        let yaml = SAMPLE.replace("preferredMail\": mail", "preferredMail\": {nested: true}");
        let err = FilterConfigManifest::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, FilterError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_non_string_namespace_is_rejected() {
        let yaml = SAMPLE.replace("urnNamespace: \"urn:mace:egi.eu\"", "urnNamespace: [a, b]");
        assert!(FilterConfigManifest::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_empty_destination_list_is_rejected() {
        let mut entries = IndexMap::new();
        entries.insert("a".to_string(), DestinationSpec::Many(vec![]));
        assert!(matches!(
            AttributeMap::new(entries),
            Err(FilterError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_validation() {
        let mut manifest = FilterConfigManifest::from_yaml_str(SAMPLE).unwrap();
        manifest.api_version = "v0".into();
        assert!(manifest.validate().is_err());

        let mut manifest = FilterConfigManifest::from_yaml_str(SAMPLE).unwrap();
        manifest.spec.registry.url.clear();
        assert!(manifest.validate().is_err());

        manifest.spec.filters.remove(0);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_effective_interface() {
        let registry = RegistryConfig {
            interface: RegistryInterface::Ldap,
            ..RegistryConfig::default()
        };

        let inherited = AttributeMapperConfig::default();
        assert_eq!(inherited.effective_interface(&registry), RegistryInterface::Ldap);

        let overridden = AttributeMapperConfig {
            interface: Some(RegistryInterface::Rpc),
            ..AttributeMapperConfig::default()
        };
        assert_eq!(overridden.effective_interface(&registry), RegistryInterface::Rpc);
    }

    #[test]
    fn test_password_indirection() {
        let registry = RegistryConfig {
            password: Some("env:FEDATTR_TEST_SURELY_UNSET_VAR".into()),
            ..RegistryConfig::default()
        };
        assert!(registry.resolve_password().is_err());

        let registry = RegistryConfig {
            password: Some("plain".into()),
            ..RegistryConfig::default()
        };
        assert_eq!(registry.resolve_password().unwrap(), "plain");
    }
}
