use fedattr_core::{FilterChain, FilterConfigManifest, FilterError, FilterOutcome, RequestState};
use mockito::Matcher;
use serde_json::json;
use std::io::Write;

fn manifest_yaml(registry_url: &str) -> String {
    format!(
        r#"
apiVersion: fedattr/v1
kind: FilterConfig
metadata:
  name: test-proxy
spec:
  registry:
    url: {registry_url}
    user: proxy
    password: secret
    timeout_secs: 2
  filters:
    - type: attributes
      attrMap:
        "urn:perun:user:attribute-def:def:cscaleUserCategory": cscaleUserCategory
        "urn:perun:user:attribute-def:def:preferredMail": [mail, email]
    - type: capabilities
      urnNamespace: "urn:mace:egi.eu"
      urnAuthority: aai.egi.eu
      resAttrMap:
        cscaleUserCategory: "c-scale:user-category"
"#
    )
}

#[tokio::test]
async fn test_mapper_feeds_synthesizer() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/json/attributesManager/getAttributes")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!([
                {"namespace": "urn:perun:user:attribute-def:def", "friendlyName": "cscaleUserCategory", "value": ["premium", "", "premium"]},
                {"namespace": "urn:perun:user:attribute-def:def", "friendlyName": "preferredMail", "value": "alice@example.org"}
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let manifest = FilterConfigManifest::from_yaml_str(&manifest_yaml(&server.url())).unwrap();
    let chain = FilterChain::from_config(&manifest).unwrap();
    assert_eq!(chain.len(), 2);

    let mut state: RequestState = serde_json::from_value(json!({
        "Attributes": {"mail": ["old@example.org"]},
        "identity": {"principalId": 3197},
        "SPMetadata": {"entityid": "https://sp.example.org"}
    }))
    .unwrap();

    let outcome = chain.run(&mut state).await.unwrap();
    assert_eq!(outcome, FilterOutcome::Continue);

    assert_eq!(state.attribute("mail").unwrap(), ["old@example.org", "alice@example.org"]);
    assert_eq!(state.attribute("email").unwrap(), ["alice@example.org"]);
    assert_eq!(state.attribute("cscaleUserCategory").unwrap(), ["premium", "", "premium"]);
    assert_eq!(
        state.attribute("eduPersonEntitlement").unwrap(),
        ["urn:mace:egi.eu:res:c-scale:user-category:premium#aai.egi.eu"]
    );
    assert!(state.extra.contains_key("SPMetadata"));
}

#[tokio::test]
async fn test_registry_outage_propagates_from_chain() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/json/attributesManager/getAttributes")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("Service Unavailable")
        .create_async()
        .await;

    let manifest = FilterConfigManifest::from_yaml_str(&manifest_yaml(&server.url())).unwrap();
    let chain = FilterChain::from_config(&manifest).unwrap();

    let mut state = RequestState::with_principal("3197");
    let err = chain.run(&mut state).await.unwrap_err();

    assert!(err.is_registry_failure());
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn test_missing_principal_skips_mapper_only() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/json/attributesManager/getAttributes")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let manifest = FilterConfigManifest::from_yaml_str(&manifest_yaml(&server.url())).unwrap();
    let chain = FilterChain::from_config(&manifest).unwrap();

    let mut state = RequestState::new();
    state
        .attributes
        .insert("cscaleUserCategory".into(), vec!["standard".into()]);

    chain.run(&mut state).await.unwrap();

    mock.assert_async().await;
    assert_eq!(
        state.attribute("eduPersonEntitlement").unwrap(),
        ["urn:mace:egi.eu:res:c-scale:user-category:standard#aai.egi.eu"]
    );
}

#[test]
fn test_missing_attr_map_fails_chain_construction() {
    let yaml = r#"
apiVersion: fedattr/v1
kind: FilterConfig
metadata:
  name: broken
spec:
  registry:
    url: https://registry.example.org/rpc/
  filters:
    - type: attributes
"#;
    let manifest = FilterConfigManifest::from_yaml_str(yaml).unwrap();
    let err = FilterChain::from_config(&manifest).err().unwrap();
    assert!(matches!(err, FilterError::InvalidConfiguration(ref m) if m.contains("attrMap")));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(manifest_yaml("https://registry.example.org/rpc/").as_bytes())
        .unwrap();

    let manifest = FilterConfigManifest::load(Some(file.path().to_path_buf())).unwrap();
    assert_eq!(manifest.metadata.name, "test-proxy");
    assert_eq!(manifest.spec.filters.len(), 2);
}

fn two_mapper_yaml(registry_interface: &str, second_interface: &str) -> String {
    format!(
        r#"
apiVersion: fedattr/v1
kind: FilterConfig
metadata:
  name: interfaces
spec:
  registry:
    url: https://registry.example.org/rpc/
    interface: {registry_interface}
  filters:
    - type: attributes
      attrMap:
        "urn:perun:user:attribute-def:def:preferredMail": mail
    - type: attributes
      interface: {second_interface}
      attrMap:
        "urn:perun:user:attribute-def:def:displayName": displayName
"#
    )
}

#[test]
fn test_registry_level_ldap_interface_rejected() {
    let yaml = r#"
apiVersion: fedattr/v1
kind: FilterConfig
metadata:
  name: ldap-registry
spec:
  registry:
    url: https://registry.example.org/rpc/
    interface: ldap
  filters:
    - type: attributes
      attrMap:
        "urn:perun:user:attribute-def:def:preferredMail": mail
"#;
    let manifest = FilterConfigManifest::from_yaml_str(yaml).unwrap();
    let err = FilterChain::from_config(&manifest).err().unwrap();
    assert!(matches!(err, FilterError::InvalidConfiguration(ref m) if m.contains("ldap")));
}

#[test]
fn test_second_filter_ldap_interface_rejected() {
    let manifest = FilterConfigManifest::from_yaml_str(&two_mapper_yaml("rpc", "ldap")).unwrap();
    let err = FilterChain::from_config(&manifest).err().unwrap();
    assert!(matches!(err, FilterError::InvalidConfiguration(ref m) if m.contains("ldap")));
}

#[test]
fn test_filter_interface_overrides_registry_default() {
    let manifest = FilterConfigManifest::from_yaml_str(&two_mapper_yaml("ldap", "rpc")).unwrap();
    // First filter inherits ldap from the registry section
    assert!(FilterChain::from_config(&manifest).is_err());

    let manifest = FilterConfigManifest::from_yaml_str(&two_mapper_yaml("rpc", "rpc")).unwrap();
    let chain = FilterChain::from_config(&manifest).unwrap();
    assert_eq!(chain.len(), 2);
}
