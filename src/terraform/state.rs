//! Terraform state parsing.
//!
//! Decodes state bytes into a version-independent [`StateDocument`]. Only the
//! v4 JSON format (Terraform 0.12+, OpenTofu) is understood; the mapping code
//! never sees the wire structs.

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::error::ConfigError;

pub const SUPPORTED_VERSIONS: &[u64] = &[4];

#[derive(Debug, Clone, PartialEq)]
pub struct StateDocument {
    pub origin: String,
    pub version: u64,
    pub serial: Option<u64>,
    pub lineage: Option<String>,
    pub outputs: BTreeMap<String, serde_json::Value>,
    pub resources: Vec<StateResource>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateResource {
    pub mode: Option<String>,
    pub resource_type: Option<String>,
    pub name: Option<String>,
    pub module: Option<String>,
    pub provider: Option<String>,
    pub instances: Vec<ResourceInstance>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInstance {
    pub index_key: Option<serde_json::Value>,
    pub attributes: serde_json::Value,
}

impl StateResource {
    pub fn is_managed(&self) -> bool {
        self.mode.as_deref() == Some("managed")
    }

    /// Resource address, e.g. `module.web.yandex_compute_instance.node`.
    pub fn address(&self) -> String {
        let mut address = String::new();
        if let Some(module) = &self.module {
            address.push_str(module);
            address.push('.');
        }
        if self.mode.as_deref() == Some("data") {
            address.push_str("data.");
        }
        address.push_str(self.resource_type.as_deref().unwrap_or("<unknown>"));
        address.push('.');
        address.push_str(self.name.as_deref().unwrap_or("<unknown>"));
        address
    }

    /// `namespace/type` of the provider address, ignoring the registry host.
    ///
    /// `provider["registry.terraform.io/yandex-cloud/yandex"]` -> `yandex-cloud/yandex`
    pub fn provider_source(&self) -> Option<&str> {
        let provider = self.provider.as_deref()?;
        let start = provider.find("[\"")? + 2;
        let end = provider[start..].find("\"]")? + start;
        let source = &provider[start..end];
        let mut parts = source.rsplitn(3, '/');
        let kind = parts.next()?;
        let namespace = parts.next()?;
        let offset = source.len() - kind.len() - namespace.len() - 1;
        Some(&source[offset..])
    }
}

#[derive(Debug, Deserialize)]
struct VersionHeader {
    version: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct StateV4 {
    #[serde(default)]
    serial: Option<u64>,
    #[serde(default)]
    lineage: Option<String>,
    #[serde(default)]
    outputs: BTreeMap<String, OutputV4>,
    resources: Vec<ResourceV4>,
}

#[derive(Debug, Deserialize)]
struct OutputV4 {
    value: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ResourceV4 {
    #[serde(default)]
    mode: Option<String>,
    #[serde(rename = "type", default)]
    type_: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    module: Option<String>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    instances: Vec<InstanceV4>,
}

#[derive(Debug, Deserialize)]
struct InstanceV4 {
    #[serde(default)]
    index_key: Option<serde_json::Value>,
    #[serde(default)]
    attributes: serde_json::Value,
}

pub fn parse_state(bytes: &[u8], origin: &str) -> Result<StateDocument, ConfigError> {
    let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| {
        ConfigError::malformed(format!("state '{origin}' is not valid JSON: {e}"))
    })?;

    if !value.is_object() {
        return Err(ConfigError::malformed(format!(
            "state '{origin}' must be a JSON object"
        )));
    }

    let header: VersionHeader = serde_json::from_value(value.clone()).map_err(|e| {
        ConfigError::malformed(format!("state '{origin}' has an invalid `version` field: {e}"))
    })?;
    let version = header.version.ok_or_else(|| {
        ConfigError::malformed(format!("state '{origin}' is missing field `version`"))
    })?;

    match version {
        4 => parse_v4(value, origin),
        other => Err(ConfigError::malformed(format!(
            "state '{origin}' has unsupported format version {other} (supported: {SUPPORTED_VERSIONS:?})"
        ))),
    }
}

fn parse_v4(value: serde_json::Value, origin: &str) -> Result<StateDocument, ConfigError> {
    let state: StateV4 = serde_json::from_value(value).map_err(|e| {
        ConfigError::malformed(format!("state '{origin}' does not match the v4 schema: {e}"))
    })?;

    let outputs = state
        .outputs
        .into_iter()
        .filter_map(|(name, output)| output.value.map(|value| (name, value)))
        .collect();

    let resources: Vec<StateResource> = state
        .resources
        .into_iter()
        .map(|r| StateResource {
            mode: r.mode,
            resource_type: r.type_,
            name: r.name,
            module: r.module,
            provider: r.provider,
            instances: r
                .instances
                .into_iter()
                .map(|i| ResourceInstance {
                    index_key: i.index_key,
                    attributes: i.attributes,
                })
                .collect(),
        })
        .collect();

    let mut seen = HashSet::new();
    for resource in &resources {
        let address = resource.address();
        if !seen.insert(address.clone()) {
            return Err(ConfigError::malformed(format!(
                "state '{origin}' contains duplicate resource address '{address}'"
            )));
        }
    }

    Ok(StateDocument {
        origin: origin.to_string(),
        version: 4,
        serial: state.serial,
        lineage: state.lineage,
        outputs,
        resources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    const SAMPLE: &str = r#"{
        "version": 4,
        "terraform_version": "1.5.7",
        "serial": 12,
        "lineage": "3c1a7b3e-0000-4000-8000-000000000000",
        "outputs": {
            "k8_master_ips": { "value": ["192.168.1.101"], "type": ["list", "string"] },
            "broken": { "type": "string" }
        },
        "resources": [
            {
                "mode": "managed",
                "type": "yandex_compute_instance",
                "name": "node",
                "module": "module.k8s",
                "provider": "provider[\"registry.terraform.io/yandex-cloud/yandex\"]",
                "instances": [
                    { "index_key": 0, "attributes": { "hostname": "k8-node-01" } },
                    { "index_key": 1, "attributes": { "hostname": "k8-node-02" } }
                ]
            },
            {
                "mode": "data",
                "type": "yandex_compute_image",
                "name": "ubuntu",
                "provider": "provider[\"registry.terraform.io/yandex-cloud/yandex\"]",
                "instances": [ { "attributes": { "id": "fd8" } } ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_v4_state() {
        let doc = parse_state(SAMPLE.as_bytes(), "prod/k8s.tfstate").unwrap();
        assert_eq!(doc.origin, "prod/k8s.tfstate");
        assert_eq!(doc.version, 4);
        assert_eq!(doc.serial, Some(12));
        assert_eq!(doc.resources.len(), 2);
        assert_eq!(doc.resources[0].instances.len(), 2);
        assert_eq!(
            doc.resources[0].instances[1].attributes["hostname"],
            "k8-node-02"
        );
        assert_eq!(
            doc.outputs["k8_master_ips"],
            serde_json::json!(["192.168.1.101"])
        );
        assert!(!doc.outputs.contains_key("broken"));
    }

    #[test]
    fn test_resource_addresses() {
        let doc = parse_state(SAMPLE.as_bytes(), "s").unwrap();
        let addresses: Vec<String> = doc.resources.iter().map(StateResource::address).collect();
        assert_eq!(
            addresses,
            vec![
                "module.k8s.yandex_compute_instance.node".to_string(),
                "data.yandex_compute_image.ubuntu".to_string(),
            ]
        );
        assert!(doc.resources[0].is_managed());
        assert!(!doc.resources[1].is_managed());
    }

    #[test]
    fn test_provider_source_ignores_registry_host() {
        let mut resource = parse_state(SAMPLE.as_bytes(), "s").unwrap().resources[0].clone();
        assert_eq!(resource.provider_source(), Some("yandex-cloud/yandex"));

        resource.provider =
            Some("provider[\"registry.opentofu.org/dmacvicar/libvirt\"]".to_string());
        assert_eq!(resource.provider_source(), Some("dmacvicar/libvirt"));

        resource.provider = Some("module.a.provider[\"registry.terraform.io/hashicorp/aws\"].eu".to_string());
        assert_eq!(resource.provider_source(), Some("hashicorp/aws"));

        resource.provider = Some("provider.aws".to_string());
        assert_eq!(resource.provider_source(), None);
    }

    #[test]
    fn test_invalid_json_reports_position() {
        let err = parse_state(b"{\n  \"version\": 4,\n  oops\n}", "bad.tfstate").unwrap_err();
        assert_eq!(err.category, ErrorCategory::MalformedDocument);
        assert!(err.message.contains("bad.tfstate"));
        assert!(err.message.contains("line 3"), "{}", err.message);
    }

    #[test]
    fn test_missing_resources_field() {
        let err = parse_state(br#"{"version": 4, "outputs": {}}"#, "x").unwrap_err();
        assert_eq!(err.category, ErrorCategory::MalformedDocument);
        assert!(err.message.contains("missing field `resources`"), "{}", err.message);
    }

    #[test]
    fn test_missing_version_field() {
        let err = parse_state(br#"{"resources": []}"#, "x").unwrap_err();
        assert_eq!(err.category, ErrorCategory::MalformedDocument);
        assert!(err.message.contains("`version`"));
    }

    #[test]
    fn test_unsupported_version() {
        let err = parse_state(br#"{"version": 3, "modules": []}"#, "old").unwrap_err();
        assert_eq!(err.category, ErrorCategory::MalformedDocument);
        assert!(err.message.contains("unsupported format version 3"));
    }

    #[test]
    fn test_non_object_document() {
        let err = parse_state(b"[1, 2]", "list").unwrap_err();
        assert_eq!(err.category, ErrorCategory::MalformedDocument);
    }

    #[test]
    fn test_duplicate_addresses_rejected() {
        let json = r#"{
            "version": 4,
            "resources": [
                { "mode": "managed", "type": "aws_instance", "name": "web", "instances": [] },
                { "mode": "managed", "type": "aws_instance", "name": "web", "instances": [] }
            ]
        }"#;
        let err = parse_state(json.as_bytes(), "dup").unwrap_err();
        assert_eq!(err.category, ErrorCategory::MalformedDocument);
        assert!(err.message.contains("aws_instance.web"));
    }

    #[test]
    fn test_empty_resources_is_valid() {
        let doc = parse_state(br#"{"version": 4, "resources": []}"#, "empty").unwrap();
        assert!(doc.resources.is_empty());
        assert!(doc.outputs.is_empty());
    }
}
