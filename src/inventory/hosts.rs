use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::error::ConfigError;
use crate::terraform::{ResourceInstance, StateResource};

/// A host taken from one resource instance of a state document.
#[derive(Debug, Clone, PartialEq)]
pub struct HostRecord {
    pub name: String,
    pub ip_address: Option<String>,
    pub nat_ip_address: Option<String>,
    pub resource_type: String,
    pub address: String,
    pub module: Option<String>,
    pub labels: BTreeMap<String, String>,
}

impl fmt::Display for HostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (ip: {}, nat ip: {}, from {})",
            self.name,
            self.ip_address.as_deref().unwrap_or("-"),
            self.nat_ip_address.as_deref().unwrap_or("-"),
            self.address
        )
    }
}

/// Host fields found in a resource instance's attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedHost {
    pub name: String,
    pub ip_address: Option<String>,
    pub nat_ip_address: Option<String>,
    pub labels: BTreeMap<String, String>,
}

impl ExtractedHost {
    pub fn into_record(self, resource: &StateResource, instance: &ResourceInstance) -> HostRecord {
        let mut address = resource.address();
        if let Some(index) = &instance.index_key {
            address.push_str(&format!("[{index}]"));
        }
        HostRecord {
            name: self.name,
            ip_address: self.ip_address,
            nat_ip_address: self.nat_ip_address,
            resource_type: resource.resource_type.clone().unwrap_or_default(),
            address,
            module: resource.module.clone(),
            labels: self.labels,
        }
    }
}

/// Knows how to read hosts out of one host-bearing resource type.
pub trait HostExtractor: Send + Sync {
    fn resource_type(&self) -> &'static str;

    /// Provider `namespace/type` the resource type belongs to.
    fn provider(&self) -> &'static str;

    fn extract(&self, attributes: &Value) -> Option<ExtractedHost>;
}

pub struct LibvirtDomain;
pub struct YandexComputeInstance;
pub struct AwsInstance;

const LIBVIRT_NAT_KEYS: &[&str] = &["macvtap", "bridge", "vepa", "passthrough"];

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

impl HostExtractor for LibvirtDomain {
    fn resource_type(&self) -> &'static str {
        "libvirt_domain"
    }

    fn provider(&self) -> &'static str {
        "dmacvicar/libvirt"
    }

    fn extract(&self, attributes: &Value) -> Option<ExtractedHost> {
        let interfaces = attributes.get("network_interface")?.as_array()?;
        let name = non_empty_str(interfaces.first()?, "hostname")?.to_string();

        let mut ip_address = None;
        let mut nat_ip_address = None;
        for interface in interfaces {
            let first_address = interface
                .get("addresses")
                .and_then(Value::as_array)
                .and_then(|a| a.first())
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty());

            if ip_address.is_none() && non_empty_str(interface, "network_id").is_some() {
                ip_address = first_address.map(str::to_string);
            }
            if nat_ip_address.is_none()
                && LIBVIRT_NAT_KEYS
                    .iter()
                    .any(|key| non_empty_str(interface, key).is_some())
            {
                nat_ip_address = first_address.map(str::to_string);
            }
            if ip_address.is_some() && nat_ip_address.is_some() {
                break;
            }
        }

        Some(ExtractedHost {
            name,
            ip_address,
            nat_ip_address,
            labels: BTreeMap::new(),
        })
    }
}

impl HostExtractor for YandexComputeInstance {
    fn resource_type(&self) -> &'static str {
        "yandex_compute_instance"
    }

    fn provider(&self) -> &'static str {
        "yandex-cloud/yandex"
    }

    fn extract(&self, attributes: &Value) -> Option<ExtractedHost> {
        let name = non_empty_str(attributes, "hostname")
            .or_else(|| non_empty_str(attributes, "name"))?
            .to_string();

        let interfaces = attributes
            .get("network_interface")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let ip_address = interfaces
            .iter()
            .find_map(|i| non_empty_str(i, "ip_address"))
            .map(str::to_string);
        let nat_ip_address = interfaces
            .iter()
            .find_map(|i| non_empty_str(i, "nat_ip_address"))
            .map(str::to_string);

        Some(ExtractedHost {
            name,
            ip_address,
            nat_ip_address,
            labels: string_map(attributes.get("labels")),
        })
    }
}

impl HostExtractor for AwsInstance {
    fn resource_type(&self) -> &'static str {
        "aws_instance"
    }

    fn provider(&self) -> &'static str {
        "hashicorp/aws"
    }

    fn extract(&self, attributes: &Value) -> Option<ExtractedHost> {
        let tags = string_map(attributes.get("tags"));
        let name = tags
            .get("Name")
            .filter(|n| !n.is_empty())
            .cloned()
            .or_else(|| non_empty_str(attributes, "id").map(str::to_string))?;

        Some(ExtractedHost {
            name,
            ip_address: non_empty_str(attributes, "private_ip").map(str::to_string),
            nat_ip_address: non_empty_str(attributes, "public_ip").map(str::to_string),
            labels: tags,
        })
    }
}

pub fn default_extractors() -> Vec<Box<dyn HostExtractor>> {
    vec![
        Box::new(LibvirtDomain),
        Box::new(YandexComputeInstance),
        Box::new(AwsInstance),
    ]
}

pub fn supported_resource_types() -> Vec<&'static str> {
    default_extractors()
        .iter()
        .map(|e| e.resource_type())
        .collect()
}

/// Extractors restricted to `allowlist`; `None` means every supported type.
pub fn extractors_for(
    allowlist: Option<&[String]>,
) -> Result<Vec<Box<dyn HostExtractor>>, ConfigError> {
    let Some(allowlist) = allowlist else {
        return Ok(default_extractors());
    };

    let supported = supported_resource_types();
    if let Some(unknown) = allowlist
        .iter()
        .find(|t| !supported.contains(&t.as_str()))
    {
        return Err(ConfigError::configuration(format!(
            "resource type '{unknown}' is not supported (supported: {})",
            supported.join(", ")
        )));
    }

    Ok(default_extractors()
        .into_iter()
        .filter(|e| allowlist.iter().any(|t| t == e.resource_type()))
        .collect())
}
