use std::collections::BTreeMap;

use serde_json::Value;

use super::hosts::{HostExtractor, HostRecord, extractors_for};
use super::naming::{host_group_name, label_group_name, sanitize_group_name};
use super::InventoryResult;
use crate::config::{DEFAULT_HOSTS_GROUPS_POSTFIX, GroupBy, InventoryConfig};
use crate::error::ConfigError;
use crate::terraform::StateDocument;

#[derive(Debug, Clone, PartialEq)]
pub struct MappingOptions {
    pub collect_public_ips: bool,
    pub create_hosts_groups: bool,
    pub hosts_groups_postfix: Option<String>,
    pub group_by: Vec<GroupBy>,
    pub group_variables_from_output: BTreeMap<String, Vec<String>>,
    pub host_variables_from_output: BTreeMap<String, Vec<String>>,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            collect_public_ips: false,
            create_hosts_groups: true,
            hosts_groups_postfix: Some(DEFAULT_HOSTS_GROUPS_POSTFIX.to_string()),
            group_by: Vec::new(),
            group_variables_from_output: BTreeMap::new(),
            host_variables_from_output: BTreeMap::new(),
        }
    }
}

impl MappingOptions {
    pub fn from_config(config: &InventoryConfig) -> Self {
        Self {
            collect_public_ips: config.collect_public_ips,
            create_hosts_groups: config.create_hosts_groups,
            hosts_groups_postfix: config.hosts_groups_postfix.clone(),
            group_by: config.group_by.clone(),
            group_variables_from_output: config.group_variables_from_output.clone(),
            host_variables_from_output: config.host_variables_from_output.clone(),
        }
    }
}

/// Turns parsed state documents into an inventory.
pub struct InventoryMapper {
    extractors: Vec<Box<dyn HostExtractor>>,
    options: MappingOptions,
}

impl InventoryMapper {
    pub fn new(extractors: Vec<Box<dyn HostExtractor>>, options: MappingOptions) -> Self {
        Self { extractors, options }
    }

    pub fn from_config(config: &InventoryConfig) -> Result<Self, ConfigError> {
        let extractors = extractors_for(config.resource_types.as_deref())?;
        Ok(Self::new(extractors, MappingOptions::from_config(config)))
    }

    fn extractor_for(&self, resource_type: &str) -> Option<&dyn HostExtractor> {
        self.extractors
            .iter()
            .find(|e| e.resource_type() == resource_type)
            .map(|e| &**e)
    }

    /// Every host found in managed, allowlisted resources, in document order.
    pub fn collect_hosts(&self, documents: &[StateDocument]) -> Vec<HostRecord> {
        let mut hosts = Vec::new();

        for document in documents {
            for resource in &document.resources {
                if !resource.is_managed() {
                    continue;
                }
                let Some(resource_type) = resource.resource_type.as_deref() else {
                    continue;
                };
                let Some(extractor) = self.extractor_for(resource_type) else {
                    tracing::trace!(address = %resource.address(), "skipping resource type");
                    continue;
                };
                if resource.provider_source() != Some(extractor.provider()) {
                    tracing::debug!(
                        address = %resource.address(),
                        provider = resource.provider.as_deref().unwrap_or("-"),
                        expected = extractor.provider(),
                        "skipping resource from another provider"
                    );
                    continue;
                }

                for instance in &resource.instances {
                    match extractor.extract(&instance.attributes) {
                        Some(host) => hosts.push(host.into_record(resource, instance)),
                        None => tracing::debug!(
                            origin = %document.origin,
                            address = %resource.address(),
                            "resource instance has no host name"
                        ),
                    }
                }
            }
        }

        hosts
    }

    /// Outputs of every document merged; later documents win.
    pub fn collect_outputs(&self, documents: &[StateDocument]) -> BTreeMap<String, Value> {
        let mut outputs = BTreeMap::new();
        for document in documents {
            for (name, value) in &document.outputs {
                outputs.insert(name.clone(), value.clone());
            }
        }
        outputs
    }

    pub fn map(&self, documents: &[StateDocument]) -> InventoryResult {
        let mut inventory = InventoryResult::new();

        for host in self.collect_hosts(documents) {
            self.add_host(&mut inventory, &host);
        }

        let outputs = self.collect_outputs(documents);
        self.add_group_vars(&mut inventory, &outputs);
        self.add_host_vars(&mut inventory, &outputs);

        tracing::info!(
            documents = documents.len(),
            hosts = inventory.hosts.len(),
            groups = inventory.groups.len(),
            "inventory mapped"
        );
        inventory
    }

    fn add_host(&self, inventory: &mut InventoryResult, host: &HostRecord) {
        let ip_address = if self.options.collect_public_ips {
            host.nat_ip_address.as_deref()
        } else {
            host.ip_address.as_deref()
        };
        let Some(ip_address) = ip_address else {
            tracing::debug!(host = %host, "skipping host without an address");
            return;
        };

        if !inventory.add_host(&host.name) {
            tracing::warn!(host = %host.name, address = %host.address, "host defined more than once");
        }
        inventory.set_host_var(&host.name, "ansible_host", Value::String(ip_address.to_string()));

        if self.options.create_hosts_groups {
            let group = host_group_name(&host.name, self.options.hosts_groups_postfix.as_deref());
            inventory.add_child(&group, &host.name);
        }

        for group_by in &self.options.group_by {
            match group_by {
                GroupBy::ResourceType => {
                    inventory.add_child(&sanitize_group_name(&host.resource_type), &host.name);
                }
                GroupBy::Module => {
                    if let Some(module) = &host.module {
                        inventory.add_child(&sanitize_group_name(module), &host.name);
                    }
                }
                GroupBy::Labels => {
                    for (key, value) in &host.labels {
                        inventory.add_child(&label_group_name(key, value), &host.name);
                    }
                }
            }
        }
    }

    fn add_group_vars(&self, inventory: &mut InventoryResult, outputs: &BTreeMap<String, Value>) {
        for (group, keys) in &self.options.group_variables_from_output {
            if !inventory.has_group(group) {
                tracing::warn!(group = %group, "group not found in inventory, skipping output variables");
                continue;
            }
            for key in keys {
                match outputs.get(key) {
                    Some(value) => inventory.set_group_var(group, key, value.clone()),
                    None => tracing::warn!(group = %group, variable = %key, "variable not found in outputs"),
                }
            }
        }
    }

    fn add_host_vars(&self, inventory: &mut InventoryResult, outputs: &BTreeMap<String, Value>) {
        for (host, keys) in &self.options.host_variables_from_output {
            if !inventory.has_host(host) {
                tracing::warn!(host = %host, "host not found in inventory, skipping output variables");
                continue;
            }
            for key in keys {
                match outputs.get(key) {
                    Some(value) => inventory.set_host_var(host, key, value.clone()),
                    None => tracing::warn!(host = %host, variable = %key, "variable not found in outputs"),
                }
            }
        }
    }
}
