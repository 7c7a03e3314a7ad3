pub mod hosts;
pub mod mapper;
pub mod naming;

pub use hosts::{HostExtractor, HostRecord, default_extractors, extractors_for};
pub use mapper::{InventoryMapper, MappingOptions};

use std::collections::BTreeMap;

use serde_json::Value;

/// Name of the implicit group every host belongs to.
pub const ALL_GROUP: &str = "all";
pub const UNGROUPED: &str = "ungrouped";
pub const META_KEY: &str = "_meta";

/// Top-level keys of the rendered inventory that no generated group may take.
pub const RESERVED_GROUPS: &[&str] = &[ALL_GROUP, UNGROUPED, META_KEY];

pub fn is_reserved_group(name: &str) -> bool {
    RESERVED_GROUPS.contains(&name)
}

pub type Vars = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub hosts: Vec<String>,
    pub vars: Vars,
}

/// Groups, hosts and their variables, in first-seen host order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryResult {
    pub groups: BTreeMap<String, Group>,
    pub hostvars: BTreeMap<String, Vars>,
    pub all_vars: Vars,
    pub hosts: Vec<String>,
}

impl InventoryResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Returns `false` when the host was already present.
    pub fn add_host(&mut self, name: &str) -> bool {
        if self.hostvars.contains_key(name) {
            return false;
        }
        self.hosts.push(name.to_string());
        self.hostvars.insert(name.to_string(), Vars::new());
        true
    }

    pub fn has_host(&self, name: &str) -> bool {
        self.hostvars.contains_key(name)
    }

    pub fn has_group(&self, name: &str) -> bool {
        name == ALL_GROUP || self.groups.contains_key(name)
    }

    pub fn add_group(&mut self, name: &str) -> bool {
        if is_reserved_group(name) {
            tracing::warn!(group = %name, "group name is reserved, skipping");
            return false;
        }
        self.groups.entry(name.to_string()).or_default();
        true
    }

    /// Add `host` to `group`, creating the group if needed. Reserved group
    /// names are refused and the host stays where it was.
    pub fn add_child(&mut self, group: &str, host: &str) -> bool {
        if !self.add_group(group) {
            tracing::warn!(group = %group, host = %host, "host not added to reserved group");
            return false;
        }
        let group = self.groups.entry(group.to_string()).or_default();
        if !group.hosts.iter().any(|h| h == host) {
            group.hosts.push(host.to_string());
        }
        true
    }

    pub fn set_host_var(&mut self, host: &str, key: &str, value: Value) {
        self.hostvars
            .entry(host.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// `all` is stored in [`InventoryResult::all_vars`].
    pub fn set_group_var(&mut self, group: &str, key: &str, value: Value) {
        if group == ALL_GROUP {
            self.all_vars.insert(key.to_string(), value);
            return;
        }
        self.groups
            .entry(group.to_string())
            .or_default()
            .vars
            .insert(key.to_string(), value);
    }

    pub fn host_vars(&self, host: &str) -> Option<&Vars> {
        self.hostvars.get(host)
    }

    pub fn groups_of(&self, host: &str) -> Vec<&str> {
        self.groups
            .iter()
            .filter(|(_, group)| group.hosts.iter().any(|h| h == host))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Hosts that belong to no explicit group.
    pub fn ungrouped(&self) -> Vec<&str> {
        self.hosts
            .iter()
            .filter(|host| !self.groups.values().any(|g| g.hosts.contains(host)))
            .map(String::as_str)
            .collect()
    }
}
