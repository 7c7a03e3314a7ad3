//! Rendering an [`InventoryResult`] for Ansible and for people.

use serde_json::{Map, Value, json};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use termtree::Tree;

use crate::inventory::{ALL_GROUP, InventoryResult, META_KEY, UNGROUPED};

/// Output of `--list` in Ansible's script-inventory format.
pub fn to_ansible_json(inventory: &InventoryResult) -> Value {
    let mut root = Map::new();

    root.insert(
        META_KEY.to_string(),
        json!({ "hostvars": inventory.hostvars }),
    );

    let mut children = vec![UNGROUPED.to_string()];
    children.extend(inventory.groups.keys().cloned());
    root.insert(
        ALL_GROUP.to_string(),
        json!({ "children": children, "vars": inventory.all_vars }),
    );

    root.insert(
        UNGROUPED.to_string(),
        json!({ "hosts": inventory.ungrouped() }),
    );

    for (name, group) in &inventory.groups {
        let mut entry = Map::new();
        entry.insert("hosts".to_string(), json!(group.hosts));
        if !group.vars.is_empty() {
            entry.insert("vars".to_string(), json!(group.vars));
        }
        root.insert(name.clone(), Value::Object(entry));
    }

    Value::Object(root)
}

/// Output of `--host NAME`; unknown hosts get `{}`.
pub fn host_json(inventory: &InventoryResult, host: &str) -> Value {
    inventory
        .host_vars(host)
        .map(|vars| json!(vars))
        .unwrap_or_else(|| Value::Object(Map::new()))
}

pub fn to_json_string(value: &Value, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

/// Group/host tree in the style of `ansible-inventory --graph`.
pub fn graph(inventory: &InventoryResult) -> Tree<String> {
    let mut root = Tree::new(format!("@{ALL_GROUP}:"));

    let ungrouped = inventory.ungrouped();
    let mut ungrouped_tree = Tree::new(format!("@{UNGROUPED}:"));
    for host in ungrouped {
        ungrouped_tree.push(host.to_string());
    }
    root.push(ungrouped_tree);

    for (name, group) in &inventory.groups {
        let leaves = group.hosts.iter().cloned();
        root.push(Tree::new(format!("@{name}:")).with_leaves(leaves));
    }

    root
}

#[derive(Debug, Tabled)]
struct HostRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "ansible_host")]
    address: String,
    #[tabled(rename = "Groups")]
    groups: String,
}

pub fn table(inventory: &InventoryResult) -> String {
    let rows: Vec<HostRow> = inventory
        .hosts
        .iter()
        .map(|host| HostRow {
            host: host.clone(),
            address: inventory
                .host_vars(host)
                .and_then(|vars| vars.get("ansible_host"))
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_string(),
            groups: inventory.groups_of(host).join(", "),
        })
        .collect();

    Table::new(rows).with(Style::sharp()).to_string()
}
