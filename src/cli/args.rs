use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use tfstate_inventory::config::CONFIG_ENV;

#[derive(Parser, Debug)]
#[command(author, version, about = "Ansible dynamic inventory from Terraform state")]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["list", "host", "graph", "table"]),
))]
pub struct Cli {
    /// Inventory config file (must end in tfstate.yml or tfstate.yaml)
    #[arg(long, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Print the whole inventory as JSON
    #[arg(long)]
    pub list: bool,

    /// Print the variables of one host as JSON
    #[arg(long, value_name = "NAME")]
    pub host: Option<String>,

    /// Print groups and hosts as a tree
    #[arg(long)]
    pub graph: bool,

    /// Print hosts as a table
    #[arg(long)]
    pub table: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    List,
    Host(String),
    Graph,
    Table,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if let Some(host) = &self.host {
            Mode::Host(host.clone())
        } else if self.graph {
            Mode::Graph
        } else if self.table {
            Mode::Table
        } else {
            Mode::List
        }
    }

    /// Default log directive when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
