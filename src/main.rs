mod cli;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Mode};
use tfstate_inventory::config::{InventoryConfig, resolve_config_path};
use tfstate_inventory::{Resolver, output};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // NOTE: stdout carries the inventory, logs go to stderr
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let path = resolve_config_path(cli.config.as_deref())?;
    tracing::debug!(path = %path.display(), "loading inventory config");
    let config = InventoryConfig::load(&path)?;

    let inventory = Resolver::from_config(&config)?.resolve().await?;

    let rendered = match cli.mode() {
        Mode::List => output::to_json_string(&output::to_ansible_json(&inventory), cli.pretty)?,
        Mode::Host(name) => {
            output::to_json_string(&output::host_json(&inventory, &name), cli.pretty)?
        }
        Mode::Graph => output::graph(&inventory).to_string(),
        Mode::Table => output::table(&inventory),
    };
    println!("{rendered}");

    Ok(())
}
