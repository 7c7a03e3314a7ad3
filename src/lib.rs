//! tfstate-inventory - Ansible dynamic inventory from Terraform state
//!
//! Fetches Terraform state documents from a local directory or an S3 bucket,
//! parses them and maps host-bearing resources into an Ansible inventory.

pub mod config;
pub mod error;
pub mod inventory;
pub mod output;
pub mod pattern;
pub mod resolver;
pub mod sources;
pub mod terraform;

pub use config::InventoryConfig;
pub use error::{ConfigError, ErrorCategory};
pub use inventory::{InventoryMapper, InventoryResult, MappingOptions};
pub use resolver::Resolver;
pub use sources::s3::{Credentials, S3Client, S3Error};
pub use sources::{RawState, StateSource};
pub use terraform::{StateDocument, parse_state};
