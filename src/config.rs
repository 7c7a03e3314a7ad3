//! Inventory configuration.
//!
//! The configuration is a YAML file whose name ends in `tfstate.yml` or
//! `tfstate.yaml`. S3 connection settings may be supplied or overridden by
//! environment variables and completed from a shared credentials profile.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::pattern::SearchPattern;

pub const CONFIG_ENV: &str = "TFSTATE_INVENTORY_CONFIG";
pub const PLUGIN_NAME: &str = "tfstate_inventory";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_HOSTS_GROUPS_POSTFIX: &str = "_group";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const CONFIG_SUFFIXES: &[&str] = &["tfstate.yml", "tfstate.yaml"];

const ENV_ENDPOINT: &[&str] = &["TFSTATE_S3_ENDPOINT"];
const ENV_REGION: &[&str] = &["TFSTATE_S3_REGION"];
const ENV_BUCKET: &[&str] = &["TFSTATE_S3_BUCKET"];
const ENV_ACCESS_KEY: &[&str] = &["TFSTATE_S3_ACCESS_KEY", "AWS_ACCESS_KEY_ID"];
const ENV_SECRET_KEY: &[&str] = &["TFSTATE_S3_SECRET_KEY", "AWS_SECRET_ACCESS_KEY"];
const ENV_SESSION_TOKEN: &[&str] = &["TFSTATE_S3_SESSION_TOKEN", "AWS_SESSION_TOKEN"];
const ENV_PROFILE: &str = "AWS_PROFILE";
const ENV_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Local,
    S3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    ResourceType,
    Module,
    Labels,
}

#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct S3Config {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
}

impl S3Config {
    pub fn region_or_default(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// Configured endpoint, or the AWS regional endpoint.
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://s3.{}.amazonaws.com", self.region_or_default()),
        }
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("profile", &self.profile)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InventoryConfig {
    #[serde(default)]
    pub plugin: Option<String>,
    pub source_type: SourceType,
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    #[serde(default)]
    pub s3_config: Option<S3Config>,
    pub search_pattern: String,
    #[serde(default)]
    pub collect_public_ips: bool,
    #[serde(default = "default_true")]
    pub create_hosts_groups: bool,
    #[serde(default = "default_hosts_groups_postfix")]
    pub hosts_groups_postfix: Option<String>,
    #[serde(default)]
    pub group_variables_from_output: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub host_variables_from_output: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub resource_types: Option<Vec<String>>,
    #[serde(default)]
    pub group_by: Vec<GroupBy>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_true() -> bool {
    true
}

fn default_hosts_groups_postfix() -> Option<String> {
    Some(DEFAULT_HOSTS_GROUPS_POSTFIX.to_string())
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl InventoryConfig {
    /// Load, complete from the process environment, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        verify_path(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::configuration(format!(
                "cannot read inventory config '{}': {e}",
                path.display()
            ))
        })?;

        let mut config = Self::parse(&content)?;

        // NOTE: relative local paths are anchored at the config file
        if let (Some(local), Some(parent)) = (&config.local_path, path.parent()) {
            if local.is_relative() {
                config.local_path = Some(parent.join(local));
            }
        }

        config.complete(&|name: &str| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(content)?;
        if config.s3_config.is_none() {
            config.s3_config = Some(S3Config::default());
        }
        Ok(config)
    }

    /// Overlay environment values and shared-profile credentials.
    pub fn complete(&mut self, env: &dyn Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        self.apply_env(env);
        if self.source_type == SourceType::S3 {
            self.apply_profile(env)?;
        }
        Ok(())
    }

    pub fn s3(&self) -> Result<&S3Config, ConfigError> {
        self.s3_config
            .as_ref()
            .ok_or_else(|| ConfigError::configuration("s3_config is required when source_type is s3"))
    }

    /// Environment wins over the file; empty variables are ignored.
    fn apply_env(&mut self, env: &dyn Fn(&str) -> Option<String>) {
        let lookup = |names: &[&str]| {
            names
                .iter()
                .copied()
                .filter_map(|name| env(name))
                .find(|value| !value.trim().is_empty())
        };

        let s3 = self.s3_config.get_or_insert_with(S3Config::default);
        overlay(&mut s3.endpoint, lookup(ENV_ENDPOINT));
        overlay(&mut s3.region, lookup(ENV_REGION));
        overlay(&mut s3.bucket, lookup(ENV_BUCKET));
        overlay(&mut s3.access_key, lookup(ENV_ACCESS_KEY));
        overlay(&mut s3.secret_key, lookup(ENV_SECRET_KEY));
        overlay(&mut s3.session_token, lookup(ENV_SESSION_TOKEN));
    }

    fn apply_profile(&mut self, env: &dyn Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let s3 = self.s3_config.get_or_insert_with(S3Config::default);
        if s3.access_key.is_some() && s3.secret_key.is_some() {
            return Ok(());
        }

        let explicit = s3
            .profile
            .clone()
            .or_else(|| env(ENV_PROFILE).filter(|p| !p.is_empty()));
        let profile = explicit.clone().unwrap_or_else(|| "default".to_string());

        let credentials_file = env(ENV_CREDENTIALS_FILE)
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join("credentials")));

        let content = credentials_file
            .as_ref()
            .and_then(|path| fs::read_to_string(path).ok());

        let found = content
            .as_deref()
            .and_then(|content| read_profile(content, &profile));

        match found {
            Some(creds) => {
                tracing::debug!(profile = %profile, "using shared credentials profile");
                if s3.access_key.is_none() {
                    s3.access_key = Some(creds.access_key);
                }
                if s3.secret_key.is_none() {
                    s3.secret_key = Some(creds.secret_key);
                }
                if s3.session_token.is_none() {
                    s3.session_token = creds.session_token;
                }
                Ok(())
            }
            None if explicit.is_some() => Err(ConfigError::authentication(format!(
                "credentials profile '{profile}' not found in shared credentials file"
            ))),
            None => Ok(()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(plugin) = &self.plugin {
            if !plugin.ends_with(PLUGIN_NAME) {
                return Err(ConfigError::configuration(format!(
                    "plugin '{plugin}' is not {PLUGIN_NAME}"
                )));
            }
        }

        SearchPattern::new(&self.search_pattern)?;

        if self.timeout_secs == 0 {
            return Err(ConfigError::configuration(
                "timeout_secs must be greater than 0",
            ));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::configuration(
                "max_attempts must be greater than 0",
            ));
        }

        match self.source_type {
            SourceType::Local => {
                if self.local_path.is_none() {
                    return Err(ConfigError::configuration(
                        "local_path is required when source_type is local",
                    ));
                }
            }
            SourceType::S3 => self.validate_s3()?,
        }

        Ok(())
    }

    fn validate_s3(&self) -> Result<(), ConfigError> {
        let s3 = self.s3()?;

        if s3.bucket.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::configuration(
                "s3_config.bucket is required (set it in the config or TFSTATE_S3_BUCKET)",
            ));
        }

        if let Some(endpoint) = &s3.endpoint {
            let url = reqwest::Url::parse(endpoint).map_err(|e| {
                ConfigError::configuration(format!("s3_config.endpoint '{endpoint}' is invalid: {e}"))
            })?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::configuration(format!(
                    "s3_config.endpoint '{endpoint}' must use http or https"
                )));
            }
        }

        if s3.access_key.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::authentication(
                "no S3 access key provided. Set s3_config.access_key, TFSTATE_S3_ACCESS_KEY or AWS_ACCESS_KEY_ID",
            ));
        }
        if s3.secret_key.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::authentication(
                "no S3 secret key provided. Set s3_config.secret_key, TFSTATE_S3_SECRET_KEY or AWS_SECRET_ACCESS_KEY",
            ));
        }

        Ok(())
    }
}

fn overlay(slot: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        *slot = Some(value);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ProfileCredentials {
    access_key: String,
    secret_key: String,
    session_token: Option<String>,
}

/// Minimal reader for the INI-style AWS shared credentials file.
fn read_profile(content: &str, profile: &str) -> Option<ProfileCredentials> {
    let mut in_section = false;
    let mut values: BTreeMap<String, String> = BTreeMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let section = section.trim();
            let section = section.strip_prefix("profile ").unwrap_or(section).trim();
            in_section = section == profile;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            values.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }

    Some(ProfileCredentials {
        access_key: values.remove("aws_access_key_id")?,
        secret_key: values.remove("aws_secret_access_key")?,
        session_token: values.remove("aws_session_token"),
    })
}

/// Config files must be named `*tfstate.yml` or `*tfstate.yaml`.
pub fn verify_path(path: &Path) -> Result<(), ConfigError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if CONFIG_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        Ok(())
    } else {
        Err(ConfigError::configuration(format!(
            "inventory config '{}' must end with tfstate.yml or tfstate.yaml",
            path.display()
        )))
    }
}

/// Explicit path, else `./tfstate.yml`, `./tfstate.yaml`, then the user config dir.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let mut candidates = vec![PathBuf::from("tfstate.yml"), PathBuf::from("tfstate.yaml")];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("tfstate-inventory").join("tfstate.yml"));
    }

    candidates
        .iter()
        .find(|candidate| candidate.is_file())
        .cloned()
        .ok_or_else(|| {
            let searched: Vec<String> = candidates.iter().map(|c| c.display().to_string()).collect();
            ConfigError::configuration(format!(
                "no inventory config found (use --config or {CONFIG_ENV}); searched: {}",
                searched.join(", ")
            ))
        })
}
