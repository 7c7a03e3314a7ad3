use std::path::{Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use super::{RawState, StateSource};
use crate::error::ConfigError;
use crate::pattern::SearchPattern;

/// State files below a local directory.
#[derive(Debug, Clone)]
pub struct LocalSource {
    base: PathBuf,
    pattern: SearchPattern,
}

impl LocalSource {
    pub fn new(base: PathBuf, pattern: SearchPattern) -> Self {
        Self { base, pattern }
    }

    /// Paths of matching files, sorted.
    pub fn matching_files(&self) -> Result<Vec<PathBuf>, ConfigError> {
        if !self.base.is_dir() {
            return Err(ConfigError::configuration(format!(
                "local_path '{}' is not a directory",
                self.base.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.base).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                ConfigError::connectivity(format!(
                    "cannot read directory '{}': {e}",
                    self.base.display()
                ))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(relative) = relative_key(&self.base, entry.path()) else {
                continue;
            };
            if self.pattern.is_match(&relative) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// `/`-joined path relative to `base`, matching S3 key syntax.
fn relative_key(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

#[async_trait]
impl StateSource for LocalSource {
    fn name(&self) -> &str {
        "local"
    }

    async fn fetch_states(&self) -> Result<Vec<RawState>, ConfigError> {
        let files = self.matching_files()?;
        tracing::info!(
            count = files.len(),
            base = %self.base.display(),
            pattern = self.pattern.as_str(),
            "matching local state files"
        );

        let mut states = Vec::with_capacity(files.len());
        for path in files {
            let bytes = tokio::fs::read(&path).await.map_err(|e| {
                ConfigError::connectivity(format!("cannot read state file '{}': {e}", path.display()))
            })?;
            tracing::debug!(path = %path.display(), size = bytes.len(), "state file read");
            states.push(RawState::new(path.display().to_string(), bytes));
        }
        Ok(states)
    }
}
