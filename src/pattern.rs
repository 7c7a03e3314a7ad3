use glob::{MatchOptions, Pattern};

use crate::error::ConfigError;

const SEPARATOR: char = '/';
const WILDCARDS: &[char] = &['*', '?', '['];

// NOTE: `*` stays inside one component; `**` spans zero or more components
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled glob-like search pattern over `/`-separated paths and object keys.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    glob: String,
    pattern: Pattern,
}

impl SearchPattern {
    pub fn new(glob: &str) -> Result<Self, ConfigError> {
        if glob.trim().is_empty() {
            return Err(ConfigError::configuration(
                "invalid search_pattern: pattern is empty",
            ));
        }

        if glob
            .split(SEPARATOR)
            .any(|part| part.contains("**") && part != "**")
        {
            return Err(ConfigError::configuration(format!(
                "invalid search_pattern '{glob}': '**' can only be an entire path component"
            )));
        }

        let pattern = Pattern::new(glob).map_err(|e| {
            ConfigError::configuration(format!("invalid search_pattern '{glob}': {e}"))
        })?;

        Ok(Self {
            glob: glob.to_string(),
            pattern,
        })
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.pattern.matches_with(path, MATCH_OPTIONS)
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }

    /// Leading components without wildcards, usable as an S3 listing prefix.
    pub fn literal_prefix(&self) -> String {
        let mut prefix = String::new();
        let parts: Vec<&str> = self.glob.split(SEPARATOR).collect();
        for part in &parts[..parts.len().saturating_sub(1)] {
            if part.contains(WILDCARDS) {
                break;
            }
            prefix.push_str(part);
            prefix.push(SEPARATOR);
        }
        prefix
    }
}
