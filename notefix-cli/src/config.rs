//! Configuration file loading for notefix.
//!
//! Discovers and loads `notefix.toml` from the vault root. CLI arguments
//! take precedence over file settings.

use anyhow::Context;
use camino::Utf8Path;
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "notefix.toml";

/// Top-level configuration from notefix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotefixConfig {
    pub audit: AuditSection,
    pub run: RunSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    /// Escalate `unknown-field` to an error.
    pub strict: bool,

    /// Frontmatter keys tolerated on every type.
    pub allowed_extra_fields: Vec<String>,

    /// Glob patterns over vault-relative paths to skip while scanning.
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunSection {
    /// Bounded worker count for parallel phases (0 = machine default).
    pub workers: usize,

    /// Edit-distance bound for `invalid-option` suggestions.
    pub suggestion_distance: Option<usize>,

    /// Extra excluded directory names.
    pub exclude: Vec<String>,
}

pub fn load_or_default(vault_root: &Utf8Path) -> anyhow::Result<NotefixConfig> {
    let path = vault_root.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        debug!(path = %path, "no config file; using defaults");
        return Ok(NotefixConfig::default());
    }
    let raw = fs::read_to_string(&path).with_context(|| format!("read {path}"))?;
    let config = toml::from_str(&raw).with_context(|| format!("parse {path}"))?;
    debug!(path = %path, "loaded config file");
    Ok(config)
}

/// Merge file settings with CLI arguments; CLI wins, lists concatenate.
pub struct ConfigMerger {
    config: NotefixConfig,
}

impl ConfigMerger {
    pub fn new(config: NotefixConfig) -> Self {
        Self { config }
    }

    pub fn strict(&self, cli_strict: bool) -> bool {
        cli_strict || self.config.audit.strict
    }

    pub fn allowed_extra_fields(&self, cli: &[String]) -> Vec<String> {
        let mut out = self.config.audit.allowed_extra_fields.clone();
        for field in cli {
            if !out.contains(field) {
                out.push(field.clone());
            }
        }
        out
    }

    pub fn ignore_patterns(&self, cli: &[String]) -> Vec<String> {
        let mut out = self.config.audit.ignore_patterns.clone();
        for pattern in cli {
            if !out.contains(pattern) {
                out.push(pattern.clone());
            }
        }
        out
    }

    pub fn excludes(&self, cli: &[String]) -> Vec<String> {
        let mut out = self.config.run.exclude.clone();
        for name in cli {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        out
    }

    pub fn workers(&self, cli: Option<usize>) -> usize {
        cli.unwrap_or(self.config.run.workers)
    }

    pub fn suggestion_distance(&self, cli: Option<usize>) -> usize {
        cli.or(self.config.run.suggestion_distance).unwrap_or(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let toml = r#"
[audit]
strict = true
allowed_extra_fields = ["aliases"]
ignore_patterns = ["**/scratch-*.md"]

[run]
workers = 4
suggestion_distance = 1
exclude = ["archive"]
"#;
        let config: NotefixConfig = toml::from_str(toml).unwrap();
        assert!(config.audit.strict);
        assert_eq!(config.audit.allowed_extra_fields, vec!["aliases"]);
        assert_eq!(config.run.workers, 4);
        assert_eq!(config.run.suggestion_distance, Some(1));
    }

    #[test]
    fn cli_arguments_take_precedence() {
        let merger = ConfigMerger::new(NotefixConfig {
            audit: AuditSection {
                strict: false,
                allowed_extra_fields: vec!["aliases".into()],
                ignore_patterns: vec![],
            },
            run: RunSection {
                workers: 2,
                suggestion_distance: Some(1),
                exclude: vec!["archive".into()],
            },
        });

        assert!(merger.strict(true));
        assert!(!merger.strict(false));
        assert_eq!(
            merger.allowed_extra_fields(&["color".into()]),
            vec!["aliases".to_string(), "color".to_string()]
        );
        assert_eq!(
            merger.excludes(&["tmp".into()]),
            vec!["archive".to_string(), "tmp".to_string()]
        );
        assert_eq!(merger.workers(Some(8)), 8);
        assert_eq!(merger.workers(None), 2);
        assert_eq!(merger.suggestion_distance(None), 1);
        assert_eq!(merger.suggestion_distance(Some(3)), 3);
    }
}
