//! CLI configuration file

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings read from the `--config` YAML file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Schema documents or directories of them
    pub schema_paths: Vec<PathBuf>,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;

        // relative schema paths are resolved against the config file
        if let Some(base) = path.parent() {
            for schema_path in &mut config.schema_paths {
                if schema_path.is_relative() {
                    *schema_path = base.join(&*schema_path);
                }
            }
        }
        Ok(config)
    }

    /// Configured schema paths followed by the ones given on the command line
    pub fn with_schema_paths(mut self, extra: impl IntoIterator<Item = PathBuf>) -> Self {
        self.schema_paths.extend(extra);
        self
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("warn")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_schema_paths_next_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serbind.yaml");
        std::fs::write(&path, "schema_paths:\n  - schemas\n  - /abs/people.yaml\nlog_level: debug\n")
            .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.schema_paths,
            [dir.path().join("schemas"), PathBuf::from("/abs/people.yaml")]
        );
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn missing_settings_use_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.log_level(), "warn");

        let config = config.with_schema_paths([PathBuf::from("extra.yaml")]);
        assert_eq!(config.schema_paths, [PathBuf::from("extra.yaml")]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serbind.yaml");
        std::fs::write(&path, "schema_path: []\n").unwrap();

        assert!(Config::load(&path).is_err());
    }
}
