use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use txl_store::{JournalConfig, SyncMode};

use crate::cli::{Cli, OutputFormat};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub store_path: PathBuf,
    pub sync: SyncMode,
    pub log_level: String,
    pub format: OutputFormat,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("txl.journal"),
            sync: SyncMode::OsDefault,
            log_level: "warn".into(),
            format: OutputFormat::Text,
        }
    }
}

impl CliConfig {
    /// Read `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Command-line flags win over file values.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(store) = &cli.store {
            self.store_path = store.clone();
        }
        if let Some(format) = cli.format {
            self.format = format;
        }
        self
    }

    pub fn max_level(&self) -> anyhow::Result<tracing::Level> {
        self.log_level
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown log level {:?}", self.log_level))
    }

    pub fn journal(&self) -> JournalConfig {
        JournalConfig {
            sync_mode: self.sync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn default_config() {
        let c = CliConfig::default();
        assert_eq!(c.store_path, PathBuf::from("txl.journal"));
        assert_eq!(c.sync, SyncMode::OsDefault);
        assert_eq!(c.max_level().unwrap(), tracing::Level::WARN);
        assert_eq!(c.format, OutputFormat::Text);
        assert_eq!(CliConfig::load(None).unwrap(), c);
    }

    #[test]
    fn parses_partial_toml() {
        let c = CliConfig::parse(
            r#"
            store_path = "/var/lib/txl/ledger.journal"
            sync = "every-write"
            "#,
        )
        .unwrap();
        assert_eq!(c.store_path, PathBuf::from("/var/lib/txl/ledger.journal"));
        assert_eq!(c.journal().sync_mode, SyncMode::EveryWrite);
        assert_eq!(c.log_level, "warn");
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(CliConfig::parse(r#"sync = "sometimes""#).is_err());
        let c = CliConfig {
            log_level: "loud".into(),
            ..CliConfig::default()
        };
        assert!(c.max_level().is_err());
    }

    #[test]
    fn loads_from_file_and_flags_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("txl.toml");
        std::fs::write(&path, "format = \"json\"\nstore_path = \"file.journal\"\n").unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.format, OutputFormat::Json);

        let cli = Cli::parse_from(["txl", "--store", "flag.journal", "tx", "exists", "tx1"]);
        let config = config.with_overrides(&cli);
        assert_eq!(config.store_path, PathBuf::from("flag.journal"));
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
