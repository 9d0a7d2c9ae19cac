use anyhow::{Context, Result};
use crossdiff::{ComparisonSettings, DiffOptions, SeverityRules};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("acctdiff"))
}

/// Expand `~` in a configured path
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::tilde(path);
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Config File
// ============================================================================

/// Contents of `config.toml`. Every key is optional; command-line flags win.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub services: Option<Vec<String>>,
    pub parallel: Option<bool>,
    pub max_workers: Option<usize>,
    pub region: Option<String>,
    pub ignore_order: Option<bool>,
    pub significant_digits: Option<u32>,
    /// Extra field names excluded from every diff
    pub ignore_fields: Vec<String>,
    /// Extra field patterns excluded from every diff
    pub excluded_patterns: Vec<String>,
    /// Replacement pattern lists per severity tier
    pub severity: Option<SeverityRules>,
    /// Directory holding one exported snapshot per profile
    pub snapshot_root: Option<String>,
    pub accounts: BTreeMap<String, AccountEntry>,
}

/// Per-account settings, keyed by account id.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountEntry {
    pub snapshot: Option<String>,
    pub profile: Option<String>,
    pub role_arn: Option<String>,
    pub external_id: Option<String>,
    pub region: Option<String>,
}

impl FileConfig {
    /// Default config file location
    pub fn default_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.toml"))
    }

    /// Load the config file.
    ///
    /// An explicitly given file must exist; a missing default file yields
    /// the default config.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                path.to_path_buf()
            }
            None => {
                let path = Self::default_path()?;
                if !path.exists() {
                    log::debug!("Config file does not exist, using defaults");
                    return Ok(Self::default());
                }
                path
            }
        };

        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn account(&self, account_id: &str) -> Option<&AccountEntry> {
        self.accounts.get(account_id)
    }

    /// Where profile snapshots live; defaults to `~/.config/acctdiff/snapshots`.
    pub fn snapshot_root(&self) -> Result<PathBuf> {
        match &self.snapshot_root {
            Some(root) => Ok(expand_path(root)),
            None => Ok(config_dir()?.join("snapshots")),
        }
    }

    /// Diff and severity settings, built on top of the defaults.
    pub fn comparison_settings(&self) -> ComparisonSettings {
        let mut diff = DiffOptions::default();
        if let Some(ignore_order) = self.ignore_order {
            diff.ignore_order = ignore_order;
        }
        diff.significant_digits = self.significant_digits;
        diff.excluded_fields.extend(self.ignore_fields.iter().cloned());
        diff.excluded_patterns.extend(self.excluded_patterns.iter().cloned());

        ComparisonSettings {
            diff,
            severity: self.severity.clone().unwrap_or_default(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crossdiff::Severity;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.services.is_none());
        assert!(config.accounts.is_empty());

        let settings = config.comparison_settings();
        assert_eq!(settings, ComparisonSettings::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
services = ["s3", "sqs"]
max_workers = 4
significant_digits = 2
ignore_fields = ["LastModified"]

[severity]
critical = ["billing"]

[accounts.111111111111]
snapshot = "~/snapshots/prod"
region = "eu-west-1"
"#,
        )
        .unwrap();

        let config = FileConfig::load(Some(&path)).unwrap();
        assert_eq!(config.services, Some(vec!["s3".to_string(), "sqs".to_string()]));
        assert_eq!(config.max_workers, Some(4));

        let account = config.account("111111111111").unwrap();
        assert_eq!(account.snapshot.as_deref(), Some("~/snapshots/prod"));
        assert_eq!(account.region.as_deref(), Some("eu-west-1"));
        assert!(config.account("222222222222").is_none());
        assert!(config.snapshot_root().unwrap().ends_with("acctdiff/snapshots"));

        let settings = config.comparison_settings();
        assert_eq!(settings.diff.significant_digits, Some(2));
        assert!(settings.diff.excluded_fields.contains("LastModified"));
        assert!(settings.diff.excluded_fields.contains("ResponseMetadata"));
        assert_eq!(settings.severity.classify("billing_mode"), Severity::Critical);
        // the critical list is replaced, not extended
        assert_eq!(settings.severity.classify("policy"), Severity::Medium);
        // tiers not overridden keep their defaults
        assert_eq!(settings.severity.classify("tags.Team"), Severity::Info);
    }

    #[test]
    fn test_snapshot_root_override() {
        let config: FileConfig = toml::from_str(r#"snapshot_root = "/srv/exports""#).unwrap();
        assert_eq!(config.snapshot_root().unwrap(), PathBuf::from("/srv/exports"));
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let result = FileConfig::load(Some(&dir.path().join("nope.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_toml_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_workers = \"many\"").unwrap();
        let err = FileConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_expand_path() {
        let expanded = expand_path("~/snapshots");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert_eq!(expand_path("/tmp/x"), PathBuf::from("/tmp/x"));
    }
}
