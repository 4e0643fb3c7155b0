//! Configuration management for ado-migrator.
//!
//! This module handles loading configuration from multiple sources:
//! - TOML configuration files following XDG Base Directory specification
//! - Environment variables (`ADO_MIGRATOR_*`)
//!
//! CLI arguments are layered on top in [`crate::models::Args::resolve_config`].
//!
//! ## Example
//!
//! ```rust
//! use ado_migrator::Config;
//!
//! // Load configuration from file, with fallback to defaults
//! let config = Config::load_from_file().unwrap();
//!
//! // Load from environment variables
//! let env_config = Config::load_from_env();
//!
//! // Merge configurations (env takes precedence)
//! let merged = config.merge(env_config);
//! ```

use crate::{models::PrStatusFilter, parsed_property::ParsedProperty};
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default Azure DevOps Services endpoint.
pub const DEFAULT_API_URL: &str = "https://dev.azure.com";

/// Temporary struct for deserializing TOML configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ConfigFile {
    pub source_org: Option<String>,
    pub source_project: Option<String>,
    pub source_pat: Option<String>,
    pub target_org: Option<String>,
    pub target_project: Option<String>,
    pub target_pat: Option<String>,
    pub api_url: Option<String>,
    pub repos: Option<Vec<String>>,
    pub pr_status: Option<String>,
    pub work_items: Option<bool>,
    pub work_item_query: Option<String>,
    pub max_concurrent_repos: Option<usize>,
    pub work_dir: Option<String>,
}

/// Migration settings assembled from environment variables, config file, and defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source Azure DevOps organization.
    pub source_org: Option<ParsedProperty<String>>,
    /// Source project.
    pub source_project: Option<ParsedProperty<String>>,
    /// Personal access token for the source organization.
    pub source_pat: Option<ParsedProperty<String>>,
    /// Target Azure DevOps organization.
    pub target_org: Option<ParsedProperty<String>>,
    /// Target project.
    pub target_project: Option<ParsedProperty<String>>,
    /// Personal access token for the target organization.
    pub target_pat: Option<ParsedProperty<String>>,
    /// Base URL of the Azure DevOps server (both sides).
    pub api_url: Option<ParsedProperty<String>>,
    /// Only migrate repositories with these names.
    pub repos: Option<ParsedProperty<Vec<String>>>,
    /// Which source pull requests to migrate.
    pub pr_status: Option<ParsedProperty<PrStatusFilter>>,
    /// Whether to run the work item phase.
    pub work_items: Option<ParsedProperty<bool>>,
    /// WIQL query selecting source work items.
    pub work_item_query: Option<ParsedProperty<String>>,
    /// Number of repositories migrated at the same time.
    pub max_concurrent_repos: Option<ParsedProperty<usize>>,
    /// Directory holding the mirror clones.
    pub work_dir: Option<ParsedProperty<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_org: None,
            source_project: None,
            source_pat: None,
            target_org: None,
            target_project: None,
            target_pat: None,
            api_url: Some(ParsedProperty::Default(DEFAULT_API_URL.to_string())),
            repos: None,
            pr_status: Some(ParsedProperty::Default(PrStatusFilter::All)),
            work_items: Some(ParsedProperty::Default(false)),
            work_item_query: None,
            max_concurrent_repos: Some(ParsedProperty::Default(1)),
            work_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from XDG config directory
    #[must_use = "this returns the loaded configuration which should be used"]
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config_file: ConfigFile = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        let path = config_path.to_path_buf();
        let string_prop = |v: Option<String>| {
            v.map(|v| ParsedProperty::File(v.clone(), path.clone(), v))
        };

        let pr_status = match config_file.pr_status {
            Some(raw) => {
                let parsed = PrStatusFilter::from_str(&raw, true).map_err(|message| {
                    crate::error::ConfigError::InvalidValue {
                        field: "pr_status".to_string(),
                        message,
                    }
                })?;
                Some(ParsedProperty::File(parsed, path.clone(), raw))
            }
            None => None,
        };

        Ok(Self {
            source_org: string_prop(config_file.source_org),
            source_project: string_prop(config_file.source_project),
            source_pat: string_prop(config_file.source_pat),
            target_org: string_prop(config_file.target_org),
            target_project: string_prop(config_file.target_project),
            target_pat: string_prop(config_file.target_pat),
            api_url: string_prop(config_file.api_url),
            repos: config_file
                .repos
                .map(|v| ParsedProperty::File(v.clone(), path.clone(), v.join(","))),
            pr_status,
            work_items: config_file
                .work_items
                .map(|v| ParsedProperty::File(v, path.clone(), v.to_string())),
            work_item_query: string_prop(config_file.work_item_query),
            max_concurrent_repos: config_file
                .max_concurrent_repos
                .map(|v| ParsedProperty::File(v, path.clone(), v.to_string())),
            work_dir: string_prop(config_file.work_dir),
        })
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Self {
        let string_var = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| ParsedProperty::Env(v.clone(), v))
        };

        Self {
            source_org: string_var("ADO_MIGRATOR_SOURCE_ORG"),
            source_project: string_var("ADO_MIGRATOR_SOURCE_PROJECT"),
            source_pat: string_var("ADO_MIGRATOR_SOURCE_PAT"),
            target_org: string_var("ADO_MIGRATOR_TARGET_ORG"),
            target_project: string_var("ADO_MIGRATOR_TARGET_PROJECT"),
            target_pat: string_var("ADO_MIGRATOR_TARGET_PAT"),
            api_url: string_var("ADO_MIGRATOR_API_URL"),
            repos: std::env::var("ADO_MIGRATOR_REPOS")
                .ok()
                .map(|s| ParsedProperty::Env(split_list(&s), s)),
            pr_status: std::env::var("ADO_MIGRATOR_PR_STATUS").ok().and_then(|s| {
                PrStatusFilter::from_str(&s, true)
                    .ok()
                    .map(|v| ParsedProperty::Env(v, s.clone()))
            }),
            work_items: std::env::var("ADO_MIGRATOR_WORK_ITEMS").ok().and_then(|s| {
                s.parse::<bool>()
                    .ok()
                    .map(|v| ParsedProperty::Env(v, s.clone()))
            }),
            work_item_query: string_var("ADO_MIGRATOR_WORK_ITEM_QUERY"),
            max_concurrent_repos: std::env::var("ADO_MIGRATOR_MAX_CONCURRENT_REPOS")
                .ok()
                .and_then(|s| s.parse().ok().map(|v| ParsedProperty::Env(v, s))),
            work_dir: string_var("ADO_MIGRATOR_WORK_DIR"),
        }
    }

    /// Get the XDG config file path for ado-migrator
    fn get_config_path() -> Result<PathBuf> {
        // Use XDG_CONFIG_HOME if set, otherwise ~/.config
        let config_dir = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".config"),
        };

        Ok(config_dir.join("ado-migrator").join("config.toml"))
    }

    /// Merge this config with another, preferring values from other when they exist
    pub fn merge(self, other: Self) -> Self {
        Self {
            source_org: other.source_org.or(self.source_org),
            source_project: other.source_project.or(self.source_project),
            source_pat: other.source_pat.or(self.source_pat),
            target_org: other.target_org.or(self.target_org),
            target_project: other.target_project.or(self.target_project),
            target_pat: other.target_pat.or(self.target_pat),
            api_url: other.api_url.or(self.api_url),
            repos: other.repos.or(self.repos),
            pr_status: other.pr_status.or(self.pr_status),
            work_items: other.work_items.or(self.work_items),
            work_item_query: other.work_item_query.or(self.work_item_query),
            max_concurrent_repos: other.max_concurrent_repos.or(self.max_concurrent_repos),
            work_dir: other.work_dir.or(self.work_dir),
        }
    }

    /// Create a sample config file for user reference
    ///
    /// Returns the path of the config file. An existing file is left untouched.
    #[must_use = "this operation can fail and the result should be checked"]
    pub fn create_sample_config() -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        Self::write_sample_config(&config_path)?;
        Ok(config_path)
    }

    fn write_sample_config(config_path: &Path) -> Result<()> {
        // Don't overwrite existing config
        if config_path.exists() {
            return Ok(());
        }

        if let Some(dir) = config_path.parent() {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create config directory: {}", dir.display())
            })?;
        }

        let sample_config = r#"# ado-migrator configuration file
# Location: ~/.config/ado-migrator/config.toml
#
# Every value can also be given as a CLI flag (--source-org, ...) or an
# environment variable (ADO_MIGRATOR_SOURCE_ORG, ...). CLI wins over env,
# env wins over this file.

# Source organization and project (required)
# source_org = "old-org"
# source_project = "Legacy"

# Target organization and project (required)
# target_org = "new-org"
# target_project = "Platform"

# Personal Access Tokens (required; prefer ADO_MIGRATOR_SOURCE_PAT /
# ADO_MIGRATOR_TARGET_PAT over storing them here)
# source_pat = ""
# target_pat = ""

# Azure DevOps server base URL (defaults to https://dev.azure.com)
# api_url = "https://dev.azure.com"

# Only migrate these repositories (defaults to all)
# repos = ["svc-a", "svc-b"]

# Which pull requests to migrate: active, completed, abandoned or all
pr_status = "all"

# Also migrate work items and their links
work_items = false

# WIQL query selecting source work items (defaults to every item in the project)
# work_item_query = "SELECT [System.Id] FROM WorkItems WHERE [System.TeamProject] = @project AND [System.State] <> 'Removed'"

# How many repositories to mirror at once
max_concurrent_repos = 1

# Where mirror clones are kept (defaults to a temporary directory)
# work_dir = "/var/tmp/ado-migration"
"#;

        fs::write(config_path, sample_config).with_context(|| {
            format!(
                "Failed to write sample config file: {}",
                config_path.display()
            )
        })?;

        Ok(())
    }
}

/// Split a comma-separated list, dropping empty entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::file_serial;
    use std::env;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "ADO_MIGRATOR_SOURCE_ORG",
        "ADO_MIGRATOR_SOURCE_PROJECT",
        "ADO_MIGRATOR_SOURCE_PAT",
        "ADO_MIGRATOR_TARGET_ORG",
        "ADO_MIGRATOR_TARGET_PROJECT",
        "ADO_MIGRATOR_TARGET_PAT",
        "ADO_MIGRATOR_API_URL",
        "ADO_MIGRATOR_REPOS",
        "ADO_MIGRATOR_PR_STATUS",
        "ADO_MIGRATOR_WORK_ITEMS",
        "ADO_MIGRATOR_WORK_ITEM_QUERY",
        "ADO_MIGRATOR_MAX_CONCURRENT_REPOS",
        "ADO_MIGRATOR_WORK_DIR",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            unsafe {
                env::remove_var(var);
            }
        }
    }

    /// # Config Default Values
    ///
    /// Tests that the default configuration contains expected values.
    ///
    /// ## Test Scenario
    /// - Creates a default Config instance
    ///
    /// ## Expected Outcome
    /// - Connection fields are unset, run options have defaults
    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.source_org, None);
        assert_eq!(config.target_pat, None);
        assert_eq!(
            config.api_url,
            Some(ParsedProperty::Default(DEFAULT_API_URL.to_string()))
        );
        assert_eq!(
            config.pr_status,
            Some(ParsedProperty::Default(PrStatusFilter::All))
        );
        assert_eq!(config.work_items, Some(ParsedProperty::Default(false)));
        assert_eq!(config.max_concurrent_repos, Some(ParsedProperty::Default(1)));
        assert_eq!(config.repos, None);
    }

    /// # Load Config from Environment Variables
    ///
    /// Tests loading configuration when environment variables are present.
    ///
    /// ## Test Scenario
    /// - Sets the ADO_MIGRATOR_* variables
    /// - Loads configuration from environment
    ///
    /// ## Expected Outcome
    /// - Values are parsed and tagged with the env source
    /// - The repo list is split on commas
    #[test]
    #[file_serial(env_tests)]
    fn test_load_from_env_variables() {
        clear_env();
        unsafe {
            env::set_var("ADO_MIGRATOR_SOURCE_ORG", "old-org");
            env::set_var("ADO_MIGRATOR_TARGET_PROJECT", "Platform");
            env::set_var("ADO_MIGRATOR_REPOS", "svc-a, svc-b,");
            env::set_var("ADO_MIGRATOR_PR_STATUS", "Active");
            env::set_var("ADO_MIGRATOR_WORK_ITEMS", "true");
            env::set_var("ADO_MIGRATOR_MAX_CONCURRENT_REPOS", "4");
        }

        let config = Config::load_from_env();
        clear_env();

        assert_eq!(
            config.source_org,
            Some(ParsedProperty::Env(
                "old-org".to_string(),
                "old-org".to_string()
            ))
        );
        assert_eq!(
            config.target_project.as_ref().map(|p| p.value().as_str()),
            Some("Platform")
        );
        assert_eq!(
            config.repos.as_ref().map(|p| p.value().clone()),
            Some(vec!["svc-a".to_string(), "svc-b".to_string()])
        );
        assert_eq!(
            config.pr_status.as_ref().map(|p| *p.value()),
            Some(PrStatusFilter::Active)
        );
        assert_eq!(config.work_items.as_ref().map(|p| *p.value()), Some(true));
        assert_eq!(
            config.max_concurrent_repos.as_ref().map(|p| *p.value()),
            Some(4)
        );
        assert_eq!(config.source_pat, None);
    }

    /// # Load Config from Environment (Invalid Values)
    ///
    /// Tests that unparsable environment values are ignored.
    ///
    /// ## Test Scenario
    /// - Sets non-numeric concurrency and an unknown PR status
    ///
    /// ## Expected Outcome
    /// - Invalid values are dropped instead of failing
    #[test]
    #[file_serial(env_tests)]
    fn test_load_from_env_invalid_values() {
        clear_env();
        unsafe {
            env::set_var("ADO_MIGRATOR_MAX_CONCURRENT_REPOS", "many");
            env::set_var("ADO_MIGRATOR_PR_STATUS", "merged");
            env::set_var("ADO_MIGRATOR_WORK_ITEMS", "yes please");
        }

        let config = Config::load_from_env();
        clear_env();

        assert_eq!(config.max_concurrent_repos, None);
        assert_eq!(config.pr_status, None);
        assert_eq!(config.work_items, None);
    }

    /// # Config Merge Precedence
    ///
    /// Tests that values from the other config take precedence.
    ///
    /// ## Test Scenario
    /// - Merges a file-like config with an env-like config
    ///
    /// ## Expected Outcome
    /// - Set values in the second config win, unset values fall through
    #[test]
    fn test_config_merge_other_takes_precedence() {
        let base = Config {
            source_org: Some(ParsedProperty::Default("base-org".to_string())),
            target_org: Some(ParsedProperty::Default("base-target".to_string())),
            ..Config::default()
        };
        let other = Config {
            source_org: Some(ParsedProperty::Env(
                "env-org".to_string(),
                "env-org".to_string(),
            )),
            api_url: None,
            pr_status: None,
            work_items: None,
            max_concurrent_repos: None,
            ..Config::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.source_org.unwrap().value(), "env-org");
        assert_eq!(merged.target_org.unwrap().value(), "base-target");
        assert_eq!(merged.api_url.unwrap().value(), DEFAULT_API_URL);
        assert_eq!(*merged.max_concurrent_repos.unwrap().value(), 1);
    }

    /// # Load Config from Valid TOML
    ///
    /// Tests loading configuration from a TOML file.
    ///
    /// ## Test Scenario
    /// - Writes a config file into a temporary directory
    /// - Loads it with load_from_path
    ///
    /// ## Expected Outcome
    /// - Values are parsed and tagged with the file source
    #[test]
    fn test_load_from_path_valid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
source_org = "old-org"
source_project = "Legacy"
target_org = "new-org"
target_project = "Platform"
repos = ["svc-a"]
pr_status = "completed"
work_items = true
max_concurrent_repos = 3
work_dir = "/var/tmp/mirrors"
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&config_path).unwrap();

        assert_eq!(
            config.source_org,
            Some(ParsedProperty::File(
                "old-org".to_string(),
                config_path.clone(),
                "old-org".to_string()
            ))
        );
        assert_eq!(
            config.pr_status.as_ref().map(|p| *p.value()),
            Some(PrStatusFilter::Completed)
        );
        assert_eq!(
            config.repos.as_ref().map(|p| p.value().clone()),
            Some(vec!["svc-a".to_string()])
        );
        assert_eq!(config.work_items.as_ref().map(|p| *p.value()), Some(true));
        assert_eq!(
            config.max_concurrent_repos.as_ref().map(|p| *p.value()),
            Some(3)
        );
        assert_eq!(config.source_pat, None);
    }

    /// # Load Config with Invalid Values
    ///
    /// Tests that malformed TOML and unknown enum values are rejected.
    ///
    /// ## Test Scenario
    /// - Loads a syntactically broken file
    /// - Loads a file with an unknown pr_status
    ///
    /// ## Expected Outcome
    /// - Both loads return errors
    #[test]
    fn test_load_from_path_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        fs::write(&config_path, "source_org = [unterminated").unwrap();
        assert!(Config::load_from_path(&config_path).is_err());

        fs::write(&config_path, "pr_status = \"merged\"").unwrap();
        let err = Config::load_from_path(&config_path).unwrap_err();
        assert!(err.to_string().contains("pr_status"));
    }

    /// # Missing Config File
    ///
    /// Tests that a missing file yields the defaults.
    ///
    /// ## Test Scenario
    /// - Loads a path that does not exist
    ///
    /// ## Expected Outcome
    /// - The default configuration is returned
    #[test]
    fn test_load_from_path_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from_path(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.max_concurrent_repos, Some(ParsedProperty::Default(1)));
        assert_eq!(config.source_org, None);
    }

    /// # Sample Config Creation
    ///
    /// Tests writing the sample config under XDG_CONFIG_HOME.
    ///
    /// ## Test Scenario
    /// - Points XDG_CONFIG_HOME at a temporary directory
    /// - Creates the sample config twice
    ///
    /// ## Expected Outcome
    /// - The file is created, parses as valid config, and is not overwritten
    #[test]
    #[file_serial(env_tests)]
    fn test_create_sample_config() {
        let temp_dir = TempDir::new().unwrap();
        let original_xdg = env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        let path = Config::create_sample_config().unwrap();
        assert_eq!(path, temp_dir.path().join("ado-migrator").join("config.toml"));
        assert!(path.exists());

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(
            loaded.pr_status.as_ref().map(|p| *p.value()),
            Some(PrStatusFilter::All)
        );

        fs::write(&path, "work_items = true").unwrap();
        Config::create_sample_config().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "work_items = true");

        match original_xdg {
            Some(val) => unsafe {
                env::set_var("XDG_CONFIG_HOME", val);
            },
            None => unsafe {
                env::remove_var("XDG_CONFIG_HOME");
            },
        }
    }

    /// # Split List
    ///
    /// Tests the comma-separated list helper.
    ///
    /// ## Test Scenario
    /// - Splits lists with whitespace and empty entries
    ///
    /// ## Expected Outcome
    /// - Entries are trimmed and empty ones dropped
    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a , b,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }
}
