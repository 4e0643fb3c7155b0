use crate::{
    config::{Config, split_list},
    error::ConfigError,
    parsed_property::ParsedProperty,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// CLI Arguments
// ============================================================================

/// Which source pull requests are migrated.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PrStatusFilter {
    /// Only open pull requests.
    Active,
    /// Only completed pull requests.
    Completed,
    /// Only abandoned pull requests.
    Abandoned,
    /// Every pull request regardless of status.
    #[default]
    All,
}

impl PrStatusFilter {
    /// Value for the `searchCriteria.status` query parameter.
    pub fn as_query(self) -> &'static str {
        match self {
            PrStatusFilter::Active => "active",
            PrStatusFilter::Completed => "completed",
            PrStatusFilter::Abandoned => "abandoned",
            PrStatusFilter::All => "all",
        }
    }

    /// Returns true if a pull request with this status passes the filter.
    pub fn matches(self, status: PullRequestStatus) -> bool {
        match self {
            PrStatusFilter::All => true,
            PrStatusFilter::Active => status == PullRequestStatus::Active,
            PrStatusFilter::Completed => status == PullRequestStatus::Completed,
            PrStatusFilter::Abandoned => status == PullRequestStatus::Abandoned,
        }
    }
}

impl std::fmt::Display for PrStatusFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_query())
    }
}

/// Output format for progress and the final summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON summary at the end.
    Json,
    /// Newline-delimited JSON (one event per line).
    Ndjson,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Ndjson => write!(f, "ndjson"),
        }
    }
}

#[derive(Parser, Clone, Debug, Default)]
#[command(
    name = "ado-migrator",
    author,
    version,
    about = "Migrate repositories, pull requests and work items between Azure DevOps projects",
    long_about = "A one-shot batch tool that copies an Azure DevOps project into another project,\n\
        possibly in another organization.\n\n\
        For every source repository it:\n  \
        • creates the target repository if needed and pushes all branches and tags\n  \
        • recreates pull requests with a [MIGRATED] title marker and replays their comments\n  \
        • optionally copies work items and their links (--work-items)\n\n\
        Re-running is safe: pull requests and work items that were already migrated are skipped.\n\n\
        Configuration can be provided via CLI arguments, environment variables (ADO_MIGRATOR_*),\n\
        or a config file (~/.config/ado-migrator/config.toml).",
    after_help = "EXAMPLES:\n    \
        # Migrate everything from one organization to another\n    \
        ado-migrator --source-org old --source-project Legacy --source-pat <PAT> \\\n        \
        --target-org new --target-project Platform --target-pat <PAT>\n\n    \
        # Only two repositories, open pull requests, plus work items\n    \
        ado-migrator ... --repos svc-a,svc-b --pr-status active --work-items\n\n    \
        # Create sample config file\n    \
        ado-migrator --create-config"
)]
pub struct Args {
    // Source
    /// Source Azure DevOps organization
    #[arg(long, help_heading = "Source")]
    pub source_org: Option<String>,

    /// Source project
    #[arg(long, help_heading = "Source")]
    pub source_project: Option<String>,

    /// Personal Access Token for the source organization
    #[arg(long, help_heading = "Source")]
    pub source_pat: Option<String>,

    // Target
    /// Target Azure DevOps organization
    #[arg(long, help_heading = "Target")]
    pub target_org: Option<String>,

    /// Target project
    #[arg(long, help_heading = "Target")]
    pub target_project: Option<String>,

    /// Personal Access Token for the target organization
    #[arg(long, help_heading = "Target")]
    pub target_pat: Option<String>,

    /// Azure DevOps server base URL [default: https://dev.azure.com]
    #[arg(long, help_heading = "Target")]
    pub api_url: Option<String>,

    // Scope
    /// Only migrate these repositories (comma-separated)
    #[arg(long, value_delimiter = ',', help_heading = "Scope")]
    pub repos: Option<Vec<String>>,

    /// Which pull requests to migrate [default: all]
    #[arg(long, value_enum, help_heading = "Scope")]
    pub pr_status: Option<PrStatusFilter>,

    /// Also migrate work items and their links
    #[arg(long, help_heading = "Scope")]
    pub work_items: bool,

    /// WIQL query selecting the source work items
    #[arg(long, help_heading = "Scope")]
    pub work_item_query: Option<String>,

    /// Do not mirror repositories (assume they were pushed already)
    #[arg(long, help_heading = "Scope")]
    pub skip_repos: bool,

    /// Do not migrate pull requests
    #[arg(long, help_heading = "Scope")]
    pub skip_pull_requests: bool,

    // Execution
    /// Number of repositories mirrored at the same time [default: 1]
    #[arg(long, help_heading = "Execution")]
    pub max_concurrent_repos: Option<usize>,

    /// Directory for mirror clones [default: temporary directory]
    #[arg(long, help_heading = "Execution")]
    pub work_dir: Option<String>,

    // Output
    /// Output format for progress and summary
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, help_heading = "Output")]
    pub output: OutputFormat,

    /// Only print failures and the summary
    #[arg(short, long, help_heading = "Output")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off) [default: info]
    #[arg(long, help_heading = "Logging")]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, help_heading = "Logging")]
    pub log_file: Option<PathBuf>,

    /// Log format (text, json)
    #[arg(long, help_heading = "Logging")]
    pub log_format: Option<String>,

    /// Create a sample configuration file at ~/.config/ado-migrator/config.toml
    #[arg(long)]
    pub create_config: bool,
}

// ============================================================================
// Resolved Configuration
// ============================================================================

/// One side of the migration: an organization/project pair and its PAT.
#[derive(Clone)]
pub struct Endpoint {
    pub organization: ParsedProperty<String>,
    pub project: ParsedProperty<String>,
    pub pat: SecretString,
    pub api_url: ParsedProperty<String>,
}

impl Endpoint {
    /// Builds an endpoint from plain values, mostly for tests and library use.
    pub fn new(organization: &str, project: &str, pat: &str, api_url: &str) -> Self {
        Self {
            organization: ParsedProperty::Default(organization.to_string()),
            project: ParsedProperty::Default(project.to_string()),
            pat: SecretString::from(pat.to_string()),
            api_url: ParsedProperty::Default(api_url.to_string()),
        }
    }

    /// `org/project` label for logs and reports.
    pub fn label(&self) -> String {
        format!("{}/{}", self.organization.value(), self.project.value())
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("organization", &self.organization)
            .field("project", &self.project)
            .field("pat", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Immutable configuration for a whole migration run.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub source: Endpoint,
    pub target: Endpoint,
    /// Repository name filter; `None` migrates every repository.
    pub repos: Option<ParsedProperty<Vec<String>>>,
    pub pr_status: ParsedProperty<PrStatusFilter>,
    pub work_items: ParsedProperty<bool>,
    pub work_item_query: Option<ParsedProperty<String>>,
    pub skip_repos: bool,
    pub skip_pull_requests: bool,
    pub max_concurrent_repos: ParsedProperty<usize>,
    pub work_dir: Option<ParsedProperty<PathBuf>>,
    pub output_format: OutputFormat,
    pub quiet: bool,
}

impl MigrationConfig {
    /// Builds a configuration with default run options.
    pub fn new(source: Endpoint, target: Endpoint) -> Self {
        Self {
            source,
            target,
            repos: None,
            pr_status: PrStatusFilter::All.into(),
            work_items: false.into(),
            work_item_query: None,
            skip_repos: false,
            skip_pull_requests: false,
            max_concurrent_repos: 1.into(),
            work_dir: None,
            output_format: OutputFormat::Text,
            quiet: false,
        }
    }

    /// Returns true if the repository passes the `--repos` filter.
    pub fn includes_repository(&self, name: &str) -> bool {
        match &self.repos {
            Some(names) => names.iter().any(|n| n.eq_ignore_ascii_case(name)),
            None => true,
        }
    }
}

fn required<T>(value: Option<ParsedProperty<T>>, field: &str) -> Result<ParsedProperty<T>> {
    value.ok_or_else(|| {
        ConfigError::MissingRequired {
            field: field.to_string(),
            env_var: format!("ADO_MIGRATOR_{}", field.replace('-', "_").to_uppercase()),
        }
        .into()
    })
}

fn cli_string(value: &Option<String>) -> Option<ParsedProperty<String>> {
    value
        .as_ref()
        .map(|v| ParsedProperty::Cli(v.clone(), v.clone()))
}

impl Args {
    /// Resolve configuration from CLI args, environment variables and config file.
    /// Priority: CLI args > environment variables > config file > defaults
    pub fn resolve_config(self) -> Result<MigrationConfig> {
        self.resolve_with(Config::load_from_file()?, Config::load_from_env())
    }

    /// Resolution against explicitly supplied file and environment layers.
    pub fn resolve_with(self, file_config: Config, env_config: Config) -> Result<MigrationConfig> {
        let cli_config = Config {
            source_org: cli_string(&self.source_org),
            source_project: cli_string(&self.source_project),
            source_pat: cli_string(&self.source_pat),
            target_org: cli_string(&self.target_org),
            target_project: cli_string(&self.target_project),
            target_pat: cli_string(&self.target_pat),
            api_url: cli_string(&self.api_url),
            repos: self
                .repos
                .as_ref()
                .map(|v| ParsedProperty::Cli(split_list(&v.join(",")), v.join(","))),
            pr_status: self
                .pr_status
                .map(|v| ParsedProperty::Cli(v, v.to_string())),
            work_items: self
                .work_items
                .then(|| ParsedProperty::Cli(true, "true".to_string())),
            work_item_query: cli_string(&self.work_item_query),
            max_concurrent_repos: self
                .max_concurrent_repos
                .map(|v| ParsedProperty::Cli(v, v.to_string())),
            work_dir: cli_string(&self.work_dir),
        };

        // Merge configs: defaults < file < env < cli
        let merged = Config::default()
            .merge(file_config)
            .merge(env_config)
            .merge(cli_config);

        let api_url = merged
            .api_url
            .unwrap_or_else(|| crate::config::DEFAULT_API_URL.to_string().into());
        if url::Url::parse(api_url.value()).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "api-url".to_string(),
                message: format!("'{}' is not a valid URL", api_url.value()),
            }
            .into());
        }

        let max_concurrent_repos = merged.max_concurrent_repos.unwrap_or(1.into());
        if *max_concurrent_repos.value() == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max-concurrent-repos".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }

        let source = Endpoint {
            organization: required(merged.source_org, "source-org")?,
            project: required(merged.source_project, "source-project")?,
            pat: SecretString::from(required(merged.source_pat, "source-pat")?.into_value()),
            api_url: api_url.clone(),
        };
        let target = Endpoint {
            organization: required(merged.target_org, "target-org")?,
            project: required(merged.target_project, "target-project")?,
            pat: SecretString::from(required(merged.target_pat, "target-pat")?.into_value()),
            api_url,
        };

        Ok(MigrationConfig {
            source,
            target,
            repos: merged.repos.filter(|r| !r.value().is_empty()),
            pr_status: merged.pr_status.unwrap_or(PrStatusFilter::All.into()),
            work_items: merged.work_items.unwrap_or(false.into()),
            work_item_query: merged.work_item_query,
            skip_repos: self.skip_repos,
            skip_pull_requests: self.skip_pull_requests,
            max_concurrent_repos,
            work_dir: merged.work_dir.map(|p| p.map(PathBuf::from)),
            output_format: self.output,
            quiet: self.quiet,
        })
    }
}

// ============================================================================
// Domain Models
// ============================================================================

/// Azure DevOps project identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
}

/// A git repository inside a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub id: String,
    pub name: String,
    /// Full ref name, e.g. `refs/heads/main`; `None` for empty repositories.
    pub default_branch: Option<String>,
    pub remote_url: String,
    pub is_disabled: bool,
    /// Packed size in bytes as reported by the server.
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRef {
    pub display_name: String,
    pub unique_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PullRequestStatus {
    Active,
    Completed,
    Abandoned,
    #[serde(other)]
    NotSet,
}

impl PullRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PullRequestStatus::Active => "active",
            PullRequestStatus::Completed => "completed",
            PullRequestStatus::Abandoned => "abandoned",
            PullRequestStatus::NotSet => "notSet",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub source_ref_name: String,
    pub target_ref_name: String,
    pub status: PullRequestStatus,
    pub created_by: IdentityRef,
    pub creation_date: Option<DateTime<Utc>>,
    pub is_draft: bool,
    /// Head of the source branch as seen by the last merge attempt.
    pub last_merge_source_commit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentType {
    Text,
    CodeChange,
    System,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: i32,
    /// 0 for the first comment of a thread.
    pub parent_comment_id: i32,
    pub author: IdentityRef,
    pub content: String,
    pub published_date: Option<DateTime<Utc>>,
    pub comment_type: CommentType,
    pub is_deleted: bool,
}

impl Comment {
    /// System comments and deleted comments are not replayed.
    pub fn is_replayable(&self) -> bool {
        !self.is_deleted
            && self.comment_type != CommentType::System
            && !self.content.trim().is_empty()
    }
}

/// File position a review thread is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadContext {
    pub file_path: String,
    pub line: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentThread {
    pub id: i32,
    pub status: Option<String>,
    pub context: Option<ThreadContext>,
    pub published_date: Option<DateTime<Utc>>,
    pub comments: Vec<Comment>,
}

/// A link from a work item to another work item or an external resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItemRelation {
    pub rel: String,
    pub url: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub id: i32,
    pub fields: serde_json::Map<String, serde_json::Value>,
    pub relations: Vec<WorkItemRelation>,
}

impl WorkItem {
    /// Returns a string field such as `System.Title`.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }

    pub fn work_item_type(&self) -> &str {
        self.field_str("System.WorkItemType").unwrap_or("Task")
    }

    pub fn title(&self) -> &str {
        self.field_str("System.Title").unwrap_or_default()
    }

    pub fn state(&self) -> Option<&str> {
        self.field_str("System.State")
    }

    pub fn tags(&self) -> Option<&str> {
        self.field_str("System.Tags")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn full_args() -> Args {
        Args {
            source_org: Some("old-org".to_string()),
            source_project: Some("Legacy".to_string()),
            source_pat: Some("source-secret".to_string()),
            target_org: Some("new-org".to_string()),
            target_project: Some("Platform".to_string()),
            target_pat: Some("target-secret".to_string()),
            ..Args::default()
        }
    }

    /// # Resolve Config From CLI
    ///
    /// Tests that the six required flags produce a complete configuration.
    ///
    /// ## Test Scenario
    /// - Resolves CLI args against empty file/env layers
    ///
    /// ## Expected Outcome
    /// - Endpoints carry the CLI values, options carry defaults
    #[test]
    fn test_resolve_config_from_cli() {
        let config = full_args()
            .resolve_with(Config::default(), Config::default())
            .unwrap();

        assert_eq!(config.source.organization.value(), "old-org");
        assert_eq!(config.source.organization.source_name(), "cli");
        assert_eq!(config.target.project.value(), "Platform");
        assert_eq!(config.source.pat.expose_secret(), "source-secret");
        assert_eq!(config.target.pat.expose_secret(), "target-secret");
        assert_eq!(config.source.api_url.value(), "https://dev.azure.com");
        assert_eq!(*config.pr_status.value(), PrStatusFilter::All);
        assert!(!*config.work_items.value());
        assert_eq!(*config.max_concurrent_repos.value(), 1);
        assert!(config.repos.is_none());
    }

    /// # Missing Required Field
    ///
    /// Tests that a missing PAT is reported with flag and env var hints.
    ///
    /// ## Test Scenario
    /// - Resolves args without --target-pat
    ///
    /// ## Expected Outcome
    /// - A ConfigError::MissingRequired naming target-pat
    #[test]
    fn test_resolve_config_missing_pat() {
        let args = Args {
            target_pat: None,
            ..full_args()
        };

        let err = args
            .resolve_with(Config::default(), Config::default())
            .unwrap_err();
        let config_err = err.downcast_ref::<ConfigError>().unwrap();
        assert!(matches!(config_err, ConfigError::MissingRequired { field, .. } if field == "target-pat"));
        assert!(err.to_string().contains("ADO_MIGRATOR_TARGET_PAT"));
    }

    /// # Layer Precedence
    ///
    /// Tests that CLI beats env and env beats the config file.
    ///
    /// ## Test Scenario
    /// - File sets source_org and max_concurrent_repos
    /// - Env overrides source_org
    /// - CLI overrides nothing for these two fields
    ///
    /// ## Expected Outcome
    /// - source_org comes from env, concurrency from the file
    #[test]
    fn test_resolve_config_layer_precedence() {
        let file = Config {
            source_org: Some(ParsedProperty::File(
                "file-org".to_string(),
                PathBuf::from("config.toml"),
                "file-org".to_string(),
            )),
            max_concurrent_repos: Some(ParsedProperty::File(
                3,
                PathBuf::from("config.toml"),
                "3".to_string(),
            )),
            ..Config::default()
        };
        let env = Config {
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
        let args = Args {
            source_org: None,
            ..full_args()
        };

        let config = args.resolve_with(file, env).unwrap();
        assert_eq!(config.source.organization.value(), "env-org");
        assert_eq!(config.source.organization.source_name(), "env");
        assert_eq!(*config.max_concurrent_repos.value(), 3);
        assert_eq!(config.max_concurrent_repos.source_name(), "file");
    }

    /// # Invalid Options
    ///
    /// Tests validation of the concurrency limit and API URL.
    ///
    /// ## Test Scenario
    /// - Resolves with --max-concurrent-repos 0
    /// - Resolves with a malformed --api-url
    ///
    /// ## Expected Outcome
    /// - Both are rejected as invalid values
    #[test]
    fn test_resolve_config_invalid_options() {
        let args = Args {
            max_concurrent_repos: Some(0),
            ..full_args()
        };
        let err = args
            .resolve_with(Config::default(), Config::default())
            .unwrap_err();
        assert!(err.to_string().contains("max-concurrent-repos"));

        let args = Args {
            api_url: Some("not a url".to_string()),
            ..full_args()
        };
        let err = args
            .resolve_with(Config::default(), Config::default())
            .unwrap_err();
        assert!(err.to_string().contains("api-url"));
    }

    /// # Repository Filter
    ///
    /// Tests the --repos filter helper.
    ///
    /// ## Test Scenario
    /// - Resolves with --repos svc-a
    ///
    /// ## Expected Outcome
    /// - Only svc-a passes, case-insensitively
    #[test]
    fn test_repository_filter() {
        let args = Args {
            repos: Some(vec!["svc-a".to_string()]),
            ..full_args()
        };
        let config = args
            .resolve_with(Config::default(), Config::default())
            .unwrap();

        assert!(config.includes_repository("svc-a"));
        assert!(config.includes_repository("SVC-A"));
        assert!(!config.includes_repository("svc-b"));

        let unfiltered = full_args()
            .resolve_with(Config::default(), Config::default())
            .unwrap();
        assert!(unfiltered.includes_repository("anything"));
    }

    /// # CLI Parsing
    ///
    /// Tests parsing the documented flags with clap.
    ///
    /// ## Test Scenario
    /// - Parses a full command line
    ///
    /// ## Expected Outcome
    /// - Flags map to the expected fields
    #[test]
    fn test_cli_parsing() {
        let args = Args::try_parse_from([
            "ado-migrator",
            "--source-org",
            "old",
            "--source-project",
            "Legacy",
            "--source-pat",
            "s",
            "--target-org",
            "new",
            "--target-project",
            "Platform",
            "--target-pat",
            "t",
            "--repos",
            "svc-a,svc-b",
            "--pr-status",
            "active",
            "--work-items",
            "--output",
            "ndjson",
        ])
        .unwrap();

        assert_eq!(args.source_org.as_deref(), Some("old"));
        assert_eq!(
            args.repos,
            Some(vec!["svc-a".to_string(), "svc-b".to_string()])
        );
        assert_eq!(args.pr_status, Some(PrStatusFilter::Active));
        assert!(args.work_items);
        assert_eq!(args.output, OutputFormat::Ndjson);
    }

    /// # Endpoint Debug Redaction
    ///
    /// Tests that printing an endpoint never reveals the PAT.
    ///
    /// ## Test Scenario
    /// - Formats an Endpoint with {:?}
    ///
    /// ## Expected Outcome
    /// - The PAT is replaced by [REDACTED]
    #[test]
    fn test_endpoint_debug_redacts_pat() {
        let endpoint = Endpoint::new("org", "proj", "super-secret", "https://dev.azure.com");
        let debug = format!("{:?}", endpoint);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
        assert_eq!(endpoint.label(), "org/proj");
    }

    /// # Status Filter Matching
    ///
    /// Tests PrStatusFilter against pull request statuses.
    ///
    /// ## Test Scenario
    /// - Matches each filter against each status
    ///
    /// ## Expected Outcome
    /// - `all` matches everything, others match their own status only
    #[test]
    fn test_pr_status_filter_matches() {
        assert!(PrStatusFilter::All.matches(PullRequestStatus::Abandoned));
        assert!(PrStatusFilter::Active.matches(PullRequestStatus::Active));
        assert!(!PrStatusFilter::Active.matches(PullRequestStatus::Completed));
        assert_eq!(PrStatusFilter::Completed.as_query(), "completed");
    }

    /// # Comment Replay Eligibility
    ///
    /// Tests which comments are replayed.
    ///
    /// ## Test Scenario
    /// - Builds text, system, deleted and blank comments
    ///
    /// ## Expected Outcome
    /// - Only the non-deleted, non-blank text comment is replayable
    #[test]
    fn test_comment_is_replayable() {
        let base = Comment {
            id: 1,
            parent_comment_id: 0,
            author: IdentityRef {
                display_name: "Jane".to_string(),
                unique_name: None,
            },
            content: "Looks good".to_string(),
            published_date: None,
            comment_type: CommentType::Text,
            is_deleted: false,
        };
        assert!(base.is_replayable());
        assert!(
            !Comment {
                comment_type: CommentType::System,
                ..base.clone()
            }
            .is_replayable()
        );
        assert!(
            !Comment {
                is_deleted: true,
                ..base.clone()
            }
            .is_replayable()
        );
        assert!(
            !Comment {
                content: "  ".to_string(),
                ..base
            }
            .is_replayable()
        );
    }
}
