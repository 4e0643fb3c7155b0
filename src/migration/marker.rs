//! Provenance markers on migrated entities.
//!
//! Recreated pull requests get a `[MIGRATED]` title prefix and a footer in
//! the description naming the source pull request. Work items get the
//! `ado-migrated` tag plus `migrated-from-<source id>` and
//! `migrated-project-<organization>/<project>`. Both markers are what makes a
//! second run skip entities created by the first one, and the organization
//! and project they record keep several source projects consolidated into
//! one target apart.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::PullRequest;

pub const TITLE_PREFIX: &str = "[MIGRATED]";
pub const MIGRATED_TAG: &str = "ado-migrated";
pub const SOURCE_TAG_PREFIX: &str = "migrated-from-";
pub const SOURCE_PROJECT_TAG_PREFIX: &str = "migrated-project-";

/// Maximum pull request description length accepted by Azure DevOps.
pub const DESCRIPTION_LIMIT: usize = 4000;

const TRUNCATION_NOTE: &str = "\n\n*(description truncated during migration)*";

static FOOTER_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_footer_regex() -> &'static Regex {
    FOOTER_REGEX.get_or_init(|| {
        Regex::new(r"(?m)^Migrated from ([^/\n]+)/([^/\n]+)/([^/\n]+) pull request #(\d+)[ \t\r]*$")
            .expect("Failed to compile provenance footer regex")
    })
}

/// Where a migrated pull request came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestOrigin {
    pub organization: String,
    pub project: String,
    pub repository: String,
    pub pull_request_id: i32,
}

impl PullRequestOrigin {
    /// One-line footer stored at the end of the target description.
    pub fn footer(&self) -> String {
        format!(
            "Migrated from {}/{}/{} pull request #{}",
            self.organization, self.project, self.repository, self.pull_request_id
        )
    }

    /// Parses the footer back out of a description. Names may contain
    /// spaces but never `/`.
    pub fn parse(description: &str) -> Option<Self> {
        let caps = get_footer_regex().captures_iter(description).last()?;
        Some(Self {
            organization: caps[1].to_string(),
            project: caps[2].to_string(),
            repository: caps[3].to_string(),
            pull_request_id: caps[4].parse().ok()?,
        })
    }

    /// Same source pull request. Azure DevOps names are case-insensitive.
    pub fn same_source(&self, other: &PullRequestOrigin) -> bool {
        self.pull_request_id == other.pull_request_id
            && self.organization.eq_ignore_ascii_case(&other.organization)
            && self.project.eq_ignore_ascii_case(&other.project)
            && self.repository.eq_ignore_ascii_case(&other.repository)
    }
}

/// `[MIGRATED] <title>`; titles that already carry the prefix are kept.
pub fn marked_title(title: &str) -> String {
    if is_marked(title) {
        title.to_string()
    } else {
        format!("{} {}", TITLE_PREFIX, title)
    }
}

pub fn is_marked(title: &str) -> bool {
    title.starts_with(TITLE_PREFIX)
}

/// Original description followed by the provenance footer, cut down so the
/// result fits [`DESCRIPTION_LIMIT`] characters. The footer always survives.
pub fn marked_description(description: Option<&str>, origin: &PullRequestOrigin) -> String {
    let footer = format!("---\n{}", origin.footer());
    let body = description.map(str::trim_end).unwrap_or_default();
    if body.is_empty() {
        return footer;
    }

    let separator = "\n\n";
    let full_len = body.chars().count() + separator.len() + footer.chars().count();
    if full_len <= DESCRIPTION_LIMIT {
        return format!("{}{}{}", body, separator, footer);
    }

    let budget = DESCRIPTION_LIMIT
        .saturating_sub(footer.chars().count() + separator.len() + TRUNCATION_NOTE.chars().count());
    let truncated: String = body.chars().take(budget).collect();
    format!("{}{}{}{}", truncated, TRUNCATION_NOTE, separator, footer)
}

/// Returns true if `target` was created from `source` (found at `origin`)
/// by an earlier run.
///
/// The footer decides when present. Without one (edited description), the
/// marked title and both branches must match.
pub fn is_migration_of(
    target: &PullRequest,
    source: &PullRequest,
    origin: &PullRequestOrigin,
) -> bool {
    if !is_marked(&target.title) {
        return false;
    }
    match target.description.as_deref().and_then(PullRequestOrigin::parse) {
        Some(found) => found.same_source(origin),
        None => {
            target.title == marked_title(&source.title)
                && target.source_ref_name == source.source_ref_name
                && target.target_ref_name == source.target_ref_name
        }
    }
}

/// Tag naming the source work item.
pub fn source_tag(source_id: i32) -> String {
    format!("{}{}", SOURCE_TAG_PREFIX, source_id)
}

/// Tag naming the source organization and project.
pub fn project_tag(organization: &str, project: &str) -> String {
    format!("{}{}/{}", SOURCE_PROJECT_TAG_PREFIX, organization, project)
}

fn split_tags(tags: &str) -> impl Iterator<Item = &str> {
    tags.split(';').map(str::trim).filter(|t| !t.is_empty())
}

fn has_prefix(tag: &str, prefix: &str) -> bool {
    tag.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Parses the source id out of a `System.Tags` value. Items migrated from
/// another project (a different `project_tag`) yield `None`.
pub fn source_id_from_tags(tags: &str, project_tag: &str) -> Option<i32> {
    if !split_tags(tags).any(|t| t.eq_ignore_ascii_case(project_tag)) {
        return None;
    }
    split_tags(tags)
        .filter(|tag| has_prefix(tag, SOURCE_TAG_PREFIX))
        .filter_map(|tag| tag[SOURCE_TAG_PREFIX.len()..].parse().ok())
        .last()
}

/// Existing tags plus the migration tags, `; `-separated. Provenance tags a
/// source item carries from an earlier migration of its own are replaced.
pub fn merge_tags(existing: Option<&str>, source_id: i32, project_tag: &str) -> String {
    let mut tags: Vec<String> = split_tags(existing.unwrap_or_default())
        .filter(|t| !has_prefix(t, SOURCE_TAG_PREFIX) && !has_prefix(t, SOURCE_PROJECT_TAG_PREFIX))
        .map(String::from)
        .collect();
    if !tags.iter().any(|t| t.eq_ignore_ascii_case(MIGRATED_TAG)) {
        tags.push(MIGRATED_TAG.to_string());
    }
    tags.push(source_tag(source_id));
    tags.push(project_tag.to_string());
    tags.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IdentityRef, PullRequestStatus};

    fn origin(id: i32) -> PullRequestOrigin {
        PullRequestOrigin {
            organization: "old-org".to_string(),
            project: "Legacy Project".to_string(),
            repository: "svc-a".to_string(),
            pull_request_id: id,
        }
    }

    fn pr(id: i32, title: &str, description: Option<&str>) -> PullRequest {
        PullRequest {
            id,
            title: title.to_string(),
            description: description.map(String::from),
            source_ref_name: "refs/heads/fix".to_string(),
            target_ref_name: "refs/heads/main".to_string(),
            status: PullRequestStatus::Active,
            created_by: IdentityRef {
                display_name: "Jane".to_string(),
                unique_name: None,
            },
            creation_date: None,
            is_draft: false,
            last_merge_source_commit: None,
        }
    }

    /// # Title Marker
    ///
    /// Tests adding the title prefix.
    ///
    /// ## Test Scenario
    /// - Marks a plain title and an already marked title
    ///
    /// ## Expected Outcome
    /// - The prefix is added exactly once
    #[test]
    fn test_marked_title() {
        assert_eq!(marked_title("Fix bug"), "[MIGRATED] Fix bug");
        assert_eq!(marked_title("[MIGRATED] Fix bug"), "[MIGRATED] Fix bug");
        assert!(is_marked("[MIGRATED] Fix bug"));
        assert!(!is_marked("Fix bug [MIGRATED]"));
    }

    /// # Footer Round Trip
    ///
    /// Tests writing and parsing the provenance footer.
    ///
    /// ## Test Scenario
    /// - Builds a description for PR #42 in a project with a space
    ///
    /// ## Expected Outcome
    /// - The parsed origin equals the original
    #[test]
    fn test_footer_parse() {
        let description = marked_description(Some("Null check in parser"), &origin(42));
        assert!(description.starts_with("Null check in parser\n\n---\n"));
        assert_eq!(PullRequestOrigin::parse(&description), Some(origin(42)));
        assert_eq!(PullRequestOrigin::parse("no footer here"), None);
    }

    /// # Description Without Body
    ///
    /// Tests a source PR without description.
    ///
    /// ## Test Scenario
    /// - Builds the description from None
    ///
    /// ## Expected Outcome
    /// - Only the footer is written
    #[test]
    fn test_marked_description_empty_body() {
        let description = marked_description(None, &origin(7));
        assert_eq!(
            description,
            "---\nMigrated from old-org/Legacy Project/svc-a pull request #7"
        );
    }

    /// # Description Truncation
    ///
    /// Tests the 4000 character limit.
    ///
    /// ## Test Scenario
    /// - Builds the description from a 5000 character body
    ///
    /// ## Expected Outcome
    /// - Result fits the limit and still ends with a parsable footer
    #[test]
    fn test_marked_description_truncation() {
        let body = "é".repeat(5000);
        let description = marked_description(Some(&body), &origin(9));

        assert!(description.chars().count() <= DESCRIPTION_LIMIT);
        assert!(description.contains("truncated during migration"));
        assert_eq!(
            PullRequestOrigin::parse(&description).map(|o| o.pull_request_id),
            Some(9)
        );
    }

    /// # Migration Detection
    ///
    /// Tests recognizing target PRs created by an earlier run.
    ///
    /// ## Test Scenario
    /// - Target with footer for #42, target for #43, unmarked target,
    ///   marked target without footer
    ///
    /// ## Expected Outcome
    /// - Footer id decides, title fallback applies without footer
    #[test]
    fn test_is_migration_of() {
        let source = pr(42, "Fix bug", None);
        let migrated = pr(
            1,
            "[MIGRATED] Fix bug",
            Some(&marked_description(None, &origin(42))),
        );
        let other = pr(
            2,
            "[MIGRATED] Fix bug",
            Some(&marked_description(None, &origin(43))),
        );
        let unmarked = pr(3, "Fix bug", Some(&marked_description(None, &origin(42))));
        let edited = pr(4, "[MIGRATED] Fix bug", Some("rewritten by hand"));
        let mut svc_b = origin(42);
        svc_b.repository = "svc-b".to_string();

        assert!(is_migration_of(&migrated, &source, &origin(42)));
        assert!(!is_migration_of(&migrated, &source, &svc_b));
        assert!(!is_migration_of(&other, &source, &origin(42)));
        assert!(!is_migration_of(&unmarked, &source, &origin(42)));
        assert!(is_migration_of(&edited, &source, &origin(42)));
    }

    /// # Same Titles In A Repository With A Space
    ///
    /// Tests two bot pull requests with identical titles in `My Service`.
    ///
    /// ## Test Scenario
    /// - Source PRs !1 and !2, both "Bump deps", on different branches
    /// - Target PR created for !1
    ///
    /// ## Expected Outcome
    /// - The footer parses with the spaced repository name
    /// - The target PR counts as the migration of !1 only
    /// - An edited target without footer still needs matching branches
    #[test]
    fn test_same_titles_in_repository_with_space() {
        let origin_of = |id| PullRequestOrigin {
            repository: "My Service".to_string(),
            ..origin(id)
        };
        let first = pr(1, "Bump deps", None);
        let mut second = pr(2, "Bump deps", None);
        second.source_ref_name = "refs/heads/bump-2".to_string();

        let description = marked_description(Some("Automated"), &origin_of(1));
        assert_eq!(PullRequestOrigin::parse(&description), Some(origin_of(1)));

        let migrated = pr(10, "[MIGRATED] Bump deps", Some(&description));
        assert!(is_migration_of(&migrated, &first, &origin_of(1)));
        assert!(!is_migration_of(&migrated, &second, &origin_of(2)));

        let edited = pr(11, "[MIGRATED] Bump deps", Some("edited"));
        assert!(is_migration_of(&edited, &first, &origin_of(1)));
        assert!(!is_migration_of(&edited, &second, &origin_of(2)));
    }

    /// # Footer From Another Source Project
    ///
    /// Tests two source projects consolidated into one target.
    ///
    /// ## Test Scenario
    /// - Target PR migrated from `other-org/Legacy Project/svc-a` #42
    ///
    /// ## Expected Outcome
    /// - It is not the migration of `old-org/Legacy Project/svc-a` #42
    /// - Names compare case-insensitively
    #[test]
    fn test_footer_from_another_project() {
        let foreign = PullRequestOrigin {
            organization: "other-org".to_string(),
            ..origin(42)
        };
        let target = pr(
            1,
            "[MIGRATED] Fix bug",
            Some(&marked_description(None, &foreign)),
        );
        let source = pr(42, "Fix bug", None);

        assert!(!is_migration_of(&target, &source, &origin(42)));
        let shouting = PullRequestOrigin {
            project: "LEGACY PROJECT".to_string(),
            ..origin(42)
        };
        assert!(origin(42).same_source(&shouting));
    }

    /// # Footer After Prose Mentioning Migration
    ///
    /// Tests a description whose body starts with "Migrated from".
    ///
    /// ## Test Scenario
    /// - Body "Migrated from the old build system" followed by the footer
    ///
    /// ## Expected Outcome
    /// - The footer line is parsed, not the prose
    #[test]
    fn test_footer_after_prose() {
        let description = marked_description(Some("Migrated from the old build system"), &origin(5));
        assert_eq!(PullRequestOrigin::parse(&description), Some(origin(5)));
    }

    /// # Work Item Tags
    ///
    /// Tests merging and parsing migration tags.
    ///
    /// ## Test Scenario
    /// - Merges into existing tags, into none, and into already tagged values
    ///
    /// ## Expected Outcome
    /// - Tags are added once and the source id parses back
    #[test]
    fn test_work_item_tags() {
        let project = project_tag("old-org", "Legacy");
        assert_eq!(project, "migrated-project-old-org/Legacy");
        assert_eq!(
            merge_tags(Some("backend; urgent"), 101, &project),
            "backend; urgent; ado-migrated; migrated-from-101; migrated-project-old-org/Legacy"
        );
        assert_eq!(
            merge_tags(None, 5, &project),
            "ado-migrated; migrated-from-5; migrated-project-old-org/Legacy"
        );

        assert_eq!(
            source_id_from_tags(&merge_tags(Some("backend"), 101, &project), &project),
            Some(101)
        );
        assert_eq!(source_id_from_tags("backend", &project), None);
    }

    /// # Source Item Tagged By An Earlier Migration
    ///
    /// Tests an item that was itself created by a migration.
    ///
    /// ## Test Scenario
    /// - Source item 50 tagged `ado-migrated; migrated-from-7` with a
    ///   project tag from its own origin
    ///
    /// ## Expected Outcome
    /// - Old provenance tags are replaced, the id parses back as 50
    #[test]
    fn test_tags_from_earlier_migration_are_replaced() {
        let project = project_tag("old-org", "Legacy");
        let tags = merge_tags(
            Some("ado-migrated; Migrated-From-7; migrated-project-first-org/Origin; ui"),
            50,
            &project,
        );

        assert_eq!(
            tags,
            "ado-migrated; ui; migrated-from-50; migrated-project-old-org/Legacy"
        );
        assert_eq!(source_id_from_tags(&tags, &project), Some(50));
    }

    /// # Tags From Another Source Project
    ///
    /// Tests reading tags written by a migration of a different project.
    ///
    /// ## Test Scenario
    /// - Target item tagged for `other-org/Legacy` #7
    ///
    /// ## Expected Outcome
    /// - No source id for `old-org/Legacy`, case of the project tag ignored
    #[test]
    fn test_tags_from_another_project() {
        let tags = merge_tags(None, 7, &project_tag("other-org", "Legacy"));

        assert_eq!(source_id_from_tags(&tags, &project_tag("old-org", "Legacy")), None);
        assert_eq!(source_id_from_tags(&tags, &project_tag("OTHER-ORG", "legacy")), Some(7));
    }
}
