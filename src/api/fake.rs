//! In-memory Azure DevOps project for tests.
//!
//! `FakeAdo` implements [`AdoApi`] on top of plain collections. With a git
//! root configured, repositories are real bare repositories on disk, so the
//! git layer can clone from and push to them like it would against a server.
//!
//! A few switches reproduce server behavior the migrators must cope with:
//! rejected PATs, repositories created concurrently by someone else, source
//! branches that cannot be used for a pull request and rejected work item
//! state transitions.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::mappers::extract_work_item_id;
use super::traits::{
    AdoApi, NewCommentThread, NewPullRequest, PatchOperation, PullRequestStatusUpdate,
};
use crate::error::ApiError;
use crate::git;
use crate::models::{
    Comment, CommentThread, CommentType, IdentityRef, PrStatusFilter, ProjectInfo, PullRequest,
    PullRequestStatus, Repository, WorkItem, WorkItemRelation,
};

const FAKE_BASE_URL: &str = "https://ado.fake";
const SERVICE_ACCOUNT: &str = "Migration Service";

#[derive(Default)]
struct FakeState {
    repositories: Vec<Repository>,
    pull_requests: BTreeMap<String, Vec<PullRequest>>,
    threads: BTreeMap<(String, i32), Vec<CommentThread>>,
    work_items: BTreeMap<i32, WorkItem>,
    next_repository_id: u32,
    next_pull_request_id: i32,
    next_thread_id: i32,
    next_work_item_id: i32,
    unauthorized: bool,
    revoked: bool,
    racing_creates: HashSet<String>,
    rejected_source_branches: HashSet<String>,
    rejected_states: HashSet<String>,
    /// Replies still accepted before `add_comment` starts failing.
    comment_budget: Option<usize>,
}

/// In-memory implementation of [`AdoApi`].
pub struct FakeAdo {
    organization: String,
    project: ProjectInfo,
    git_root: Option<PathBuf>,
    state: Mutex<FakeState>,
}

impl FakeAdo {
    pub fn new(organization: &str, project: &str) -> Self {
        Self {
            organization: organization.to_string(),
            project: ProjectInfo {
                id: format!("{}-{}-id", organization, project),
                name: project.to_string(),
            },
            git_root: None,
            state: Mutex::new(FakeState {
                next_repository_id: 1,
                next_pull_request_id: 1,
                next_thread_id: 1,
                next_work_item_id: 1,
                ..FakeState::default()
            }),
        }
    }

    /// Keeps repositories as bare git repositories under `root`.
    pub fn with_git_root(mut self, root: &Path) -> Self {
        self.git_root = Some(root.join(&self.organization).join(&self.project.name));
        self
    }

    /// Ids given to newly created work items start at `first_id`.
    pub fn with_first_work_item_id(self, first_id: i32) -> Self {
        self.state().next_work_item_id = first_id;
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_auth(&self) -> Result<(), ApiError> {
        let state = self.state();
        if state.unauthorized || state.revoked {
            Err(ApiError::Unauthorized)
        } else {
            Ok(())
        }
    }

    fn repository_path(&self, name: &str) -> Option<PathBuf> {
        self.git_root
            .as_ref()
            .map(|root| root.join(format!("{}.git", name)))
    }

    fn insert_repository(
        &self,
        state: &mut FakeState,
        name: &str,
        default_branch: Option<&str>,
    ) -> Result<Repository, ApiError> {
        let remote_url = match self.repository_path(name) {
            Some(path) => {
                git::init_bare(&path).map_err(|e| ApiError::RequestFailed {
                    status: 500,
                    message: e.to_string(),
                })?;
                path.to_string_lossy().into_owned()
            }
            None => format!(
                "{}/{}/{}/_git/{}",
                FAKE_BASE_URL, self.organization, self.project.name, name
            ),
        };

        let repo = Repository {
            id: format!("repo-{}", state.next_repository_id),
            name: name.to_string(),
            default_branch: default_branch.map(String::from),
            remote_url,
            is_disabled: false,
            size: 0,
        };
        state.next_repository_id += 1;
        state.repositories.push(repo.clone());
        Ok(repo)
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    /// Adds a repository. With a git root this creates an empty bare
    /// repository the test can push commits into.
    pub fn add_repository(&self, name: &str, default_branch: Option<&str>) -> Repository {
        let mut state = self.state();
        match self.insert_repository(&mut state, name, default_branch) {
            Ok(repo) => repo,
            Err(e) => panic!("failed to seed repository {}: {}", name, e),
        }
    }

    pub fn disable_repository(&self, name: &str) {
        if let Some(repo) = self
            .state()
            .repositories
            .iter_mut()
            .find(|r| r.name == name)
        {
            repo.is_disabled = true;
        }
    }

    /// Adds a pull request keeping its id.
    pub fn add_pull_request(&self, repository_id: &str, pull_request: PullRequest) {
        let mut state = self.state();
        state.next_pull_request_id = state.next_pull_request_id.max(pull_request.id + 1);
        state
            .pull_requests
            .entry(repository_id.to_string())
            .or_default()
            .push(pull_request);
    }

    pub fn add_thread(&self, repository_id: &str, pull_request_id: i32, thread: CommentThread) {
        let mut state = self.state();
        state.next_thread_id = state.next_thread_id.max(thread.id + 1);
        state
            .threads
            .entry((repository_id.to_string(), pull_request_id))
            .or_default()
            .push(thread);
    }

    /// Adds a work item keeping its id.
    pub fn add_work_item(&self, item: WorkItem) {
        let mut state = self.state();
        state.next_work_item_id = state.next_work_item_id.max(item.id + 1);
        state.work_items.insert(item.id, item);
    }

    /// Commits one file per message onto `branch` of a seeded repository
    /// and returns the branch history, oldest first.
    ///
    /// Panics when the fake has no git root.
    pub fn seed_commits(&self, name: &str, branch: &str, messages: &[&str]) -> Vec<String> {
        let bare = self
            .repository_path(name)
            .unwrap_or_else(|| panic!("{} has no git root", name));
        let work = tempfile::TempDir::new()
            .unwrap_or_else(|e| panic!("failed to create seed directory: {}", e));
        let bare_url = bare.to_string_lossy().into_owned();
        let ref_name = format!("refs/heads/{}", branch);

        seed_git(work.path(), &["init", "--quiet"]);
        if matches!(git::resolve_ref(&bare, &ref_name), Ok(Some(_))) {
            seed_git(work.path(), &["fetch", "--quiet", &bare_url, &ref_name]);
            seed_git(work.path(), &["reset", "--hard", "--quiet", "FETCH_HEAD"]);
        }
        for (index, message) in messages.iter().enumerate() {
            let file = work.path().join(format!("change-{}.txt", index));
            std::fs::write(&file, message)
                .unwrap_or_else(|e| panic!("failed to write seed file: {}", e));
            seed_git(work.path(), &["add", "."]);
            seed_git(work.path(), &["commit", "--quiet", "--allow-empty", "-m", message]);
        }
        seed_git(
            work.path(),
            &["push", "--quiet", &bare_url, &format!("HEAD:{}", ref_name)],
        );

        if let Some(repo) = self
            .state()
            .repositories
            .iter_mut()
            .find(|r| r.name == name && r.default_branch.is_none())
        {
            repo.default_branch = Some(ref_name.clone());
        }

        let log = seed_git(work.path(), &["rev-list", "--reverse", "HEAD"]);
        log.lines().map(str::to_string).collect()
    }

    /// Creates a lightweight tag in a seeded repository.
    pub fn seed_tag(&self, name: &str, tag: &str, target_ref: &str) {
        let bare = self
            .repository_path(name)
            .unwrap_or_else(|| panic!("{} has no git root", name));
        seed_git(&bare, &["tag", tag, target_ref]);
    }

    // ------------------------------------------------------------------
    // Failure switches
    // ------------------------------------------------------------------

    /// Every call fails with [`ApiError::Unauthorized`].
    pub fn set_unauthorized(&self, unauthorized: bool) {
        self.state().unauthorized = unauthorized;
    }

    /// The project lookup still works but every other call gets a 401, like
    /// a PAT that expires in the middle of a run.
    pub fn revoke_after_project_lookup(&self) {
        self.state().revoked = true;
    }

    /// `add_comment` accepts `accepted` more replies, then answers 503
    /// until [`FakeAdo::restore_comments`].
    pub fn fail_comments_after(&self, accepted: usize) {
        self.state().comment_budget = Some(accepted);
    }

    pub fn restore_comments(&self) {
        self.state().comment_budget = None;
    }

    /// The next create of `name` finds that someone else just created it.
    pub fn simulate_create_race(&self, name: &str) {
        self.state().racing_creates.insert(name.to_string());
    }

    /// Pull requests from `ref_name` are refused.
    pub fn reject_source_branch(&self, ref_name: &str) {
        self.state()
            .rejected_source_branches
            .insert(ref_name.to_string());
    }

    /// Transitions into `state` are refused.
    pub fn reject_state(&self, state: &str) {
        self.state().rejected_states.insert(state.to_string());
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn repositories(&self) -> Vec<Repository> {
        self.state().repositories.clone()
    }

    pub fn repository(&self, name: &str) -> Option<Repository> {
        self.state()
            .repositories
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Path of the bare repository backing `name`, when a git root is set.
    pub fn git_path(&self, name: &str) -> Option<PathBuf> {
        self.repository_path(name)
    }

    pub fn pull_requests(&self, repository_id: &str) -> Vec<PullRequest> {
        self.state()
            .pull_requests
            .get(repository_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn threads(&self, repository_id: &str, pull_request_id: i32) -> Vec<CommentThread> {
        self.state()
            .threads
            .get(&(repository_id.to_string(), pull_request_id))
            .cloned()
            .unwrap_or_default()
    }

    pub fn work_items(&self) -> Vec<WorkItem> {
        self.state().work_items.values().cloned().collect()
    }

    pub fn work_item(&self, id: i32) -> Option<WorkItem> {
        self.state().work_items.get(&id).cloned()
    }

    fn commit_for(&self, repository: &Repository, ref_name: &str) -> Result<Option<String>, ApiError> {
        match self.repository_path(&repository.name) {
            Some(path) => git::resolve_ref(&path, ref_name).map_err(|e| ApiError::RequestFailed {
                status: 500,
                message: e.to_string(),
            }),
            None => Ok(Some(format!("{:0>40}", ref_name.len()))),
        }
    }
}

/// Runs a fixture git command with a fixed identity, panicking on failure.
fn seed_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .env("GIT_AUTHOR_NAME", "Seed Author")
        .env("GIT_AUTHOR_EMAIL", "seed@example.com")
        .env("GIT_COMMITTER_NAME", "Seed Author")
        .env("GIT_COMMITTER_EMAIL", "seed@example.com")
        .output()
        .unwrap_or_else(|e| panic!("failed to run git {:?}: {}", args, e));
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Builds a work item with type and title set.
pub fn work_item(id: i32, work_item_type: &str, title: &str) -> WorkItem {
    let mut fields = serde_json::Map::new();
    fields.insert("System.WorkItemType".to_string(), work_item_type.into());
    fields.insert("System.Title".to_string(), title.into());
    fields.insert("System.State".to_string(), "New".into());
    WorkItem {
        id,
        fields,
        relations: Vec::new(),
    }
}

fn service_identity() -> IdentityRef {
    IdentityRef {
        display_name: SERVICE_ACCOUNT.to_string(),
        unique_name: None,
    }
}

fn reciprocal_link_type(rel: &str) -> String {
    if let Some(base) = rel.strip_suffix("-Forward") {
        format!("{}-Reverse", base)
    } else if let Some(base) = rel.strip_suffix("-Reverse") {
        format!("{}-Forward", base)
    } else {
        rel.to_string()
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::RequestFailed {
        status: 400,
        message: message.into(),
    }
}

#[async_trait]
impl AdoApi for FakeAdo {
    fn label(&self) -> String {
        format!("{}/{}", self.organization, self.project.name)
    }

    async fn get_project(&self) -> Result<ProjectInfo, ApiError> {
        if self.state().unauthorized {
            return Err(ApiError::Unauthorized);
        }
        Ok(self.project.clone())
    }

    async fn list_repositories(&self) -> Result<Vec<Repository>, ApiError> {
        self.check_auth()?;
        Ok(self.repositories())
    }

    async fn get_repository(&self, name: &str) -> Result<Option<Repository>, ApiError> {
        self.check_auth()?;
        Ok(self.repository(name))
    }

    async fn create_repository(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<Repository, ApiError> {
        self.check_auth()?;
        if project_id != self.project.id {
            return Err(ApiError::NotFound {
                resource: format!("project {}", project_id),
            });
        }

        let mut state = self.state();
        if state.racing_creates.remove(name) {
            self.insert_repository(&mut state, name, None)?;
            return Err(ApiError::Conflict {
                message: format!("TF400948: A Git repository with the name {} already exists.", name),
            });
        }
        if state
            .repositories
            .iter()
            .any(|r| r.name.eq_ignore_ascii_case(name))
        {
            return Err(ApiError::Conflict {
                message: format!("TF400948: A Git repository with the name {} already exists.", name),
            });
        }
        self.insert_repository(&mut state, name, None)
    }

    async fn set_default_branch(
        &self,
        repository_id: &str,
        ref_name: &str,
    ) -> Result<(), ApiError> {
        self.check_auth()?;
        let mut state = self.state();
        let repo = state
            .repositories
            .iter_mut()
            .find(|r| r.id == repository_id)
            .ok_or_else(|| ApiError::NotFound {
                resource: format!("repository {}", repository_id),
            })?;
        repo.default_branch = Some(ref_name.to_string());
        Ok(())
    }

    async fn list_pull_requests(
        &self,
        repository_id: &str,
        status: PrStatusFilter,
    ) -> Result<Vec<PullRequest>, ApiError> {
        self.check_auth()?;
        Ok(self
            .pull_requests(repository_id)
            .into_iter()
            .filter(|pr| status.matches(pr.status))
            .collect())
    }

    async fn list_threads(
        &self,
        repository_id: &str,
        pull_request_id: i32,
    ) -> Result<Vec<CommentThread>, ApiError> {
        self.check_auth()?;
        Ok(self.threads(repository_id, pull_request_id))
    }

    async fn create_pull_request(
        &self,
        repository_id: &str,
        pull_request: &NewPullRequest,
    ) -> Result<PullRequest, ApiError> {
        self.check_auth()?;
        let repository = self
            .state()
            .repositories
            .iter()
            .find(|r| r.id == repository_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound {
                resource: format!("repository {}", repository_id),
            })?;

        if self
            .state()
            .rejected_source_branches
            .contains(&pull_request.source_ref_name)
        {
            return Err(bad_request(format!(
                "TF401398: The source branch {} cannot be used for a pull request.",
                pull_request.source_ref_name
            )));
        }

        let source_commit = self.commit_for(&repository, &pull_request.source_ref_name)?;
        let target_commit = self.commit_for(&repository, &pull_request.target_ref_name)?;
        if source_commit.is_none() || target_commit.is_none() {
            return Err(bad_request(
                "TF401398: The pull request cannot be activated because the source and/or the target branch no longer exists.",
            ));
        }

        let mut state = self.state();
        let existing = state.pull_requests.entry(repository_id.to_string()).or_default();
        if existing.iter().any(|pr| {
            pr.status == PullRequestStatus::Active
                && pr.source_ref_name == pull_request.source_ref_name
                && pr.target_ref_name == pull_request.target_ref_name
        }) {
            return Err(ApiError::Conflict {
                message: "TF401179: An active pull request for the source and target branch already exists.".to_string(),
            });
        }

        let created = PullRequest {
            id: state.next_pull_request_id,
            title: pull_request.title.clone(),
            description: Some(pull_request.description.clone()),
            source_ref_name: pull_request.source_ref_name.clone(),
            target_ref_name: pull_request.target_ref_name.clone(),
            status: PullRequestStatus::Active,
            created_by: service_identity(),
            creation_date: Some(Utc::now()),
            is_draft: pull_request.is_draft,
            last_merge_source_commit: source_commit,
        };
        state.next_pull_request_id += 1;
        state
            .pull_requests
            .entry(repository_id.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn create_thread(
        &self,
        repository_id: &str,
        pull_request_id: i32,
        thread: &NewCommentThread,
    ) -> Result<CommentThread, ApiError> {
        self.check_auth()?;
        let mut state = self.state();
        let created = CommentThread {
            id: state.next_thread_id,
            status: thread.status.clone(),
            context: None,
            published_date: Some(Utc::now()),
            comments: vec![Comment {
                id: 1,
                parent_comment_id: 0,
                author: service_identity(),
                content: thread.content.clone(),
                published_date: Some(Utc::now()),
                comment_type: CommentType::Text,
                is_deleted: false,
            }],
        };
        state.next_thread_id += 1;
        state
            .threads
            .entry((repository_id.to_string(), pull_request_id))
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn add_comment(
        &self,
        repository_id: &str,
        pull_request_id: i32,
        thread_id: i32,
        parent_comment_id: i32,
        content: &str,
    ) -> Result<Comment, ApiError> {
        self.check_auth()?;
        let mut state = self.state();
        match state.comment_budget {
            Some(0) => {
                return Err(ApiError::RequestFailed {
                    status: 503,
                    message: "Service Unavailable".to_string(),
                });
            }
            Some(left) => state.comment_budget = Some(left - 1),
            None => {}
        }
        let thread = state
            .threads
            .get_mut(&(repository_id.to_string(), pull_request_id))
            .and_then(|threads| threads.iter_mut().find(|t| t.id == thread_id))
            .ok_or_else(|| ApiError::NotFound {
                resource: format!("thread {}", thread_id),
            })?;

        if parent_comment_id != 0 && !thread.comments.iter().any(|c| c.id == parent_comment_id) {
            return Err(bad_request(format!(
                "Parent comment {} does not exist",
                parent_comment_id
            )));
        }

        let comment = Comment {
            id: thread.comments.iter().map(|c| c.id).max().unwrap_or(0) + 1,
            parent_comment_id,
            author: service_identity(),
            content: content.to_string(),
            published_date: Some(Utc::now()),
            comment_type: CommentType::Text,
            is_deleted: false,
        };
        thread.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update_pull_request_status(
        &self,
        repository_id: &str,
        pull_request_id: i32,
        update: &PullRequestStatusUpdate,
    ) -> Result<(), ApiError> {
        self.check_auth()?;
        let mut state = self.state();
        let pr = state
            .pull_requests
            .get_mut(repository_id)
            .and_then(|prs| prs.iter_mut().find(|pr| pr.id == pull_request_id))
            .ok_or_else(|| ApiError::NotFound {
                resource: format!("pull request {}", pull_request_id),
            })?;

        match update {
            PullRequestStatusUpdate::Abandon => pr.status = PullRequestStatus::Abandoned,
            PullRequestStatusUpdate::Complete {
                last_merge_source_commit,
            } => {
                if pr.last_merge_source_commit.as_ref() != Some(last_merge_source_commit) {
                    return Err(ApiError::Conflict {
                        message: "TF401181: The pull request cannot be completed because the source commit is out of date.".to_string(),
                    });
                }
                pr.status = PullRequestStatus::Completed;
            }
        }
        Ok(())
    }

    /// Returns every work item, or those carrying the tag named in a
    /// `[System.Tags] CONTAINS '<tag>'` clause.
    async fn query_work_item_ids(&self, wiql: &str) -> Result<Vec<i32>, ApiError> {
        self.check_auth()?;
        let tag = wiql
            .split_once("CONTAINS '")
            .and_then(|(_, rest)| rest.split_once('\''))
            .map(|(tag, _)| tag.to_string());

        Ok(self
            .state()
            .work_items
            .values()
            .filter(|item| match &tag {
                Some(tag) => item
                    .tags()
                    .map(|tags| tags.split(';').any(|t| t.trim() == tag))
                    .unwrap_or(false),
                None => true,
            })
            .map(|item| item.id)
            .collect())
    }

    async fn get_work_items(&self, ids: &[i32]) -> Result<Vec<WorkItem>, ApiError> {
        self.check_auth()?;
        let state = self.state();
        Ok(ids
            .iter()
            .filter_map(|id| state.work_items.get(id).cloned())
            .collect())
    }

    async fn create_work_item(
        &self,
        work_item_type: &str,
        patch: &[PatchOperation],
    ) -> Result<WorkItem, ApiError> {
        self.check_auth()?;
        let mut state = self.state();
        let mut item = WorkItem {
            id: state.next_work_item_id,
            fields: serde_json::Map::new(),
            relations: Vec::new(),
        };
        item.fields
            .insert("System.WorkItemType".to_string(), work_item_type.into());
        item.fields
            .insert("System.State".to_string(), "New".into());
        for op in patch {
            if let Some(field) = op.field_name() {
                if field == "System.State" {
                    return Err(bad_request(
                        "TF401320: The state cannot be set when creating a work item.",
                    ));
                }
                item.fields.insert(field.to_string(), op.value.clone());
            }
        }

        state.next_work_item_id += 1;
        state.work_items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_work_item(
        &self,
        id: i32,
        patch: &[PatchOperation],
    ) -> Result<WorkItem, ApiError> {
        self.check_auth()?;
        let mut state = self.state();
        if !state.work_items.contains_key(&id) {
            return Err(ApiError::NotFound {
                resource: format!("work item {}", id),
            });
        }

        let mut reciprocal = Vec::new();
        for op in patch {
            if op.field_name() == Some("System.State")
                && let Some(value) = op.value.as_str()
                && state.rejected_states.contains(value)
            {
                return Err(bad_request(format!(
                    "TF401320: Rule error for field State. The value {} is not in the list of supported values.",
                    value
                )));
            }
        }

        let own_url = self.work_item_url(id);
        let existing = &state.work_items[&id].relations;
        let mut added: Vec<WorkItemRelation> = Vec::new();
        for op in patch.iter().filter(|op| op.path == "/relations/-") {
            let relation = WorkItemRelation {
                rel: op.value["rel"].as_str().unwrap_or_default().to_string(),
                url: op.value["url"].as_str().unwrap_or_default().to_string(),
                comment: op.value["attributes"]["comment"].as_str().map(String::from),
            };
            if existing
                .iter()
                .chain(added.iter())
                .any(|r| r.rel == relation.rel && r.url == relation.url)
            {
                return Err(bad_request(format!(
                    "TF201035: The link of type {} to {} already exists.",
                    relation.rel, relation.url
                )));
            }
            if let Some(target) = extract_work_item_id(&relation.url) {
                reciprocal.push((target, reciprocal_link_type(&relation.rel)));
            }
            added.push(relation);
        }

        // The whole patch is validated before anything is applied.
        let item = state
            .work_items
            .get_mut(&id)
            .ok_or_else(|| ApiError::NotFound {
                resource: format!("work item {}", id),
            })?;
        for op in patch {
            if let Some(field) = op.field_name() {
                item.fields.insert(field.to_string(), op.value.clone());
            }
        }
        item.relations.extend(added);
        let updated = item.clone();

        for (target, rel) in reciprocal {
            if let Some(other) = state.work_items.get_mut(&target)
                && !other.relations.iter().any(|r| r.rel == rel && r.url == own_url)
            {
                other.relations.push(WorkItemRelation {
                    rel,
                    url: own_url.clone(),
                    comment: None,
                });
            }
        }
        Ok(updated)
    }

    fn work_item_url(&self, id: i32) -> String {
        format!("{}/{}/_apis/wit/workItems/{}", FAKE_BASE_URL, self.organization, id)
    }
}
