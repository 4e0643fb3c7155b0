//! Azure DevOps REST client.
//!
//! A thin `reqwest` wrapper bound to one organization/project pair. Every
//! response status is mapped to an [`ApiError`] variant so the migrators can
//! tell conflicts and auth failures apart from transient errors.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, header::HeaderMap};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::credential::PatCredential;
use super::traits::{
    AdoApi, NewCommentThread, NewPullRequest, PatchOperation, PullRequestStatusUpdate,
};
use super::wire;
use crate::error::ApiError;
use crate::models::{
    Comment, CommentThread, Endpoint, PrStatusFilter, ProjectInfo, PullRequest, Repository,
    WorkItem,
};

const API_VERSION: &str = "7.1";
/// Pull requests fetched per request.
const PAGE_SIZE: usize = 100;
/// Safety limit to prevent infinite pagination loops.
const MAX_PAGE_REQUESTS: usize = 100;
/// Upper bound of ids accepted by the work item batch endpoint.
const WORK_ITEM_BATCH_SIZE: usize = 200;

/// Azure DevOps API client for one project.
///
/// # Example
///
/// ```rust,no_run
/// use ado_migrator::api::{AdoApi, AzureDevOpsClient};
/// use ado_migrator::models::Endpoint;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let endpoint = Endpoint::new("my-org", "my-project", "my-pat", "https://dev.azure.com");
/// let client = AzureDevOpsClient::new(&endpoint)?;
///
/// let repos = client.list_repositories().await?;
/// println!("Found {} repositories", repos.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AzureDevOpsClient {
    client: Client,
    base_url: Url,
    organization: String,
    project: String,
}

impl AzureDevOpsClient {
    /// Creates a client for the endpoint's organization and project.
    ///
    /// The PAT is only exposed while building the sensitive
    /// `Authorization` header.
    pub fn new(endpoint: &Endpoint) -> Result<Self, ApiError> {
        let credential = PatCredential::new(endpoint.pat.clone());
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            credential
                .header_value()
                .map_err(|e| ApiError::InvalidUrl {
                    message: format!("PAT is not a valid header value: {}", e),
                })?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()?;

        let base_url = Url::parse(endpoint.api_url.value()).map_err(|e| ApiError::InvalidUrl {
            message: format!("{}: {}", endpoint.api_url.value(), e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl {
                message: format!("{} cannot be used as a base URL", base_url),
            });
        }

        Ok(Self {
            client,
            base_url,
            organization: endpoint.organization.value().clone(),
            project: endpoint.project.value().clone(),
        })
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Builds `{base}/{segments...}?api-version=7.1&{query...}`.
    fn build_url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl {
                message: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api-version", API_VERSION);
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// URL under `{org}/{project}/_apis/`.
    fn project_url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut full = vec![self.organization.as_str(), self.project.as_str(), "_apis"];
        full.extend_from_slice(segments);
        self.build_url(&full, query)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "Azure DevOps request");
        self.client.request(method, url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, ApiError> {
        let text = self.send_raw(request, resource).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::ParseError {
            message: format!("{} ({}): {}", resource, e, truncate_for_log(&text)),
        })
    }

    async fn send_raw(&self, request: RequestBuilder, resource: &str) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let text = response.text().await?;

        if status.is_success() && status != StatusCode::NON_AUTHORITATIVE_INFORMATION {
            return Ok(text);
        }
        Err(map_error_status(status, &text, resource, retry_after))
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: &B,
        resource: &str,
    ) -> Result<T, ApiError> {
        self.send(self.request(method, url).json(body), resource)
            .await
    }

    async fn send_patch_document(
        &self,
        method: Method,
        url: Url,
        patch: &[PatchOperation],
        resource: &str,
    ) -> Result<WorkItem, ApiError> {
        let body = serde_json::to_string(patch).map_err(|e| ApiError::ParseError {
            message: e.to_string(),
        })?;
        let request = self
            .request(method, url)
            .header(reqwest::header::CONTENT_TYPE, "application/json-patch+json")
            .body(body);
        let item: wire::WorkItem = self.send(request, resource).await?;
        Ok(item.into())
    }
}

/// Maps a non-success response to an [`ApiError`].
///
/// Azure DevOps answers an invalid PAT with `203` and an HTML sign-in page,
/// so `203` counts as unauthorized.
pub(crate) fn map_error_status(
    status: StatusCode,
    body: &str,
    resource: &str,
    retry_after: Option<u64>,
) -> ApiError {
    let message = serde_json::from_str::<wire::ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| truncate_for_log(body));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::NON_AUTHORITATIVE_INFORMATION => {
            ApiError::Unauthorized
        }
        StatusCode::FORBIDDEN => ApiError::Forbidden { message },
        StatusCode::NOT_FOUND => ApiError::NotFound {
            resource: resource.to_string(),
        },
        StatusCode::CONFLICT => ApiError::Conflict { message },
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited {
            retry_after_seconds: retry_after.unwrap_or(0),
        },
        _ => ApiError::RequestFailed {
            status: status.as_u16(),
            message,
        },
    }
}

fn truncate_for_log(body: &str) -> String {
    const LIMIT: usize = 300;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[async_trait]
impl AdoApi for AzureDevOpsClient {
    fn label(&self) -> String {
        format!("{}/{}", self.organization, self.project)
    }

    async fn get_project(&self) -> Result<ProjectInfo, ApiError> {
        let url = self.build_url(
            &[self.organization.as_str(), "_apis", "projects", self.project.as_str()],
            &[],
        )?;
        let project: wire::TeamProject = self
            .send(self.request(Method::GET, url), &format!("project {}", self.label()))
            .await?;
        Ok(project.into())
    }

    async fn list_repositories(&self) -> Result<Vec<Repository>, ApiError> {
        let url = self.project_url(&["git", "repositories"], &[])?;
        let response: wire::ListResponse<wire::GitRepository> = self
            .send(self.request(Method::GET, url), "repositories")
            .await?;
        Ok(response.value.into_iter().map(Repository::from).collect())
    }

    async fn get_repository(&self, name: &str) -> Result<Option<Repository>, ApiError> {
        let url = self.project_url(&["git", "repositories", name], &[])?;
        match self
            .send::<wire::GitRepository>(
                self.request(Method::GET, url),
                &format!("repository {}", name),
            )
            .await
        {
            Ok(repo) => Ok(Some(repo.into())),
            Err(ApiError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_repository(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<Repository, ApiError> {
        let url = self.project_url(&["git", "repositories"], &[])?;
        let body = wire::CreateRepository {
            name: name.to_string(),
            project: wire::ProjectReference {
                id: project_id.to_string(),
            },
        };
        let repo: wire::GitRepository = self
            .send_json(Method::POST, url, &body, &format!("repository {}", name))
            .await?;
        Ok(repo.into())
    }

    async fn set_default_branch(
        &self,
        repository_id: &str,
        ref_name: &str,
    ) -> Result<(), ApiError> {
        let url = self.project_url(&["git", "repositories", repository_id], &[])?;
        let body = wire::UpdateRepository {
            default_branch: ref_name.to_string(),
        };
        let _: wire::GitRepository = self
            .send_json(
                Method::PATCH,
                url,
                &body,
                &format!("repository {}", repository_id),
            )
            .await?;
        Ok(())
    }

    /// Fetches all pull requests using `$top`/`$skip` pagination, stopping
    /// once a page comes back short.
    async fn list_pull_requests(
        &self,
        repository_id: &str,
        status: PrStatusFilter,
    ) -> Result<Vec<PullRequest>, ApiError> {
        let mut all_prs = Vec::new();
        let mut skip = 0;
        let mut request_count = 0;

        loop {
            request_count += 1;
            if request_count > MAX_PAGE_REQUESTS {
                return Err(ApiError::PaginationLimitExceeded {
                    max: MAX_PAGE_REQUESTS,
                    retrieved: all_prs.len(),
                });
            }

            let url = self.project_url(
                &["git", "repositories", repository_id, "pullrequests"],
                &[
                    ("searchCriteria.status", status.as_query().to_string()),
                    ("$top", PAGE_SIZE.to_string()),
                    ("$skip", skip.to_string()),
                ],
            )?;
            let page: wire::ListResponse<wire::GitPullRequest> = self
                .send(self.request(Method::GET, url), "pull requests")
                .await?;

            let fetched = page.value.len();
            all_prs.extend(page.value.into_iter().map(PullRequest::from));

            if fetched < PAGE_SIZE {
                break;
            }
            skip += PAGE_SIZE;
        }

        Ok(all_prs)
    }

    async fn list_threads(
        &self,
        repository_id: &str,
        pull_request_id: i32,
    ) -> Result<Vec<CommentThread>, ApiError> {
        let pr_id = pull_request_id.to_string();
        let url = self.project_url(
            &["git", "repositories", repository_id, "pullRequests", &pr_id, "threads"],
            &[],
        )?;
        let response: wire::ListResponse<wire::CommentThread> = self
            .send(
                self.request(Method::GET, url),
                &format!("threads of pull request {}", pull_request_id),
            )
            .await?;
        Ok(response
            .value
            .into_iter()
            .filter(|t| !t.is_deleted.unwrap_or(false))
            .map(CommentThread::from)
            .collect())
    }

    async fn create_pull_request(
        &self,
        repository_id: &str,
        pull_request: &NewPullRequest,
    ) -> Result<PullRequest, ApiError> {
        let url = self.project_url(&["git", "repositories", repository_id, "pullrequests"], &[])?;
        let body = wire::CreatePullRequest {
            source_ref_name: pull_request.source_ref_name.clone(),
            target_ref_name: pull_request.target_ref_name.clone(),
            title: pull_request.title.clone(),
            description: pull_request.description.clone(),
            is_draft: pull_request.is_draft,
        };
        let created: wire::GitPullRequest = self
            .send_json(Method::POST, url, &body, "pull request")
            .await?;
        Ok(created.into())
    }

    async fn create_thread(
        &self,
        repository_id: &str,
        pull_request_id: i32,
        thread: &NewCommentThread,
    ) -> Result<CommentThread, ApiError> {
        let pr_id = pull_request_id.to_string();
        let url = self.project_url(
            &["git", "repositories", repository_id, "pullRequests", &pr_id, "threads"],
            &[],
        )?;
        let body = wire::CreateThread {
            comments: vec![wire::CreateComment {
                parent_comment_id: 0,
                content: thread.content.clone(),
                comment_type: 1,
            }],
            status: thread.status.clone(),
        };
        let created: wire::CommentThread = self
            .send_json(Method::POST, url, &body, "comment thread")
            .await?;
        Ok(created.into())
    }

    async fn add_comment(
        &self,
        repository_id: &str,
        pull_request_id: i32,
        thread_id: i32,
        parent_comment_id: i32,
        content: &str,
    ) -> Result<Comment, ApiError> {
        let pr_id = pull_request_id.to_string();
        let thread = thread_id.to_string();
        let url = self.project_url(
            &[
                "git",
                "repositories",
                repository_id,
                "pullRequests",
                &pr_id,
                "threads",
                &thread,
                "comments",
            ],
            &[],
        )?;
        let body = wire::CreateComment {
            parent_comment_id,
            content: content.to_string(),
            comment_type: 1,
        };
        let created: wire::Comment = self
            .send_json(Method::POST, url, &body, "comment")
            .await?;
        Ok(created.into())
    }

    async fn update_pull_request_status(
        &self,
        repository_id: &str,
        pull_request_id: i32,
        update: &PullRequestStatusUpdate,
    ) -> Result<(), ApiError> {
        let pr_id = pull_request_id.to_string();
        let url = self.project_url(
            &["git", "repositories", repository_id, "pullrequests", &pr_id],
            &[],
        )?;
        let body = match update {
            PullRequestStatusUpdate::Abandon => wire::UpdatePullRequest {
                status: "abandoned".to_string(),
                last_merge_source_commit: None,
            },
            PullRequestStatusUpdate::Complete {
                last_merge_source_commit,
            } => wire::UpdatePullRequest {
                status: "completed".to_string(),
                last_merge_source_commit: Some(wire::GitCommitRef {
                    commit_id: last_merge_source_commit.clone(),
                }),
            },
        };
        let _: wire::GitPullRequest = self
            .send_json(
                Method::PATCH,
                url,
                &body,
                &format!("pull request {}", pull_request_id),
            )
            .await?;
        Ok(())
    }

    async fn query_work_item_ids(&self, wiql: &str) -> Result<Vec<i32>, ApiError> {
        let url = self.project_url(&["wit", "wiql"], &[])?;
        let body = wire::WiqlQuery {
            query: wiql.to_string(),
        };
        let result: wire::WiqlResult = self
            .send_json(Method::POST, url, &body, "work item query")
            .await?;
        Ok(result.work_items.into_iter().map(|w| w.id).collect())
    }

    async fn get_work_items(&self, ids: &[i32]) -> Result<Vec<WorkItem>, ApiError> {
        let mut items = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(WORK_ITEM_BATCH_SIZE) {
            let id_list = chunk
                .iter()
                .map(i32::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let url = self.project_url(
                &["wit", "workitems"],
                &[
                    ("ids", id_list),
                    ("$expand", "relations".to_string()),
                    ("errorPolicy", "omit".to_string()),
                ],
            )?;
            // With errorPolicy=omit, deleted ids come back as nulls
            let response: wire::ListResponse<Option<wire::WorkItem>> = self
                .send(self.request(Method::GET, url), "work items")
                .await?;
            items.extend(response.value.into_iter().flatten().map(WorkItem::from));
        }
        Ok(items)
    }

    async fn create_work_item(
        &self,
        work_item_type: &str,
        patch: &[PatchOperation],
    ) -> Result<WorkItem, ApiError> {
        let type_segment = format!("${}", work_item_type);
        let url = self.project_url(&["wit", "workitems", &type_segment], &[])?;
        self.send_patch_document(
            Method::POST,
            url,
            patch,
            &format!("{} work item", work_item_type),
        )
        .await
    }

    async fn update_work_item(
        &self,
        id: i32,
        patch: &[PatchOperation],
    ) -> Result<WorkItem, ApiError> {
        let id_segment = id.to_string();
        let url = self.project_url(&["wit", "workitems", &id_segment], &[])?;
        self.send_patch_document(Method::PATCH, url, patch, &format!("work item {}", id))
            .await
    }

    fn work_item_url(&self, id: i32) -> String {
        let id_segment = id.to_string();
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                self.organization.as_str(),
                "_apis",
                "wit",
                "workItems",
                &id_segment,
            ]);
        }
        url.to_string()
    }
}
