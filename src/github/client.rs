//! Reqwest-backed REST client implementing the organization gateway.
//!
//! All list endpoints go through [`RestClient::fetch_paginated`], which
//! follows the `Link: rel="next"` chain, accumulates pages in provider
//! order, and inspects rate-limit headers after every page. A failed page
//! fails the whole call: callers never receive silently truncated data.
//!
//! Every request carries a bounded timeout and transient failures (connect
//! errors, timeouts, 5xx) are retried with exponential backoff up to a
//! capped attempt count.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::{StatusCode, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::error::ApiError;
use super::gateway::OrgDataGateway;
use super::identity::{OrganizationName, PersonalAccessToken, RepositoryFullName};
use super::models::{
    ApiBranch, ApiCommit, ApiEvent, ApiPullRequest, ApiRepository, BranchActivity, PullRequest,
    RepositoryEvent, RepositorySummary,
};
use super::pagination::next_page_url;
use super::rate_limit::RateLimitInfo;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("cadence/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest pause tolerated when the rate limit is exhausted mid-pagination.
/// The sleep is capped at this duration; if the window still has not reset
/// afterwards, the next request fails and surfaces the rate-limit error
/// rather than stalling the whole run.
const MAX_RATE_LIMIT_PAUSE: Duration = Duration::from_secs(60);

/// Bounded retry policy for transient transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay_before_attempt(&self, next_attempt: u32) -> Duration {
        // next_attempt is 2-based here: the delay preceding attempt N.
        let exponent = next_attempt.saturating_sub(2).min(16);
        self.base_delay
            .checked_mul(2_u32.saturating_pow(exponent))
            .unwrap_or(Duration::from_secs(60))
    }
}

/// An accumulated paginated result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginated<T> {
    /// All items, in provider page order (oldest page first).
    pub items: Vec<T>,
    /// Number of pages fetched.
    pub pages: u32,
    /// Rate-limit state from the most recent page, when reported.
    pub rate_limit: Option<RateLimitInfo>,
}

/// Authenticated GitHub REST client scoped to one organization.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    api_base: Url,
    org: OrganizationName,
    token: PersonalAccessToken,
    retry: RetryPolicy,
}

impl RestClient {
    /// Builds a client for the given API base, organization, and token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] when the base URL does not parse and
    /// [`ApiError::Network`] when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(
        api_base: &str,
        org: OrganizationName,
        token: PersonalAccessToken,
    ) -> Result<Self, ApiError> {
        let api_base =
            Url::parse(api_base).map_err(|error| ApiError::InvalidUrl(error.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| ApiError::Network {
                message: format!("build HTTP client failed: {error}"),
            })?;

        Ok(Self {
            http,
            api_base,
            org,
            token,
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the retry policy (used to tighten retries in tests).
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint_url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl("API base cannot be a base URL".to_owned()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issues a GET with bounded retries for transient failures.
    async fn get(&self, url: Url) -> Result<reqwest::Response, ApiError> {
        let mut attempt: u32 = 1;
        loop {
            let result = self
                .http
                .get(url.clone())
                .bearer_auth(self.token.value())
                .header(header::ACCEPT, GITHUB_ACCEPT)
                .header(API_VERSION_HEADER, API_VERSION)
                .send()
                .await;

            let retryable = match &result {
                Ok(response) => response.status().is_server_error(),
                Err(error) => error.is_timeout() || error.is_connect() || error.is_request(),
            };

            if retryable && attempt < self.retry.max_attempts {
                attempt += 1;
                let delay = self.retry.delay_before_attempt(attempt);
                debug!(url = %url, attempt, delay_ms = delay.as_millis() as u64,
                       "transient failure, retrying");
                tokio::time::sleep(delay).await;
                continue;
            }

            return result.map_err(|error| ApiError::Network {
                message: format!("GET {url} failed: {error}"),
            });
        }
    }

    /// Fetches every page of a list endpoint, strictly aborting on failure.
    pub(crate) async fn fetch_paginated<T: DeserializeOwned>(
        &self,
        operation: &str,
        first_page: Url,
    ) -> Result<Paginated<T>, ApiError> {
        let mut items = Vec::new();
        let mut pages: u32 = 0;
        let mut rate_limit = None;
        let mut next = Some(first_page);

        while let Some(url) = next.take() {
            let response = self.get(url).await?;
            let response = ensure_success(operation, response).await?;
            pages += 1;

            if let Some(info) = RateLimitInfo::from_headers(response.headers()) {
                debug!(remaining = info.remaining(), "rate limit state");
                rate_limit = Some(info);
            }
            next = response
                .headers()
                .get(header::LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_page_url);

            let page_items: Vec<T> =
                response.json().await.map_err(|error| ApiError::Decode {
                    message: format!("{operation}: {error}"),
                })?;
            items.extend(page_items);

            if next.is_some()
                && let Some(info) = rate_limit
                && info.is_exhausted()
            {
                let pause =
                    Duration::from_secs(info.seconds_until_reset()).min(MAX_RATE_LIMIT_PAUSE);
                warn!(
                    reset_at = info.reset_at(),
                    pause_secs = pause.as_secs(),
                    "rate limit exhausted mid-pagination, pausing"
                );
                tokio::time::sleep(pause).await;
            }
        }

        Ok(Paginated {
            items,
            pages,
            rate_limit,
        })
    }

    async fn fetch_single_page<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: Url,
    ) -> Result<Vec<T>, ApiError> {
        let response = self.get(url).await?;
        let response = ensure_success(operation, response).await?;
        response.json().await.map_err(|error| ApiError::Decode {
            message: format!("{operation}: {error}"),
        })
    }

    /// Browse URL for a branch, with the branch name percent-encoded.
    fn branch_browse_url(repo: &RepositoryFullName, branch: &str) -> Result<String, ApiError> {
        let mut url = Url::parse("https://github.com")
            .map_err(|error| ApiError::InvalidUrl(error.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl("browse base cannot be a base URL".to_owned()))?
            .extend([repo.owner(), repo.name(), "tree", branch]);
        Ok(url.into())
    }
}

#[async_trait]
impl OrgDataGateway for RestClient {
    async fn list_repositories(&self) -> Result<Vec<RepositorySummary>, ApiError> {
        let mut url = self.endpoint_url(&["orgs", self.org.as_str(), "repos"])?;
        url.query_pairs_mut()
            .append_pair("type", "all")
            .append_pair("per_page", "100");

        let page_set = self
            .fetch_paginated::<ApiRepository>("list repositories", url)
            .await?;
        page_set
            .items
            .into_iter()
            .map(RepositorySummary::try_from)
            .collect()
    }

    async fn recent_events(
        &self,
        repo: &RepositoryFullName,
    ) -> Result<Vec<RepositoryEvent>, ApiError> {
        let url = self.endpoint_url(&["repos", repo.owner(), repo.name(), "events"])?;
        let events: Vec<ApiEvent> = self.fetch_single_page("list events", url).await?;
        Ok(events.into_iter().map(RepositoryEvent::from).collect())
    }

    async fn branch_activity(
        &self,
        repo: &RepositoryFullName,
    ) -> Result<Vec<BranchActivity>, ApiError> {
        let branches_url = self.endpoint_url(&["repos", repo.owner(), repo.name(), "branches"])?;
        let branches = self
            .fetch_paginated::<ApiBranch>("list branches", branches_url)
            .await?;

        let mut activity = Vec::with_capacity(branches.items.len());
        for branch in branches.items {
            let mut commits_url =
                self.endpoint_url(&["repos", repo.owner(), repo.name(), "commits"])?;
            commits_url
                .query_pairs_mut()
                .append_pair("sha", &branch.name)
                .append_pair("per_page", "1");
            let commits: Vec<ApiCommit> =
                self.fetch_single_page("branch head commit", commits_url).await?;

            // Branches with no reachable commits carry no activity signal.
            let Some(latest) = commits.first().and_then(ApiCommit::committer_date) else {
                debug!(branch = %branch.name, "branch has no dated head commit, skipping");
                continue;
            };

            activity.push(BranchActivity {
                browse_url: Self::branch_browse_url(repo, &branch.name)?,
                branch_name: branch.name,
                // Walking full history per branch is too expensive; the
                // store records the sentinel instead.
                earliest_commit_date: None,
                latest_commit_date: latest,
            });
        }
        Ok(activity)
    }

    async fn open_pull_requests(
        &self,
        repo: &RepositoryFullName,
    ) -> Result<Vec<PullRequest>, ApiError> {
        let mut url = self.endpoint_url(&["repos", repo.owner(), repo.name(), "pulls"])?;
        url.query_pairs_mut()
            .append_pair("state", "open")
            .append_pair("per_page", "100");

        let page_set = self
            .fetch_paginated::<ApiPullRequest>("list open pull requests", url)
            .await?;
        Ok(page_set.items.into_iter().map(PullRequest::from).collect())
    }

    async fn pull_request_commit_dates(
        &self,
        repo: &RepositoryFullName,
        number: u64,
    ) -> Result<Vec<DateTime<Utc>>, ApiError> {
        let number_segment = number.to_string();
        let url = self.endpoint_url(&[
            "repos",
            repo.owner(),
            repo.name(),
            "pulls",
            &number_segment,
            "commits",
        ])?;

        let page_set = self
            .fetch_paginated::<ApiCommit>("list pull request commits", url)
            .await?;
        Ok(page_set
            .items
            .iter()
            .filter_map(ApiCommit::committer_date)
            .collect())
    }
}

async fn ensure_success(
    operation: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_limit = RateLimitInfo::from_headers(response.headers());
    let body = response.text().await.unwrap_or_default();
    let message = extract_github_message(&body).unwrap_or_else(|| {
        if body.is_empty() {
            "unknown error".to_owned()
        } else {
            body
        }
    });

    Err(map_status_error(operation, status, message, rate_limit))
}

fn map_status_error(
    operation: &str,
    status: StatusCode,
    message: String,
    rate_limit: Option<RateLimitInfo>,
) -> ApiError {
    if is_rate_limit_response(status, &message) {
        return ApiError::RateLimitExceeded {
            rate_limit,
            message: format!("{operation} failed: {message}"),
        };
    }

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return ApiError::Authentication {
            message: format!("{operation} failed: GitHub returned {status} {message}"),
        };
    }

    ApiError::Api {
        message: format!("{operation} failed with status {status}: {message}"),
    }
}

fn is_rate_limit_response(status: StatusCode, message: &str) -> bool {
    matches!(
        status,
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    ) && message.to_lowercase().contains("rate limit")
}

fn extract_github_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
}
