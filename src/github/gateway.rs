//! Capability seam between the sync engine and the GitHub REST API.
//!
//! The engine depends on this trait rather than on the concrete client so
//! orchestration logic can be exercised against a mock gateway. The real
//! implementation lives in [`super::client`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::ApiError;
use super::identity::RepositoryFullName;
use super::models::{BranchActivity, PullRequest, RepositoryEvent, RepositorySummary};

/// Read-only view of an organization's activity data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrgDataGateway: Send + Sync {
    /// Lists all repositories in the configured organization, in the
    /// provider's listing order.
    async fn list_repositories(&self) -> Result<Vec<RepositorySummary>, ApiError>;

    /// Fetches one page of a repository's recent event feed.
    ///
    /// A single page is deliberate: the feed is used only as a cheap
    /// activity gate, and a false negative merely defers a repository to the
    /// next cycle.
    async fn recent_events(
        &self,
        repo: &RepositoryFullName,
    ) -> Result<Vec<RepositoryEvent>, ApiError>;

    /// Fetches per-branch activity (latest commit date and browse URL) for
    /// every branch of the repository.
    async fn branch_activity(
        &self,
        repo: &RepositoryFullName,
    ) -> Result<Vec<BranchActivity>, ApiError>;

    /// Lists a repository's open pull requests.
    async fn open_pull_requests(
        &self,
        repo: &RepositoryFullName,
    ) -> Result<Vec<PullRequest>, ApiError>;

    /// Fetches the committer dates of every commit on a pull request.
    async fn pull_request_commit_dates(
        &self,
        repo: &RepositoryFullName,
        number: u64,
    ) -> Result<Vec<DateTime<Utc>>, ApiError>;
}
