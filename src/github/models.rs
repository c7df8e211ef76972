//! Wire and domain models for organization activity data.
//!
//! The `Api*` structs mirror the subset of GitHub's JSON payloads this
//! pipeline reads; the domain types carry parsed instants and validated
//! identifiers. Missing optional fields (deleted fork, ghost author) are
//! resolved to sentinel values at the point of use, never treated as fatal.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::error::ApiError;
use super::identity::RepositoryFullName;

/// Sentinel author recorded when a pull request has no resolvable user.
pub const UNKNOWN_AUTHOR: &str = "Unknown author";

/// Sentinel repository name recorded when the head repository reference is
/// null (e.g. a deleted fork).
pub const UNKNOWN_REPOSITORY: &str = "Unknown or deleted repository";

/// Sentinel stored for branch commit dates that are not collected.
pub const UNKNOWN_COMMIT_DATE: &str = "Unknown";

/// Pull request state as reported by the pulls endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    /// The pull request is open.
    Open,
    /// The pull request is closed (merged or not).
    Closed,
}

impl PullRequestState {
    /// Lowercase wire representation, used for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// An organization repository as listed by the repos endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySummary {
    /// Validated `owner/name` identifier.
    pub full_name: RepositoryFullName,
    /// Whether the repository is private.
    pub private: bool,
    /// Creation instant, when reported.
    pub created_at: Option<DateTime<Utc>>,
    /// Last-push instant, when reported.
    pub pushed_at: Option<DateTime<Utc>>,
    /// Free-form description.
    pub description: Option<String>,
}

/// A single entry from a repository's event feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryEvent {
    /// Instant the event occurred.
    pub created_at: DateTime<Utc>,
}

/// Per-branch activity collected during a branch fetch.
///
/// The earliest commit date is deliberately not collected (walking full
/// history per branch is too expensive); it stays `None` and is stored as
/// the [`UNKNOWN_COMMIT_DATE`] sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchActivity {
    /// Branch name as reported by GitHub.
    pub branch_name: String,
    /// Earliest commit instant, when collected.
    pub earliest_commit_date: Option<DateTime<Utc>>,
    /// Committer date of the branch head.
    pub latest_commit_date: DateTime<Utc>,
    /// Constructed browse URL for the branch.
    pub browse_url: String,
}

/// A pull request observed during a fetch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// Number, unique within the repository.
    pub number: u64,
    /// Title at observation time.
    pub title: String,
    /// Open/closed state at observation time.
    pub state: PullRequestState,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last-update instant.
    pub updated_at: DateTime<Utc>,
    /// Merge instant, present only for merged PRs.
    pub merged_at: Option<DateTime<Utc>>,
    /// HTML URL for display.
    pub html_url: String,
    /// Author login, `None` for ghost users.
    pub author: Option<String>,
    /// Full name of the head (source) repository, `None` for deleted forks.
    pub head_repo: Option<String>,
    /// Full name of the base (target) repository.
    pub base_repo: Option<String>,
}

impl PullRequest {
    /// Author login with the [`UNKNOWN_AUTHOR`] sentinel applied.
    #[must_use]
    pub fn author_or_sentinel(&self) -> &str {
        self.author.as_deref().unwrap_or(UNKNOWN_AUTHOR)
    }

    /// Head repository with the [`UNKNOWN_REPOSITORY`] sentinel applied.
    #[must_use]
    pub fn head_repo_or_sentinel(&self) -> &str {
        self.head_repo.as_deref().unwrap_or(UNKNOWN_REPOSITORY)
    }

    /// True when the PR has finished its lifecycle and qualifies for a
    /// cycle-time metric.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.state, PullRequestState::Closed) || self.merged_at.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiRepository {
    pub(crate) full_name: String,
    #[serde(default)]
    pub(crate) private: bool,
    pub(crate) created_at: Option<DateTime<Utc>>,
    pub(crate) pushed_at: Option<DateTime<Utc>>,
    pub(crate) description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiEvent {
    pub(crate) created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiBranch {
    pub(crate) name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiUser {
    pub(crate) login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiRepositoryRef {
    pub(crate) full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiPullRequestRef {
    pub(crate) repo: Option<ApiRepositoryRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiPullRequest {
    pub(crate) number: u64,
    pub(crate) title: Option<String>,
    pub(crate) state: PullRequestState,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) merged_at: Option<DateTime<Utc>>,
    pub(crate) html_url: Option<String>,
    pub(crate) user: Option<ApiUser>,
    pub(crate) head: Option<ApiPullRequestRef>,
    pub(crate) base: Option<ApiPullRequestRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiGitSignature {
    pub(crate) date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCommitDetail {
    pub(crate) committer: Option<ApiGitSignature>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCommit {
    pub(crate) commit: ApiCommitDetail,
}

impl ApiCommit {
    /// Committer date, when the signature carries one.
    pub(crate) fn committer_date(&self) -> Option<DateTime<Utc>> {
        self.commit
            .committer
            .as_ref()
            .and_then(|signature| signature.date)
    }
}

impl TryFrom<ApiRepository> for RepositorySummary {
    type Error = ApiError;

    fn try_from(value: ApiRepository) -> Result<Self, Self::Error> {
        Ok(Self {
            full_name: RepositoryFullName::new(&value.full_name)?,
            private: value.private,
            created_at: value.created_at,
            pushed_at: value.pushed_at,
            description: value.description,
        })
    }
}

impl From<ApiEvent> for RepositoryEvent {
    fn from(value: ApiEvent) -> Self {
        Self {
            created_at: value.created_at,
        }
    }
}

impl From<ApiPullRequest> for PullRequest {
    fn from(value: ApiPullRequest) -> Self {
        let repo_of = |reference: Option<ApiPullRequestRef>| {
            reference
                .and_then(|pr_ref| pr_ref.repo)
                .map(|repo| repo.full_name)
        };
        Self {
            number: value.number,
            title: value.title.unwrap_or_default(),
            state: value.state,
            created_at: value.created_at,
            updated_at: value.updated_at,
            merged_at: value.merged_at,
            html_url: value.html_url.unwrap_or_default(),
            author: value.user.and_then(|user| user.login),
            head_repo: repo_of(value.head),
            base_repo: repo_of(value.base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiPullRequest, PullRequest, UNKNOWN_AUTHOR, UNKNOWN_REPOSITORY};

    fn pull_request_from_json(json: serde_json::Value) -> PullRequest {
        let api: ApiPullRequest = serde_json::from_value(json).expect("payload should decode");
        api.into()
    }

    #[test]
    fn null_head_repo_resolves_to_sentinel() {
        let pr = pull_request_from_json(serde_json::json!({
            "number": 7,
            "title": "Fix the widget",
            "state": "open",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "html_url": "https://github.com/octo-org/widgets/pull/7",
            "user": { "login": "octocat" },
            "head": { "repo": null },
            "base": { "repo": { "full_name": "octo-org/widgets" } }
        }));

        assert_eq!(pr.head_repo, None);
        assert_eq!(pr.head_repo_or_sentinel(), UNKNOWN_REPOSITORY);
        assert_eq!(pr.base_repo.as_deref(), Some("octo-org/widgets"));
    }

    #[test]
    fn null_user_resolves_to_sentinel_author() {
        let pr = pull_request_from_json(serde_json::json!({
            "number": 7,
            "title": "Fix the widget",
            "state": "open",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "user": null,
            "head": { "repo": { "full_name": "octocat/widgets" } },
            "base": { "repo": { "full_name": "octo-org/widgets" } }
        }));

        assert_eq!(pr.author, None);
        assert_eq!(pr.author_or_sentinel(), UNKNOWN_AUTHOR);
    }

    #[test]
    fn merged_timestamp_marks_the_pr_finished() {
        let pr = pull_request_from_json(serde_json::json!({
            "number": 9,
            "title": "Merged already",
            "state": "open",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "merged_at": "2024-01-03T00:00:00Z",
            "user": { "login": "octocat" },
            "head": { "repo": { "full_name": "octocat/widgets" } },
            "base": { "repo": { "full_name": "octo-org/widgets" } }
        }));

        assert!(pr.is_finished());
    }

    #[test]
    fn open_unmerged_pr_is_not_finished() {
        let pr = pull_request_from_json(serde_json::json!({
            "number": 9,
            "title": "Still going",
            "state": "open",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "user": { "login": "octocat" },
            "head": { "repo": { "full_name": "octocat/widgets" } },
            "base": { "repo": { "full_name": "octo-org/widgets" } }
        }));

        assert!(!pr.is_finished());
    }
}
