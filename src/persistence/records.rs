//! Row types persisted by the metrics store.

use chrono::{DateTime, Utc};

/// Final status of a pull request that qualifies for a cycle-time metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestStatus {
    /// The pull request was merged.
    Merged,
    /// The pull request was closed without merging.
    Closed,
}

impl PullRequestStatus {
    /// Lowercase storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merged => "merged",
            Self::Closed => "closed",
        }
    }

    /// Parses the storage representation back into a status.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "merged" => Some(Self::Merged),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// One observation of a pull request, appended on every fetch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRecord {
    /// Head repository full name (sentinel-resolved).
    pub repo_full_name: String,
    /// Pull request number.
    pub pr_number: u64,
    /// Title at observation time.
    pub title: String,
    /// State at observation time (`open`/`closed`).
    pub state: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last-update instant.
    pub updated_at: DateTime<Utc>,
    /// HTML URL for display.
    pub url: String,
    /// Author login (sentinel-resolved).
    pub author: String,
}

/// One observation of a branch, appended on every branch fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRecord {
    /// Repository the branch belongs to.
    pub repo_full_name: String,
    /// Branch name.
    pub branch_name: String,
    /// Earliest commit instant; stored as the `Unknown` sentinel when not
    /// collected.
    pub earliest_commit_date: Option<DateTime<Utc>>,
    /// Committer date of the branch head.
    pub latest_commit_date: DateTime<Utc>,
    /// Constructed browse URL.
    pub branch_url: String,
}

/// Cycle-time metric for a finished pull request.
///
/// Keyed by `(repo_full_name, pr_number)`; re-deriving for the same pull
/// request overwrites the prior row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleTimeMetric {
    /// Base repository full name.
    pub repo_full_name: String,
    /// Pull request number, unique within the repository.
    pub pr_number: u64,
    /// Creation instant.
    pub pr_created_at: DateTime<Utc>,
    /// Merge instant, absent for closed-unmerged PRs.
    pub pr_merged_at: Option<DateTime<Utc>>,
    /// Final status.
    pub status: PullRequestStatus,
    /// Whole days from the earlier of first commit / creation to merge (or
    /// to derivation time for closed-unmerged PRs). May be negative.
    pub cycle_time_days: i64,
    /// Earliest commit instant on the PR, when any commit was dated.
    pub first_commit_date: Option<DateTime<Utc>>,
    /// Latest commit instant on the PR, when any commit was dated.
    pub last_commit_date: Option<DateTime<Utc>>,
}
