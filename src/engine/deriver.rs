//! Cycle-time derivation for finished pull requests.
//!
//! A pull request qualifies for a metric once it is closed or carries a
//! merge timestamp. Commit dates come from the base (target) repository;
//! when that reference is absent (deleted fork) the derivation falls back
//! to the creation timestamp and records no commit dates.

use chrono::{DateTime, Utc};

use crate::github::error::ApiError;
use crate::github::gateway::OrgDataGateway;
use crate::github::identity::RepositoryFullName;
use crate::github::models::{PullRequest, UNKNOWN_REPOSITORY};
use crate::metrics;
use crate::persistence::records::{CycleTimeMetric, PullRequestRecord, PullRequestStatus};

/// Builds the append-only observation record for one pull request.
pub(crate) fn pull_request_record(pr: &PullRequest) -> PullRequestRecord {
    PullRequestRecord {
        repo_full_name: pr.head_repo_or_sentinel().to_owned(),
        pr_number: pr.number,
        title: pr.title.clone(),
        state: pr.state.as_str().to_owned(),
        created_at: pr.created_at,
        updated_at: pr.updated_at,
        url: pr.html_url.clone(),
        author: pr.author_or_sentinel().to_owned(),
    }
}

/// Derives the cycle-time metric for a finished pull request.
///
/// `now` is the derivation instant, used as the end point for closed but
/// unmerged pull requests.
///
/// # Errors
///
/// Returns [`ApiError`] when fetching the pull request's commit dates fails.
pub(crate) async fn derive_metric(
    gateway: &dyn OrgDataGateway,
    pr: &PullRequest,
    now: DateTime<Utc>,
) -> Result<CycleTimeMetric, ApiError> {
    let base_repo = pr
        .base_repo
        .as_deref()
        .and_then(|name| RepositoryFullName::new(name).ok());

    let commit_dates = match &base_repo {
        Some(repo) => gateway.pull_request_commit_dates(repo, pr.number).await?,
        None => Vec::new(),
    };

    let first_commit_date = commit_dates.iter().copied().min();
    let last_commit_date = commit_dates.iter().copied().max();

    let status = if pr.merged_at.is_some() {
        PullRequestStatus::Merged
    } else {
        PullRequestStatus::Closed
    };

    Ok(CycleTimeMetric {
        repo_full_name: base_repo.map_or_else(
            || UNKNOWN_REPOSITORY.to_owned(),
            |repo| repo.as_str().to_owned(),
        ),
        pr_number: pr.number,
        pr_created_at: pr.created_at,
        pr_merged_at: pr.merged_at,
        status,
        cycle_time_days: metrics::cycle_time_days(
            first_commit_date,
            pr.created_at,
            pr.merged_at,
            now,
        ),
        first_commit_date,
        last_commit_date,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use mockall::predicate;

    use super::{derive_metric, pull_request_record};
    use crate::github::MockOrgDataGateway;
    use crate::github::identity::RepositoryFullName;
    use crate::github::models::{
        PullRequest, PullRequestState, UNKNOWN_AUTHOR, UNKNOWN_REPOSITORY,
    };
    use crate::metrics::parse_timestamp;
    use crate::persistence::records::PullRequestStatus;

    fn instant(text: &str) -> DateTime<Utc> {
        parse_timestamp(text).expect("test timestamp should parse")
    }

    fn merged_pull_request() -> PullRequest {
        PullRequest {
            number: 12,
            title: "Speed up the parser".to_owned(),
            state: PullRequestState::Closed,
            created_at: instant("2024-01-02T00:00:00Z"),
            updated_at: instant("2024-01-10T00:00:00Z"),
            merged_at: Some(instant("2024-01-10T00:00:00Z")),
            html_url: "https://github.com/acme/widgets/pull/12".to_owned(),
            author: Some("octocat".to_owned()),
            head_repo: Some("octocat/widgets".to_owned()),
            base_repo: Some("acme/widgets".to_owned()),
        }
    }

    #[tokio::test]
    async fn metric_uses_earliest_of_first_commit_and_creation() {
        let mut gateway = MockOrgDataGateway::new();
        gateway
            .expect_pull_request_commit_dates()
            .with(
                predicate::eq(RepositoryFullName::new("acme/widgets").expect("valid")),
                predicate::eq(12_u64),
            )
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    instant("2024-01-05T00:00:00Z"),
                    instant("2024-01-01T00:00:00Z"),
                ])
            });

        let now = instant("2024-02-01T00:00:00Z");
        let metric = derive_metric(&gateway, &merged_pull_request(), now)
            .await
            .expect("derivation should succeed");

        assert_eq!(metric.repo_full_name, "acme/widgets");
        assert_eq!(metric.status, PullRequestStatus::Merged);
        assert_eq!(metric.cycle_time_days, 9);
        assert_eq!(metric.first_commit_date, Some(instant("2024-01-01T00:00:00Z")));
        assert_eq!(metric.last_commit_date, Some(instant("2024-01-05T00:00:00Z")));
    }

    #[tokio::test]
    async fn no_commits_falls_back_to_creation_timestamp() {
        let mut gateway = MockOrgDataGateway::new();
        gateway
            .expect_pull_request_commit_dates()
            .times(1)
            .returning(|_, _| Ok(Vec::new()));

        let now = instant("2024-02-01T00:00:00Z");
        let metric = derive_metric(&gateway, &merged_pull_request(), now)
            .await
            .expect("derivation should succeed");

        // 2024-01-02 created, 2024-01-10 merged.
        assert_eq!(metric.cycle_time_days, 8);
        assert_eq!(metric.first_commit_date, None);
        assert_eq!(metric.last_commit_date, None);
    }

    #[tokio::test]
    async fn missing_base_repository_skips_commit_fetch() {
        let gateway = MockOrgDataGateway::new();
        let mut pr = merged_pull_request();
        pr.base_repo = None;

        let metric = derive_metric(&gateway, &pr, instant("2024-02-01T00:00:00Z"))
            .await
            .expect("derivation should succeed");

        assert_eq!(metric.repo_full_name, UNKNOWN_REPOSITORY);
        assert_eq!(metric.first_commit_date, None);
        assert_eq!(metric.cycle_time_days, 8);
    }

    #[tokio::test]
    async fn closed_unmerged_pr_measures_to_now() {
        let mut gateway = MockOrgDataGateway::new();
        gateway
            .expect_pull_request_commit_dates()
            .times(1)
            .returning(|_, _| Ok(Vec::new()));

        let mut pr = merged_pull_request();
        pr.merged_at = None;

        let metric = derive_metric(&gateway, &pr, instant("2024-01-05T12:00:00Z"))
            .await
            .expect("derivation should succeed");

        assert_eq!(metric.status, PullRequestStatus::Closed);
        assert_eq!(metric.pr_merged_at, None);
        // 2024-01-02 created to 2024-01-05T12:00 now: three and a half days.
        assert_eq!(metric.cycle_time_days, 3);
    }

    #[test]
    fn record_resolves_sentinels_for_missing_author_and_head_repo() {
        let mut pr = merged_pull_request();
        pr.author = None;
        pr.head_repo = None;

        let record = pull_request_record(&pr);

        assert_eq!(record.repo_full_name, UNKNOWN_REPOSITORY);
        assert_eq!(record.author, UNKNOWN_AUTHOR);
        assert_eq!(record.state, "closed");
        assert_eq!(record.pr_number, 12);
    }
}
