//! Sync engine orchestrating the fetch pipeline.
//!
//! One run scans every repository in the organization, gates each on its
//! event feed against the stored watermark, fetches branch and pull request
//! activity for the repositories that pass, derives cycle-time metrics for
//! finished pull requests, and advances watermarks. Per-repository failures
//! are logged and skipped so one broken repository cannot starve the rest.

mod deriver;
mod gate;

use chrono::Utc;
use thiserror::Error;

use crate::github::error::ApiError;
use crate::github::gateway::OrgDataGateway;
use crate::github::identity::RepositoryFullName;
use crate::github::models::PullRequest;
use crate::metrics;
use crate::persistence::records::BranchRecord;
use crate::persistence::{MetricsStore, PersistenceError};

pub use gate::has_activity_since;

/// Errors surfaced by a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A fatal GitHub API failure (listing repositories).
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A local database failure.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The supplied configuration cannot drive a run.
    #[error("invalid configuration: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// A local I/O failure (e.g. writing an export file).
    #[error("I/O failure: {message}")]
    Io {
        /// Description of the failed operation.
        message: String,
    },
}

/// Which data families a run should fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Fetch per-branch activity for gated repositories.
    pub fetch_branches: bool,
    /// Fetch open pull requests and derive cycle-time metrics.
    pub fetch_prs: bool,
}

impl FetchOptions {
    /// True when the run would fetch nothing.
    #[must_use]
    pub const fn is_noop(self) -> bool {
        !self.fetch_branches && !self.fetch_prs
    }
}

/// Counters describing one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Repositories that passed the activity gate and were fetched.
    pub repositories_scanned: usize,
    /// Repositories skipped because nothing happened since their watermark.
    pub repositories_skipped: usize,
    /// Repositories abandoned after a fetch failure.
    pub repositories_failed: usize,
    /// Branch observations written.
    pub branches_recorded: usize,
    /// Open pull requests observed across all repositories.
    pub open_pull_requests: usize,
    /// Cycle-time metrics derived and upserted.
    pub metrics_derived: usize,
}

/// Result of one pipeline run: counters plus the observed pull request
/// batch, available for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Run counters.
    pub summary: SyncSummary,
    /// Every pull request observed during the run, across repositories.
    pub pull_requests: Vec<PullRequest>,
}

/// Orchestrates fetching, gating, derivation, and persistence for one run.
pub struct SyncEngine<'a> {
    gateway: &'a dyn OrgDataGateway,
    store: &'a MetricsStore,
}

impl<'a> SyncEngine<'a> {
    /// Creates an engine over the given gateway and store.
    #[must_use]
    pub const fn new(gateway: &'a dyn OrgDataGateway, store: &'a MetricsStore) -> Self {
        Self { gateway, store }
    }

    /// Runs one full sync cycle.
    ///
    /// With neither fetch flag set this performs no network access and
    /// returns an empty outcome. Repositories whose fetch fails are counted
    /// in [`SyncSummary::repositories_failed`] and do not abort the run;
    /// failing to list the organization's repositories is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when listing repositories fails or a
    /// database write fails.
    pub async fn run(&self, options: FetchOptions) -> Result<SyncOutcome, PipelineError> {
        let mut summary = SyncSummary::default();

        if options.is_noop() {
            tracing::info!("neither branch nor pull request fetching requested; nothing to do");
            return Ok(SyncOutcome {
                summary,
                pull_requests: Vec::new(),
            });
        }

        let repositories = self.gateway.list_repositories().await?;
        tracing::info!(
            repositories = repositories.len(),
            fetch_branches = options.fetch_branches,
            fetch_prs = options.fetch_prs,
            "scanning organization repositories"
        );

        let mut batch: Vec<PullRequest> = Vec::new();
        for repository in &repositories {
            if let Err(error) = self
                .process_repository(&repository.full_name, options, &mut summary, &mut batch)
                .await
            {
                summary.repositories_failed += 1;
                tracing::warn!(
                    repo = %repository.full_name,
                    error = %error,
                    "abandoning repository after fetch failure"
                );
            }
        }

        if options.fetch_prs && batch.is_empty() {
            tracing::info!("no pull requests observed; nothing to write");
        } else {
            self.persist_pull_requests(&batch, &mut summary).await?;
        }

        Ok(SyncOutcome {
            summary,
            pull_requests: batch,
        })
    }

    async fn process_repository(
        &self,
        repo: &RepositoryFullName,
        options: FetchOptions,
        summary: &mut SyncSummary,
        batch: &mut Vec<PullRequest>,
    ) -> Result<(), PipelineError> {
        let watermark = self
            .store
            .last_fetch_timestamp(repo)?
            .unwrap_or_else(metrics::epoch);

        let events = self.gateway.recent_events(repo).await?;
        if !gate::has_activity_since(&events, watermark) {
            summary.repositories_skipped += 1;
            tracing::debug!(repo = %repo, watermark = %watermark, "no new activity; skipping");
            return Ok(());
        }
        summary.repositories_scanned += 1;

        if options.fetch_branches {
            let activity = self.gateway.branch_activity(repo).await?;
            let records: Vec<BranchRecord> = activity
                .into_iter()
                .map(|branch| BranchRecord {
                    repo_full_name: repo.as_str().to_owned(),
                    branch_name: branch.branch_name,
                    earliest_commit_date: branch.earliest_commit_date,
                    latest_commit_date: branch.latest_commit_date,
                    branch_url: branch.browse_url,
                })
                .collect();
            summary.branches_recorded += records.len();
            self.store.insert_branches(&records)?;
            tracing::debug!(repo = %repo, branches = records.len(), "recorded branch activity");
        }

        if options.fetch_prs {
            let mut pull_requests = self.gateway.open_pull_requests(repo).await?;
            summary.open_pull_requests += pull_requests.len();
            tracing::debug!(
                repo = %repo,
                pull_requests = pull_requests.len(),
                "collected pull requests"
            );
            batch.append(&mut pull_requests);
        }

        self.store.set_last_fetch_timestamp(repo, Utc::now())?;
        Ok(())
    }

    /// Writes the accumulated pull request batch and derives metrics for the
    /// finished entries. A derivation failure skips that pull request only;
    /// database failures abort the batch.
    async fn persist_pull_requests(
        &self,
        batch: &[PullRequest],
        summary: &mut SyncSummary,
    ) -> Result<(), PipelineError> {
        let now = Utc::now();
        for pr in batch {
            self.store
                .insert_pull_request(&deriver::pull_request_record(pr))?;

            if !pr.is_finished() {
                continue;
            }

            match deriver::derive_metric(self.gateway, pr, now).await {
                Ok(metric) => {
                    self.store.upsert_cycle_time(&metric)?;
                    summary.metrics_derived += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        pr = pr.number,
                        error = %error,
                        "failed to derive cycle time; continuing with next pull request"
                    );
                }
            }
        }
        Ok(())
    }
}
