//! JSONL export of open pull requests.
//!
//! Produces machine-readable output with one JSON object per line, suitable
//! for dashboards or downstream scripts. Only pull requests that are still
//! open at observation time are exported; finished ones are covered by the
//! stored cycle-time metrics instead.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::PipelineError;
use crate::github::models::PullRequest;
use crate::metrics;

/// One exported open pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedPullRequest {
    /// Head repository full name (sentinel-resolved).
    pub repo: String,
    /// Pull request number.
    pub number: u64,
    /// Title at observation time.
    pub title: String,
    /// HTML URL for display.
    pub url: String,
    /// Author login (sentinel-resolved).
    pub author: String,
    /// Whole days since the pull request was opened.
    pub age_days: i64,
}

impl ExportedPullRequest {
    fn from_pull_request(pr: &PullRequest, now: DateTime<Utc>) -> Self {
        Self {
            repo: pr.head_repo_or_sentinel().to_owned(),
            number: pr.number,
            title: pr.title.clone(),
            url: pr.html_url.clone(),
            author: pr.author_or_sentinel().to_owned(),
            age_days: metrics::elapsed_whole_days(pr.created_at, now),
        }
    }
}

/// Writes the still-open pull requests from `batch` as JSONL.
///
/// Each pull request is serialized as a single JSON object on its own line.
/// Finished pull requests (closed or merged) are filtered out.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if serialization or writing fails.
pub fn write_open_pull_requests<W: Write>(
    writer: &mut W,
    batch: &[PullRequest],
    now: DateTime<Utc>,
) -> Result<(), PipelineError> {
    for pr in batch.iter().filter(|pr| !pr.is_finished()) {
        let exported = ExportedPullRequest::from_pull_request(pr, now);
        serde_json::to_writer(&mut *writer, &exported).map_err(|error| PipelineError::Io {
            message: format!("JSON serialization failed: {error}"),
        })?;
        writeln!(writer).map_err(|error| PipelineError::Io {
            message: error.to_string(),
        })?;
    }
    Ok(())
}
