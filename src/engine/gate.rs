//! Watermark gate deciding whether a repository needs fetching.

use chrono::{DateTime, Utc};

use crate::github::models::RepositoryEvent;

/// Returns true when any event occurred strictly after the watermark.
///
/// Events exactly at the watermark do not count as new activity, so a
/// repository whose last event produced the current watermark is skipped
/// until something newer happens.
#[must_use]
pub fn has_activity_since(events: &[RepositoryEvent], watermark: DateTime<Utc>) -> bool {
    events.iter().any(|event| event.created_at > watermark)
}
