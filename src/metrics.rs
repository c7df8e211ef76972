//! Pure time arithmetic for cycle-time derivation.
//!
//! All comparisons in the pipeline operate on parsed [`DateTime<Utc>`]
//! instants; ISO-8601 strings appear only at the storage and display
//! boundaries. This module owns that boundary conversion together with the
//! elapsed-day arithmetic used by the metrics deriver.

use chrono::{DateTime, ParseError, TimeZone, Utc};

/// Fixed-width UTC timestamp format used by the GitHub API and the store.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const SECONDS_PER_DAY: i64 = 86_400;

/// Returns the Unix epoch, the default watermark for never-fetched
/// repositories.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(0, 0)
        .single()
        .unwrap_or_else(DateTime::<Utc>::default)
}

/// Formats an instant as fixed-width UTC ISO-8601 text.
#[must_use]
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses fixed-width UTC ISO-8601 text back into an instant.
///
/// # Errors
///
/// Returns a [`ParseError`] when the text does not match
/// [`TIMESTAMP_FORMAT`].
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, ParseError> {
    DateTime::parse_from_rfc3339(text).map(|parsed| parsed.with_timezone(&Utc))
}

/// Whole days elapsed from `start` to `end`, using floor semantics.
///
/// Sub-day positive differences yield 0; negative differences floor toward
/// negative infinity, so a `start` half a day after `end` yields -1. Negative
/// results are meaningful (a commit can postdate a merge) and are never
/// clamped.
#[must_use]
pub fn elapsed_whole_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Cycle time in whole days for a pull request.
///
/// The clock starts at the earlier of the first commit and the PR creation
/// instant (creation alone when no commit date is known). For merged PRs the
/// clock stops at the merge instant. For PRs closed without merging the clock
/// stops at `now`: this over-counts PRs closed in the past and is preserved
/// as documented behaviour rather than silently corrected.
#[must_use]
pub fn cycle_time_days(
    first_commit: Option<DateTime<Utc>>,
    created: DateTime<Utc>,
    merged: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    let start = first_commit.map_or(created, |commit| commit.min(created));
    let end = merged.unwrap_or(now);
    elapsed_whole_days(start, end)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use rstest::rstest;

    use super::{cycle_time_days, elapsed_whole_days, epoch, format_timestamp, parse_timestamp};

    fn instant(text: &str) -> DateTime<Utc> {
        parse_timestamp(text).expect("test timestamp should parse")
    }

    #[rstest]
    #[case("2024-01-01T00:00:00Z", "2024-01-10T00:00:00Z", 9)]
    #[case("2024-01-01T00:00:00Z", "2024-01-01T12:00:00Z", 0)]
    #[case("2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z", 0)]
    #[case("2024-01-01T12:00:00Z", "2024-01-01T00:00:00Z", -1)]
    #[case("2024-01-10T00:00:00Z", "2024-01-01T00:00:00Z", -9)]
    fn elapsed_whole_days_floors(#[case] start: &str, #[case] end: &str, #[case] expected: i64) {
        assert_eq!(elapsed_whole_days(instant(start), instant(end)), expected);
    }

    #[test]
    fn cycle_time_starts_at_earlier_of_commit_and_creation() {
        let days = cycle_time_days(
            Some(instant("2024-01-01T00:00:00Z")),
            instant("2024-01-02T00:00:00Z"),
            Some(instant("2024-01-10T00:00:00Z")),
            instant("2024-06-01T00:00:00Z"),
        );
        assert_eq!(days, 9);
    }

    #[test]
    fn cycle_time_uses_creation_when_no_commit_date() {
        let days = cycle_time_days(
            None,
            instant("2024-01-02T00:00:00Z"),
            Some(instant("2024-01-10T00:00:00Z")),
            instant("2024-06-01T00:00:00Z"),
        );
        assert_eq!(days, 8);
    }

    #[test]
    fn cycle_time_for_unmerged_pr_runs_to_now() {
        let days = cycle_time_days(
            Some(instant("2024-01-01T00:00:00Z")),
            instant("2024-01-02T00:00:00Z"),
            None,
            instant("2024-01-05T06:00:00Z"),
        );
        assert_eq!(days, 4);
    }

    #[test]
    fn cycle_time_preserves_negative_values() {
        // Commit recorded after the merge instant, e.g. amended committer
        // dates. The negative result must survive unclamped.
        let days = cycle_time_days(
            Some(instant("2024-01-20T00:00:00Z")),
            instant("2024-01-21T00:00:00Z"),
            Some(instant("2024-01-10T00:00:00Z")),
            instant("2024-06-01T00:00:00Z"),
        );
        assert_eq!(days, -10);
    }

    #[test]
    fn cycle_time_is_deterministic_for_identical_snapshots() {
        let args = (
            Some(instant("2024-03-01T08:00:00Z")),
            instant("2024-03-02T09:30:00Z"),
            Some(instant("2024-03-09T17:45:00Z")),
            instant("2024-04-01T00:00:00Z"),
        );
        let first = cycle_time_days(args.0, args.1, args.2, args.3);
        let second = cycle_time_days(args.0, args.1, args.2, args.3);
        assert_eq!(first, second);
    }

    #[test]
    fn timestamp_round_trips_through_text() {
        let original = instant("2024-05-06T07:08:09Z");
        let text = format_timestamp(original);
        assert_eq!(text, "2024-05-06T07:08:09Z");
        assert_eq!(parse_timestamp(&text).expect("should parse"), original);
    }

    #[test]
    fn epoch_formats_as_the_default_watermark() {
        assert_eq!(format_timestamp(epoch()), "1970-01-01T00:00:00Z");
    }
}
