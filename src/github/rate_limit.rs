//! Rate limit information from GitHub API responses.
//!
//! GitHub attaches `X-RateLimit-Remaining` and `X-RateLimit-Reset` headers to
//! every REST response. The paginated client inspects them after each page so
//! exhaustion can be surfaced as a soft, loggable condition and used to drive
//! backoff, rather than discovered via hard 403 failures.

use std::time::{SystemTime, UNIX_EPOCH};

use http::HeaderMap;

const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Rate limit state extracted from GitHub API response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Remaining requests in the current window.
    remaining: u32,
    /// Unix timestamp when the rate limit resets.
    reset_at: u64,
}

impl RateLimitInfo {
    /// Creates rate limit info from known values.
    #[must_use]
    pub const fn new(remaining: u32, reset_at: u64) -> Self {
        Self {
            remaining,
            reset_at,
        }
    }

    /// Parses rate limit headers from a response, if both are present and
    /// well-formed.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let remaining = parse_numeric_header(headers, REMAINING_HEADER)?;
        let reset_at = parse_numeric_header(headers, RESET_HEADER)?;
        Some(Self {
            remaining,
            reset_at,
        })
    }

    /// Returns the remaining requests in the current window.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Returns the Unix timestamp when the rate limit resets.
    #[must_use]
    pub const fn reset_at(&self) -> u64 {
        self.reset_at
    }

    /// Returns true if the rate limit has been exhausted.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Seconds until the rate limit resets.
    ///
    /// Returns 0 if the reset time has already passed or if the system time
    /// cannot be determined.
    #[must_use]
    pub fn seconds_until_reset(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs())
            .unwrap_or(0);

        self.reset_at.saturating_sub(now)
    }
}

fn parse_numeric_header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|text| text.parse().ok())
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use http::HeaderMap;

    use super::RateLimitInfo;

    fn headers(remaining: &str, reset: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(
            "x-ratelimit-remaining",
            remaining.parse().expect("header value should be valid"),
        );
        map.insert(
            "x-ratelimit-reset",
            reset.parse().expect("header value should be valid"),
        );
        map
    }

    #[test]
    fn from_headers_parses_both_values() {
        let info = RateLimitInfo::from_headers(&headers("42", "1700000000"))
            .expect("headers should parse");
        assert_eq!(info.remaining(), 42);
        assert_eq!(info.reset_at(), 1_700_000_000);
        assert!(!info.is_exhausted());
    }

    #[test]
    fn from_headers_returns_none_when_missing() {
        assert_eq!(RateLimitInfo::from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn from_headers_returns_none_for_garbage_values() {
        assert_eq!(
            RateLimitInfo::from_headers(&headers("not-a-number", "1700000000")),
            None
        );
    }

    #[test]
    fn zero_remaining_is_exhausted() {
        assert!(RateLimitInfo::new(0, 0).is_exhausted());
    }

    #[test]
    fn seconds_until_reset_returns_zero_when_reset_has_passed() {
        let info = RateLimitInfo::new(0, 0);
        assert_eq!(info.seconds_until_reset(), 0);
    }

    #[test]
    fn seconds_until_reset_returns_positive_for_future_reset() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be available")
            .as_secs();
        let info = RateLimitInfo::new(0, now + 60);

        let seconds = info.seconds_until_reset();
        assert!(
            (1..=60).contains(&seconds),
            "expected 1..=60 seconds until reset, got {seconds}"
        );
    }
}
