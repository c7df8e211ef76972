//! Error types exposed by the GitHub API layer.

use thiserror::Error;

use super::rate_limit::RateLimitInfo;

/// Errors surfaced while configuring or communicating with GitHub.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The authentication token was missing.
    #[error("personal access token is required (use --token or CADENCE_TOKEN)")]
    MissingToken,

    /// No target organization was supplied.
    #[error("organization name is required (use --org or CADENCE_ORG)")]
    MissingOrganization,

    /// A URL could not be parsed or constructed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// GitHub rejected the credentials.
    #[error("GitHub rejected the token: {message}")]
    Authentication {
        /// GitHub error message returned with the 401/403 response.
        message: String,
    },

    /// GitHub returned a non-authentication API error.
    #[error("GitHub API error: {message}")]
    Api {
        /// Response body from GitHub describing the failure.
        message: String,
    },

    /// Networking failed while calling GitHub.
    #[error("network error talking to GitHub: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// A response body could not be decoded into the expected shape.
    #[error("failed to decode GitHub response: {message}")]
    Decode {
        /// Deserialization error detail.
        message: String,
    },

    /// Rate limit exceeded: GitHub returned 403/429 with a rate limit message.
    #[error("GitHub API rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Rate limit info if available from response headers.
        rate_limit: Option<RateLimitInfo>,
        /// Error message from GitHub.
        message: String,
    },
}
