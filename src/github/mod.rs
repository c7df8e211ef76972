//! GitHub REST API layer: typed identities, wire models, pagination,
//! rate-limit state, and the organization data gateway.
//!
//! The engine consumes the [`OrgDataGateway`] trait; [`RestClient`] is the
//! reqwest-backed implementation. Errors are mapped into [`ApiError`]
//! variants so callers can distinguish authentication, rate-limit, network,
//! and API failures without inspecting HTTP internals.

pub mod client;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod models;
pub mod pagination;
pub mod rate_limit;

pub use client::{Paginated, RestClient, RetryPolicy};
pub use error::ApiError;
pub use gateway::OrgDataGateway;
pub use identity::{OrganizationName, PersonalAccessToken, RepositoryFullName};
pub use models::{
    BranchActivity, PullRequest, PullRequestState, RepositoryEvent, RepositorySummary,
    UNKNOWN_AUTHOR, UNKNOWN_COMMIT_DATE, UNKNOWN_REPOSITORY,
};
pub use rate_limit::RateLimitInfo;

#[cfg(test)]
pub use gateway::MockOrgDataGateway;
