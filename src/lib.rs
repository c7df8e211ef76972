//! Cadence library crate: incremental GitHub organization metrics.
//!
//! The library scans every repository in an organization, gates each on its
//! recent event feed against a stored per-repository watermark, fetches
//! branch and pull request activity for the repositories that changed, and
//! derives cycle-time metrics for finished pull requests into a local
//! `SQLite` database.

pub mod config;
pub mod engine;
pub mod export;
pub mod github;
pub mod metrics;
pub mod persistence;
pub mod telemetry;

pub use config::CadenceConfig;
pub use engine::{FetchOptions, PipelineError, SyncEngine, SyncOutcome, SyncSummary};
pub use github::{
    ApiError, OrgDataGateway, OrganizationName, PersonalAccessToken, RepositoryFullName,
    RestClient,
};
pub use persistence::{MetricsStore, PersistenceError, migrate_database};
pub use telemetry::{StderrJsonlTelemetrySink, TelemetryEvent, TelemetrySink};
