//! Local persistence for pipeline records.
//!
//! The pipeline stores its observations in a local `SQLite` database whose
//! schema is managed with embedded Diesel migrations, so the store can be
//! created and upgraded consistently wherever the binary runs.

mod error;
pub mod migrator;
pub mod records;
mod store;

pub use error::PersistenceError;
pub use migrator::{INITIAL_SCHEMA_VERSION, SchemaVersion, migrate_database};
pub use records::{BranchRecord, CycleTimeMetric, PullRequestRecord, PullRequestStatus};
pub use store::MetricsStore;
