//! Error types for local persistence operations.

use thiserror::Error;

/// Errors returned while opening, migrating, or querying the local `SQLite`
/// database.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// No database URL/path was provided.
    #[error("database URL is required (use --database-url or CADENCE_DATABASE_URL)")]
    MissingDatabaseUrl,

    /// The database URL/path was present but blank.
    #[error("database URL must not be blank")]
    BlankDatabaseUrl,

    /// Establishing a `SQLite` connection failed.
    #[error("failed to connect to SQLite database: {message}")]
    ConnectionFailed {
        /// Error detail from Diesel.
        message: String,
    },

    /// Running pending migrations failed.
    #[error("failed to run database migrations: {message}")]
    MigrationFailed {
        /// Error detail from Diesel migrations.
        message: String,
    },

    /// Reading the schema version from the migration table failed.
    #[error("failed to read schema version after migrations: {message}")]
    SchemaVersionQueryFailed {
        /// Error detail from Diesel query execution.
        message: String,
    },

    /// The migrations completed but no schema version could be found.
    #[error("no schema version recorded after migrations ran")]
    MissingSchemaVersion,

    /// A query hit a missing table, i.e. migrations have not been applied.
    #[error("database schema is missing ({message}); run with --migrate-db first")]
    SchemaMissing {
        /// Error detail naming the missing table.
        message: String,
    },

    /// A read query failed.
    #[error("database query failed: {message}")]
    QueryFailed {
        /// Error detail from Diesel query execution.
        message: String,
    },

    /// A write failed.
    #[error("database write failed: {message}")]
    WriteFailed {
        /// Error detail from Diesel query execution.
        message: String,
    },

    /// A stored value could not be interpreted.
    #[error("corrupt stored value: {message}")]
    CorruptValue {
        /// Description of the value that failed to parse.
        message: String,
    },
}
