//! SQLite-backed store for pipeline records and fetch watermarks.
//!
//! Four tables back the pipeline: append-only `pr_data` and `branch_data`
//! observation logs, the upserted `cycle_time_metrics` keyed by
//! `(repo_full_name, pr_number)`, and the per-repository `last_fetch`
//! watermark that drives incremental behaviour. Connections are established
//! per operation; upserts make concurrent re-delivery safe.

use chrono::{DateTime, Utc};
use diesel::Connection;
use diesel::OptionalExtension;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Nullable, Text};
use diesel::sqlite::SqliteConnection;

use crate::github::identity::RepositoryFullName;
use crate::github::models::UNKNOWN_COMMIT_DATE;
use crate::metrics::{format_timestamp, parse_timestamp};

use super::PersistenceError;
use super::records::{BranchRecord, CycleTimeMetric, PullRequestRecord, PullRequestStatus};

/// SQLite-backed store for the four pipeline tables.
#[derive(Debug, Clone)]
pub struct MetricsStore {
    database_url: String,
}

impl MetricsStore {
    /// Creates a store targeting the configured `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::BlankDatabaseUrl`] when the URL is blank.
    pub fn new(database_url: impl Into<String>) -> Result<Self, PersistenceError> {
        let database_url_string = database_url.into();
        if database_url_string.trim().is_empty() {
            return Err(PersistenceError::BlankDatabaseUrl);
        }
        Ok(Self {
            database_url: database_url_string,
        })
    }

    /// Appends one pull request observation.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the database cannot be opened, the
    /// schema is missing, or the write fails.
    pub fn insert_pull_request(&self, record: &PullRequestRecord) -> Result<(), PersistenceError> {
        let mut connection = self.establish_connection()?;

        sql_query(
            "INSERT INTO pr_data \
             (repo_full_name, pr_number, pr_title, pr_state, pr_created_at, pr_updated_at, \
              pr_url, pr_author) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?);",
        )
        .bind::<Text, _>(&record.repo_full_name)
        .bind::<BigInt, _>(to_i64(record.pr_number))
        .bind::<Text, _>(&record.title)
        .bind::<Text, _>(&record.state)
        .bind::<Text, _>(format_timestamp(record.created_at))
        .bind::<Text, _>(format_timestamp(record.updated_at))
        .bind::<Text, _>(&record.url)
        .bind::<Text, _>(&record.author)
        .execute(&mut connection)
        .map(drop)
        .map_err(map_write_error)
    }

    /// Appends a batch of branch observations in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the transaction fails; no partial
    /// batch survives a failure.
    pub fn insert_branches(&self, records: &[BranchRecord]) -> Result<(), PersistenceError> {
        let mut connection = self.establish_connection()?;

        connection
            .transaction::<_, diesel::result::Error, _>(|connection| {
                for record in records {
                    let earliest = record
                        .earliest_commit_date
                        .map_or_else(|| UNKNOWN_COMMIT_DATE.to_owned(), format_timestamp);
                    sql_query(
                        "INSERT INTO branch_data \
                         (repo_full_name, branch_name, earliest_commit_date, \
                          latest_commit_date, branch_url) \
                         VALUES (?, ?, ?, ?, ?);",
                    )
                    .bind::<Text, _>(&record.repo_full_name)
                    .bind::<Text, _>(&record.branch_name)
                    .bind::<Text, _>(earliest)
                    .bind::<Text, _>(format_timestamp(record.latest_commit_date))
                    .bind::<Text, _>(&record.branch_url)
                    .execute(connection)?;
                }
                Ok(())
            })
            .map_err(map_write_error)
    }

    /// Inserts or refreshes the cycle-time metric for one pull request.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the schema is missing or the write
    /// fails.
    pub fn upsert_cycle_time(&self, metric: &CycleTimeMetric) -> Result<(), PersistenceError> {
        let mut connection = self.establish_connection()?;

        sql_query(
            "INSERT INTO cycle_time_metrics \
             (repo_full_name, pr_number, pr_created_at, pr_merged_at, pr_status, cycle_time, \
              first_commit_date, last_commit_date) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(repo_full_name, pr_number) DO UPDATE SET \
               pr_created_at = excluded.pr_created_at, \
               pr_merged_at = excluded.pr_merged_at, \
               pr_status = excluded.pr_status, \
               cycle_time = excluded.cycle_time, \
               first_commit_date = excluded.first_commit_date, \
               last_commit_date = excluded.last_commit_date;",
        )
        .bind::<Text, _>(&metric.repo_full_name)
        .bind::<BigInt, _>(to_i64(metric.pr_number))
        .bind::<Text, _>(format_timestamp(metric.pr_created_at))
        .bind::<Nullable<Text>, _>(metric.pr_merged_at.map(format_timestamp))
        .bind::<Text, _>(metric.status.as_str())
        .bind::<BigInt, _>(metric.cycle_time_days)
        .bind::<Nullable<Text>, _>(metric.first_commit_date.map(format_timestamp))
        .bind::<Nullable<Text>, _>(metric.last_commit_date.map(format_timestamp))
        .execute(&mut connection)
        .map(drop)
        .map_err(map_write_error)
    }

    /// Reads the stored watermark for a repository, when one exists.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails or the stored value
    /// does not parse as a timestamp.
    pub fn last_fetch_timestamp(
        &self,
        repo: &RepositoryFullName,
    ) -> Result<Option<DateTime<Utc>>, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = Text)]
            last_fetch_timestamp: String,
        }

        let mut connection = self.establish_connection()?;

        let result: Option<Row> =
            sql_query("SELECT last_fetch_timestamp FROM last_fetch WHERE repo_full_name = ?;")
                .bind::<Text, _>(repo.as_str())
                .get_result(&mut connection)
                .optional()
                .map_err(map_read_error)?;

        result
            .map(|row| {
                parse_timestamp(&row.last_fetch_timestamp).map_err(|error| {
                    PersistenceError::CorruptValue {
                        message: format!(
                            "watermark for {repo}: {raw:?}: {error}",
                            raw = row.last_fetch_timestamp
                        ),
                    }
                })
            })
            .transpose()
    }

    /// Advances (or creates) the watermark for a repository.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the schema is missing or the write
    /// fails.
    pub fn set_last_fetch_timestamp(
        &self,
        repo: &RepositoryFullName,
        instant: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let mut connection = self.establish_connection()?;

        sql_query(
            "INSERT INTO last_fetch (repo_full_name, last_fetch_timestamp) \
             VALUES (?, ?) \
             ON CONFLICT(repo_full_name) \
             DO UPDATE SET last_fetch_timestamp = excluded.last_fetch_timestamp;",
        )
        .bind::<Text, _>(repo.as_str())
        .bind::<Text, _>(format_timestamp(instant))
        .execute(&mut connection)
        .map(drop)
        .map_err(map_write_error)
    }

    /// Reads back the cycle-time metric for one pull request.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails or a stored value
    /// does not parse.
    pub fn cycle_time_metric(
        &self,
        repo_full_name: &str,
        pr_number: u64,
    ) -> Result<Option<CycleTimeMetric>, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = Text)]
            pr_created_at: String,
            #[diesel(sql_type = Nullable<Text>)]
            pr_merged_at: Option<String>,
            #[diesel(sql_type = Text)]
            pr_status: String,
            #[diesel(sql_type = BigInt)]
            cycle_time: i64,
            #[diesel(sql_type = Nullable<Text>)]
            first_commit_date: Option<String>,
            #[diesel(sql_type = Nullable<Text>)]
            last_commit_date: Option<String>,
        }

        let mut connection = self.establish_connection()?;

        let result: Option<Row> = sql_query(
            "SELECT pr_created_at, pr_merged_at, pr_status, cycle_time, first_commit_date, \
             last_commit_date \
             FROM cycle_time_metrics \
             WHERE repo_full_name = ? AND pr_number = ? \
             LIMIT 1;",
        )
        .bind::<Text, _>(repo_full_name)
        .bind::<BigInt, _>(to_i64(pr_number))
        .get_result(&mut connection)
        .optional()
        .map_err(map_read_error)?;

        result
            .map(|row| {
                Ok(CycleTimeMetric {
                    repo_full_name: repo_full_name.to_owned(),
                    pr_number,
                    pr_created_at: parse_stored(&row.pr_created_at, "pr_created_at")?,
                    pr_merged_at: parse_stored_optional(row.pr_merged_at, "pr_merged_at")?,
                    status: PullRequestStatus::parse(&row.pr_status).ok_or_else(|| {
                        PersistenceError::CorruptValue {
                            message: format!("pr_status: {status:?}", status = row.pr_status),
                        }
                    })?,
                    cycle_time_days: row.cycle_time,
                    first_commit_date: parse_stored_optional(
                        row.first_commit_date,
                        "first_commit_date",
                    )?,
                    last_commit_date: parse_stored_optional(
                        row.last_commit_date,
                        "last_commit_date",
                    )?,
                })
            })
            .transpose()
    }

    /// Counts pull request observations for a repository.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    pub fn count_pull_requests(&self, repo_full_name: &str) -> Result<i64, PersistenceError> {
        self.count_rows(
            "SELECT COUNT(*) AS total FROM pr_data WHERE repo_full_name = ?;",
            repo_full_name,
        )
    }

    /// Counts branch observations for a repository.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    pub fn count_branches(&self, repo_full_name: &str) -> Result<i64, PersistenceError> {
        self.count_rows(
            "SELECT COUNT(*) AS total FROM branch_data WHERE repo_full_name = ?;",
            repo_full_name,
        )
    }

    /// Counts cycle-time metric rows for a repository.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    pub fn count_cycle_time_metrics(&self, repo_full_name: &str) -> Result<i64, PersistenceError> {
        self.count_rows(
            "SELECT COUNT(*) AS total FROM cycle_time_metrics WHERE repo_full_name = ?;",
            repo_full_name,
        )
    }

    fn count_rows(&self, query: &str, repo_full_name: &str) -> Result<i64, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            total: i64,
        }

        let mut connection = self.establish_connection()?;
        let row: Row = sql_query(query)
            .bind::<Text, _>(repo_full_name)
            .get_result(&mut connection)
            .map_err(map_read_error)?;
        Ok(row.total)
    }

    fn establish_connection(&self) -> Result<SqliteConnection, PersistenceError> {
        SqliteConnection::establish(&self.database_url).map_err(|error| {
            PersistenceError::ConnectionFailed {
                message: error.to_string(),
            }
        })
    }
}

/// SQLite stores INTEGER as i64; PR numbers beyond that range do not occur
/// in practice, so saturate rather than fail the write.
const fn to_i64(value: u64) -> i64 {
    if value > i64::MAX as u64 {
        i64::MAX
    } else {
        value as i64
    }
}

fn parse_stored(text: &str, column: &str) -> Result<DateTime<Utc>, PersistenceError> {
    parse_timestamp(text).map_err(|error| PersistenceError::CorruptValue {
        message: format!("{column}: {text:?}: {error}"),
    })
}

fn parse_stored_optional(
    text: Option<String>,
    column: &str,
) -> Result<Option<DateTime<Utc>>, PersistenceError> {
    text.map(|value| parse_stored(&value, column)).transpose()
}

fn is_missing_schema(error: &diesel::result::Error) -> bool {
    error.to_string().contains("no such table")
}

fn map_read_error(error: diesel::result::Error) -> PersistenceError {
    if is_missing_schema(&error) {
        PersistenceError::SchemaMissing {
            message: error.to_string(),
        }
    } else {
        PersistenceError::QueryFailed {
            message: error.to_string(),
        }
    }
}

fn map_write_error(error: diesel::result::Error) -> PersistenceError {
    if is_missing_schema(&error) {
        PersistenceError::SchemaMissing {
            message: error.to_string(),
        }
    } else {
        PersistenceError::WriteFailed {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    use super::MetricsStore;
    use crate::github::identity::RepositoryFullName;
    use crate::metrics::parse_timestamp;
    use crate::persistence::migrator::migrate_database;
    use crate::persistence::records::{BranchRecord, CycleTimeMetric, PullRequestStatus};
    use crate::telemetry::NoopTelemetrySink;

    fn instant(text: &str) -> DateTime<Utc> {
        parse_timestamp(text).expect("test timestamp should parse")
    }

    fn migrated_store() -> (TempDir, MetricsStore) {
        let dir = TempDir::new().expect("temp dir should be created");
        let path = dir
            .path()
            .join("cadence-test.sqlite")
            .to_string_lossy()
            .into_owned();
        migrate_database(&path, &NoopTelemetrySink).expect("migrations should apply");
        let store = MetricsStore::new(path).expect("store should open");
        (dir, store)
    }

    fn sample_metric(repo: &str, pr_number: u64, cycle_time_days: i64) -> CycleTimeMetric {
        CycleTimeMetric {
            repo_full_name: repo.to_owned(),
            pr_number,
            pr_created_at: instant("2024-01-02T00:00:00Z"),
            pr_merged_at: Some(instant("2024-01-10T00:00:00Z")),
            status: PullRequestStatus::Merged,
            cycle_time_days,
            first_commit_date: Some(instant("2024-01-01T00:00:00Z")),
            last_commit_date: Some(instant("2024-01-09T00:00:00Z")),
        }
    }

    #[test]
    fn absent_watermark_reads_as_none() {
        let (_dir, store) = migrated_store();
        let repo = RepositoryFullName::new("acme/widgets").expect("identifier should be valid");
        assert_eq!(
            store
                .last_fetch_timestamp(&repo)
                .expect("read should succeed"),
            None
        );
    }

    #[test]
    fn watermark_round_trips_and_upserts() {
        let (_dir, store) = migrated_store();
        let repo = RepositoryFullName::new("acme/widgets").expect("identifier should be valid");

        store
            .set_last_fetch_timestamp(&repo, instant("2024-06-01T00:00:00Z"))
            .expect("first write should succeed");
        store
            .set_last_fetch_timestamp(&repo, instant("2024-06-02T00:00:00Z"))
            .expect("second write should succeed");

        assert_eq!(
            store
                .last_fetch_timestamp(&repo)
                .expect("read should succeed"),
            Some(instant("2024-06-02T00:00:00Z"))
        );
    }

    #[test]
    fn upserting_a_metric_twice_leaves_one_row() {
        let (_dir, store) = migrated_store();

        store
            .upsert_cycle_time(&sample_metric("acme/widgets", 12, 9))
            .expect("first upsert should succeed");
        store
            .upsert_cycle_time(&sample_metric("acme/widgets", 12, 11))
            .expect("second upsert should succeed");

        assert_eq!(
            store
                .count_cycle_time_metrics("acme/widgets")
                .expect("count should succeed"),
            1
        );
        let stored = store
            .cycle_time_metric("acme/widgets", 12)
            .expect("read should succeed")
            .expect("metric should exist");
        assert_eq!(stored.cycle_time_days, 11, "upsert should overwrite");
    }

    #[test]
    fn same_pr_number_in_different_repos_keeps_distinct_metrics() {
        let (_dir, store) = migrated_store();

        store
            .upsert_cycle_time(&sample_metric("acme/widgets", 7, 3))
            .expect("upsert should succeed");
        store
            .upsert_cycle_time(&sample_metric("acme/gadgets", 7, 5))
            .expect("upsert should succeed");

        let widgets = store
            .cycle_time_metric("acme/widgets", 7)
            .expect("read should succeed")
            .expect("metric should exist");
        let gadgets = store
            .cycle_time_metric("acme/gadgets", 7)
            .expect("read should succeed")
            .expect("metric should exist");
        assert_eq!(widgets.cycle_time_days, 3);
        assert_eq!(gadgets.cycle_time_days, 5);
    }

    #[test]
    fn negative_cycle_time_survives_storage() {
        let (_dir, store) = migrated_store();

        store
            .upsert_cycle_time(&sample_metric("acme/widgets", 3, -2))
            .expect("upsert should succeed");

        let stored = store
            .cycle_time_metric("acme/widgets", 3)
            .expect("read should succeed")
            .expect("metric should exist");
        assert_eq!(stored.cycle_time_days, -2);
    }

    #[test]
    fn branch_batch_inserts_atomically_with_sentinel_earliest_date() {
        let (_dir, store) = migrated_store();

        let records = vec![
            BranchRecord {
                repo_full_name: "acme/widgets".to_owned(),
                branch_name: "main".to_owned(),
                earliest_commit_date: None,
                latest_commit_date: instant("2024-05-01T00:00:00Z"),
                branch_url: "https://github.com/acme/widgets/tree/main".to_owned(),
            },
            BranchRecord {
                repo_full_name: "acme/widgets".to_owned(),
                branch_name: "dev".to_owned(),
                earliest_commit_date: Some(instant("2024-01-01T00:00:00Z")),
                latest_commit_date: instant("2024-05-02T00:00:00Z"),
                branch_url: "https://github.com/acme/widgets/tree/dev".to_owned(),
            },
        ];

        store
            .insert_branches(&records)
            .expect("batch insert should succeed");
        assert_eq!(
            store
                .count_branches("acme/widgets")
                .expect("count should succeed"),
            2
        );
    }

    #[test]
    fn unmigrated_database_reports_missing_schema() {
        let dir = TempDir::new().expect("temp dir should be created");
        let path = dir
            .path()
            .join("empty.sqlite")
            .to_string_lossy()
            .into_owned();
        let store = MetricsStore::new(path).expect("store should open");

        let repo = RepositoryFullName::new("acme/widgets").expect("identifier should be valid");
        let error = store
            .last_fetch_timestamp(&repo)
            .expect_err("query against missing schema should fail");
        assert!(matches!(
            error,
            crate::persistence::PersistenceError::SchemaMissing { .. }
        ));
    }
}
