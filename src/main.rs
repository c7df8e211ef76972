//! Cadence CLI entrypoint for organization metrics collection.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use cadence::{
    CadenceConfig, MetricsStore, OrganizationName, PersonalAccessToken, PipelineError, RestClient,
    StderrJsonlTelemetrySink, SyncEngine, SyncOutcome, TelemetrySink, migrate_database,
};
use cadence::telemetry::TelemetryEvent;
use chrono::Utc;
use ortho_config::OrthoConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cadence=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run() -> Result<(), PipelineError> {
    let config = load_config()?;
    let telemetry = StderrJsonlTelemetrySink;
    let options = config.fetch_options();

    if options.is_noop() && !config.migrate_db {
        let mut stdout = io::stdout().lock();
        writeln!(
            stdout,
            "Nothing to do: pass --fetch-branches and/or --fetch-prs (or --migrate-db)."
        )
        .map_err(io_error)?;
        return Ok(());
    }

    let database_url = config.require_database_url()?.to_owned();
    migrate_database(&database_url, &telemetry)?;
    if options.is_noop() {
        // --migrate-db alone: initialize the schema and stop.
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "Database migrations applied.").map_err(io_error)?;
        return Ok(());
    }

    let org = OrganizationName::new(config.require_org()?)?;
    let token = PersonalAccessToken::new(config.resolve_token()?)?;
    let client = RestClient::new(&config.api_base, org, token)?;
    let store = MetricsStore::new(database_url)?;

    let engine = SyncEngine::new(&client, &store);
    let outcome = engine.run(options).await?;

    if let Some(path) = config.export_open_prs.as_deref() {
        export_open_pull_requests(path, &outcome)?;
    }

    write_summary(&outcome)?;
    telemetry.record(TelemetryEvent::SyncCompleted {
        repositories_scanned: outcome.summary.repositories_scanned,
        repositories_skipped: outcome.summary.repositories_skipped,
        metrics_derived: outcome.summary.metrics_derived,
    });
    Ok(())
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`PipelineError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<CadenceConfig, PipelineError> {
    CadenceConfig::load().map_err(|error| PipelineError::Configuration {
        message: error.to_string(),
    })
}

fn export_open_pull_requests(path: &str, outcome: &SyncOutcome) -> Result<(), PipelineError> {
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    cadence::export::write_open_pull_requests(&mut writer, &outcome.pull_requests, Utc::now())?;
    writer.flush().map_err(io_error)
}

fn write_summary(outcome: &SyncOutcome) -> Result<(), PipelineError> {
    let summary = outcome.summary;
    let mut stdout = io::stdout().lock();
    writeln!(
        stdout,
        "Scanned {} repositories ({} skipped, {} failed); recorded {} branches, \
         {} pull requests, {} cycle-time metrics.",
        summary.repositories_scanned,
        summary.repositories_skipped,
        summary.repositories_failed,
        summary.branches_recorded,
        summary.open_pull_requests,
        summary.metrics_derived,
    )
    .map_err(io_error)
}

fn io_error(error: io::Error) -> PipelineError {
    PipelineError::Io {
        message: error.to_string(),
    }
}
