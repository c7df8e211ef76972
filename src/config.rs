//! Application configuration loaded from CLI, environment, and files.
//!
//! A single configuration struct merges values from command-line arguments,
//! environment variables, and configuration files using ortho-config's
//! layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.cadence.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `CADENCE_ORG`, `CADENCE_TOKEN`, or legacy
//!    `GITHUB_TOKEN`
//! 4. **Command-line arguments** – `--org`/`-o`, `--token`/`-t`, and friends
//!
//! # Configuration File
//!
//! Place `.cadence.toml` in the current directory, home directory, or XDG
//! config directory with:
//!
//! ```toml
//! org = "acme"
//! token = "ghp_example"
//! database_url = "cadence.sqlite"
//! fetch_branches = true
//! fetch_prs = true
//! ```

use std::env;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::engine::FetchOptions;
use crate::github::error::ApiError;
use crate::persistence::PersistenceError;

/// Default REST API base, overridable for GitHub Enterprise installs.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Environment Variables
///
/// - `CADENCE_ORG` or `--org`: Organization to scan
/// - `CADENCE_TOKEN`, `GITHUB_TOKEN`, or `--token`: Authentication token
/// - `CADENCE_API_BASE` or `--api-base`: REST API base URL
/// - `CADENCE_DATABASE_URL` or `--database-url`: Local `SQLite` database path
/// - `CADENCE_EXPORT_OPEN_PRS` or `--export-open-prs`: JSONL output path
///
/// # Example
///
/// ```no_run
/// use cadence::CadenceConfig;
/// use ortho_config::OrthoConfig;
///
/// let config = CadenceConfig::load().expect("failed to load configuration");
/// let org = config.require_org().expect("organization required");
/// let token = config.resolve_token().expect("token required");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "CADENCE",
    discovery(
        dotfile_name = ".cadence.toml",
        config_file_name = "cadence.toml",
        app_name = "cadence"
    )
)]
pub struct CadenceConfig {
    /// Organization whose repositories are scanned.
    ///
    /// Can be provided via:
    /// - CLI: `--org <ORG>` or `-o <ORG>`
    /// - Environment: `CADENCE_ORG`
    /// - Config file: `org = "..."`
    #[ortho_config(cli_short = 'o')]
    pub org: Option<String>,

    /// Personal access token for GitHub API authentication.
    ///
    /// Can be provided via:
    /// - CLI: `--token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `CADENCE_TOKEN` or `GITHUB_TOKEN` (legacy)
    /// - Config file: `token = "..."`
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// Base URL of the REST API.
    ///
    /// Defaults to the public GitHub API; point it at a GitHub Enterprise
    /// instance's `/api/v3` root when needed.
    ///
    /// Can be provided via:
    /// - CLI: `--api-base <URL>`
    /// - Environment: `CADENCE_API_BASE`
    /// - Config file: `api_base = "..."`
    #[ortho_config()]
    pub api_base: String,

    /// Local `SQLite` database URL/path used for persistence.
    ///
    /// Diesel uses a filesystem path for `SQLite` connections. The same value
    /// is also used by the Diesel CLI via `DATABASE_URL` when running
    /// migrations by hand.
    ///
    /// Can be provided via:
    /// - CLI: `--database-url <PATH>`
    /// - Environment: `CADENCE_DATABASE_URL`
    /// - Config file: `database_url = "..."`
    #[ortho_config()]
    pub database_url: Option<String>,

    /// Fetches per-branch activity for repositories that pass the gate.
    ///
    /// Can be provided via:
    /// - CLI: `--fetch-branches` / `-b`
    /// - Config file: `fetch_branches = true`
    #[ortho_config(cli_short = 'b')]
    pub fetch_branches: bool,

    /// Fetches open pull requests and derives cycle-time metrics.
    ///
    /// Can be provided via:
    /// - CLI: `--fetch-prs` / `-p`
    /// - Config file: `fetch_prs = true`
    #[ortho_config(cli_short = 'p')]
    pub fetch_prs: bool,

    /// Runs database migrations before anything else.
    ///
    /// When set without fetch flags, the binary initializes the database at
    /// `database_url`, applies any pending Diesel migrations, records the
    /// schema version in telemetry, and exits.
    ///
    /// Can be provided via:
    /// - CLI: `--migrate-db`
    /// - Environment: `CADENCE_MIGRATE_DB`
    /// - Config file: `migrate_db = true`
    #[ortho_config()]
    pub migrate_db: bool,

    /// Writes the observed open pull requests to this path as JSONL.
    ///
    /// Can be provided via:
    /// - CLI: `--export-open-prs <PATH>`
    /// - Environment: `CADENCE_EXPORT_OPEN_PRS`
    /// - Config file: `export_open_prs = "..."`
    #[ortho_config()]
    pub export_open_prs: Option<String>,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            org: None,
            token: None,
            api_base: DEFAULT_API_BASE.to_owned(),
            database_url: None,
            fetch_branches: false,
            fetch_prs: false,
            migrate_db: false,
            export_open_prs: None,
        }
    }
}

impl CadenceConfig {
    /// Resolves the token from configuration or the legacy `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// If no token is provided via `CADENCE_TOKEN`, the CLI, or a
    /// configuration file, this method falls back to reading `GITHUB_TOKEN`
    /// from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingToken`] when no token source provides a
    /// value.
    pub fn resolve_token(&self) -> Result<String, ApiError> {
        resolve_token_from(self.token.clone(), env::var("GITHUB_TOKEN").ok())
    }

    /// Returns the organization name or an error if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingOrganization`] when no organization is
    /// configured.
    pub fn require_org(&self) -> Result<&str, ApiError> {
        self.org.as_deref().ok_or(ApiError::MissingOrganization)
    }

    /// Returns the database URL or an error if missing.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::MissingDatabaseUrl`] when no database URL
    /// is configured.
    pub fn require_database_url(&self) -> Result<&str, PersistenceError> {
        self.database_url
            .as_deref()
            .ok_or(PersistenceError::MissingDatabaseUrl)
    }

    /// The fetch flags as engine options.
    #[must_use]
    pub const fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            fetch_branches: self.fetch_branches,
            fetch_prs: self.fetch_prs,
        }
    }
}

/// Token resolution with the fallback injected, so tests need not mutate
/// process environment variables.
fn resolve_token_from(
    configured: Option<String>,
    fallback: Option<String>,
) -> Result<String, ApiError> {
    configured.or(fallback).ok_or(ApiError::MissingToken)
}
