//! `scentra` operator command line.
//!
//! Reaches the data API through `scentra-core`'s `HttpRepository` and prints
//! results as JSON. `sync-status` is the admin path into the listing status
//! cascade.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use scentra_core::{
    all_order_items, sync_listing_status, AuthMode, BackendConfig, Credentials, HttpRepository,
    OrderItemFilter, Repository, Status, SyncError,
};
use serde_json::{json, Value};
use tracing::warn;

pub mod transport;

pub use transport::UreqTransport;

/// Scentra marketplace operator tool
#[derive(Debug, Parser)]
#[command(name = "scentra", about = "Scentra marketplace operator tool", long_about = None)]
pub struct Cli {
    /// JSON backend config file; replaces the endpoint and credential flags
    #[arg(long, env = "SCENTRA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data API base URL
    #[arg(long, env = "SCENTRA_ENDPOINT", default_value = "http://127.0.0.1:3000")]
    pub endpoint: String,

    /// Session token for the `userPool` auth mode
    #[arg(long, env = "SCENTRA_USER_TOKEN", hide_env_values = true)]
    pub user_token: Option<String>,

    /// Key for the `apiKey` auth mode
    #[arg(long, env = "SCENTRA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Credential for the `iam` auth mode
    #[arg(long, env = "SCENTRA_INFRA_CREDENTIAL", hide_env_values = true)]
    pub infra_credential: Option<String>,

    /// Auth mode for every call (userPool, apiKey or iam)
    #[arg(long, env = "SCENTRA_AUTH_MODE")]
    pub auth_mode: Option<AuthMode>,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set a listing's status and cascade it to every order item for it
    SyncStatus {
        listing_id: String,
        /// active, reserved, sold or removed
        status: Status,
    },
    /// Show one listing
    GetListing { listing_id: String },
    /// Show every order item that references a listing
    ListOrderItems { listing_id: String },
}

impl Cli {
    /// Parse process arguments after loading `.env`, so its values feed the
    /// `env` fallbacks.
    pub fn load() -> Result<Self, clap::Error> {
        // A missing .env file is fine.
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    /// Like [`Cli::load`], reading the given dotenv file instead of `./.env`.
    pub fn load_from<I, T>(dotenv_path: &Path, args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        _ = dotenvy::from_path(dotenv_path);

        Self::try_parse_from(args)
    }

    pub fn backend_config(&self) -> anyhow::Result<BackendConfig> {
        if let Some(path) = &self.config {
            return BackendConfig::load(path)
                .with_context(|| format!("loading backend config from {}", path.display()));
        }
        let config = BackendConfig::new(&self.endpoint).with_credentials(Credentials {
            user_token: self.user_token.clone(),
            api_key: self.api_key.clone(),
            infra_credential: self.infra_credential.clone(),
        });
        config.validate()?;
        Ok(config)
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.backend_config()?;
    let auth = cli.auth_mode.unwrap_or(config.default_auth_mode);
    let repo = HttpRepository::new(&config, UreqTransport::new());

    let output = execute(&repo, &cli.command, auth).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub async fn execute<R>(repo: &R, command: &Command, auth: AuthMode) -> anyhow::Result<Value>
where
    R: Repository + ?Sized,
{
    match command {
        Command::SyncStatus { listing_id, status } => {
            match sync_listing_status(repo, listing_id, *status, auth).await {
                Ok(report) => Ok(json!({
                    "listing": report.listing,
                    "updatedOrderItems": report.updated_order_items,
                })),
                Err(err) => {
                    report_partial(&err);
                    Err(err.into())
                }
            }
        }
        Command::GetListing { listing_id } => {
            let listing = repo.get_listing(listing_id, auth).await?;
            Ok(serde_json::to_value(listing)?)
        }
        Command::ListOrderItems { listing_id } => {
            let filter = OrderItemFilter::by_listing(listing_id);
            let items = all_order_items(repo, &filter, auth).await?;
            Ok(serde_json::to_value(items)?)
        }
    }
}

fn report_partial(err: &SyncError) {
    let updated = err.updated_order_items();
    if !updated.is_empty() {
        warn!(?updated, "these order items already carry the new status");
    }
}
