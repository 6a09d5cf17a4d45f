//! Server configuration.

use clap::Parser;

use crate::auth::{AuthConfig, DataRules};

/// Scentra data API server configuration
#[derive(Debug, Parser)]
#[command(name = "data-server", about = "Scentra data API server", long_about = None)]
pub struct ServerConfig {
    /// Server host address
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Static key accepted for the `apiKey` auth mode
    #[arg(long, env = "SCENTRA_API_KEY")]
    pub api_key: Option<String>,

    /// Credential accepted for the `iam` auth mode
    #[arg(long, env = "SCENTRA_INFRA_CREDENTIAL")]
    pub infra_credential: Option<String>,
}

impl ServerConfig {
    /// Load configuration from `.env`, the environment and CLI arguments.
    pub fn load() -> Result<Self, clap::Error> {
        // A missing .env file is fine.
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            api_key: self.api_key.clone(),
            infra_credential: self.infra_credential.clone(),
            ..Settings::default()
        }
    }
}

/// Everything the router needs to make auth decisions.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub auth: AuthConfig,
    pub data: DataRules,
    pub api_key: Option<String>,
    pub infra_credential: Option<String>,
}
