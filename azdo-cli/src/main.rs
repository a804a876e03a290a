//! Azure DevOps CLI
//!
//! Drives the provider's resource callbacks from the command line. State and
//! configuration are exchanged as JSON on stdin/stdout; logs go to stderr.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "azdo")]
#[command(about = "Azure DevOps pipeline resources", long_about = None)]
struct Cli {
    /// Organization URL
    #[arg(long, env = "AZDO_ORG_SERVICE_URL")]
    org_service_url: Option<String>,

    /// Personal access token
    #[arg(long, env = "AZDO_PERSONAL_ACCESS_TOKEN", hide_env_values = true)]
    personal_access_token: Option<String>,

    /// REST API version
    #[arg(long, env = "AZDO_API_VERSION")]
    api_version: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "AZDO_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "azdo_cli=info,azdo_provider=info,azdo_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = cli.org_service_url {
        config = config.with_organization_url(url);
    }
    if let Some(token) = cli.personal_access_token {
        config = config.with_personal_access_token(token);
    }
    if let Some(version) = cli.api_version {
        config = config.with_api_version(version);
    }
    if let Some(secs) = cli.request_timeout {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }

    handle_command(cli.command, &config).await
}
