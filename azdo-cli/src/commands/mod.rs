//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod definition;
mod resource;
mod tasks;

pub use definition::DefinitionKind;
pub use resource::ResourceCommands;

use anyhow::{Context, Result};
use azdo_client::DevOpsClient;
use azdo_core::TaskRegistry;
use azdo_provider::Provider;
use clap::Subcommand;
use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a resource lifecycle callback against the service
    Resource {
        /// Resource type, e.g. azuredevops_build_definition
        resource_type: String,

        #[command(subcommand)]
        command: ResourceCommands,
    },
    /// Upgrade persisted state to the current schema version
    Migrate {
        /// Resource type the state belongs to
        resource_type: String,

        /// Schema version the state was written with
        #[arg(long)]
        from: u32,

        /// State file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        file: String,
    },
    /// Validate and expand a definition without contacting the service
    Expand {
        #[arg(value_enum)]
        kind: DefinitionKind,

        /// Model file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        file: String,
    },
    /// List the workflow tasks known to the release codec
    Tasks,
    /// List resource types and their schema versions
    Types,
}

/// Handle a CLI command
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Resource {
            resource_type,
            command,
        } => resource::handle_resource_command(&resource_type, command, config).await,
        Commands::Migrate {
            resource_type,
            from,
            file,
        } => definition::migrate_state(&build_provider(config)?, &resource_type, from, &file),
        Commands::Expand { kind, file } => definition::expand_definition(kind, &file),
        Commands::Tasks => tasks::list_tasks(&TaskRegistry::default()),
        Commands::Types => tasks::list_types(&build_provider(config)?),
    }
}

/// Provider backed by a REST client built from `config`
///
/// No request is made here, so offline commands may call this with an
/// unvalidated configuration.
pub(crate) fn build_provider(config: &Config) -> Result<Provider> {
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let client = DevOpsClient::with_client(
        config.organization_url.as_str(),
        config.personal_access_token.clone(),
        http,
    )
    .with_api_version(config.api_version.as_str());

    Ok(Provider::with_client(
        Arc::new(client),
        Arc::new(TaskRegistry::default()),
    ))
}

/// Read a JSON document from a file, or stdin for `-`
pub(crate) fn read_json(path: &str) -> Result<Value> {
    let content = if path == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))?
    };

    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON from {}", path))
}

pub(crate) fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
