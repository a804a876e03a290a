//! Resource command handlers
//!
//! Each subcommand maps to one provider callback. Input and output state are
//! JSON; status lines go to stderr.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use serde_json::Value;
use tracing::info;

use super::{build_provider, print_json, read_json};
use crate::config::Config;

/// Resource subcommands
#[derive(Subcommand)]
pub enum ResourceCommands {
    /// Create the resource from a configuration object
    Create {
        /// Configuration file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        file: String,
    },
    /// Refresh persisted state from the service
    Read {
        /// State file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        file: String,
    },
    /// Apply a new configuration over persisted state
    Update {
        /// State written by the last create or update
        #[arg(long)]
        state: String,

        /// New configuration
        #[arg(long)]
        config: String,
    },
    /// Delete the resource
    Delete {
        /// State file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        file: String,
    },
    /// Import an existing object by its import id
    Import {
        /// e.g. `<project>/<definition id>`
        id: String,
    },
}

/// Handle resource commands
pub async fn handle_resource_command(
    resource_type: &str,
    command: ResourceCommands,
    config: &Config,
) -> Result<()> {
    config.validate()?;
    let provider = build_provider(config)?;
    info!("Using organization {}", config.organization_url);

    match command {
        ResourceCommands::Create { file } => {
            let state = provider
                .create(resource_type, read_json(&file)?)
                .await
                .with_context(|| format!("Failed to create {}", resource_type))?;
            report("created", resource_type, &state);
            print_json(&state)
        }
        ResourceCommands::Read { file } => {
            let state = provider
                .read(resource_type, read_json(&file)?)
                .await
                .with_context(|| format!("Failed to read {}", resource_type))?;
            if resource_id(&state).is_empty() {
                eprintln!("{}", format!("{} no longer exists", resource_type).yellow());
            }
            print_json(&state)
        }
        ResourceCommands::Update { state, config } => {
            let state = provider
                .update(resource_type, read_json(&state)?, read_json(&config)?)
                .await
                .with_context(|| format!("Failed to update {}", resource_type))?;
            report("updated", resource_type, &state);
            print_json(&state)
        }
        ResourceCommands::Delete { file } => {
            let state = read_json(&file)?;
            let id = resource_id(&state).to_string();
            provider
                .delete(resource_type, state)
                .await
                .with_context(|| format!("Failed to delete {}", resource_type))?;
            eprintln!("{} {} {}", "✓ Deleted".green().bold(), resource_type, id.cyan());
            Ok(())
        }
        ResourceCommands::Import { id } => {
            let state = provider
                .import(resource_type, &id)
                .await
                .with_context(|| format!("Failed to import {} {}", resource_type, id))?;
            report("imported", resource_type, &state);
            print_json(&state)
        }
    }
}

fn resource_id(state: &Value) -> &str {
    state.get("id").and_then(Value::as_str).unwrap_or_default()
}

fn report(action: &str, resource_type: &str, state: &Value) {
    eprintln!(
        "{} {} {}",
        format!("✓ {}", action).green().bold(),
        resource_type,
        resource_id(state).cyan()
    );
}
