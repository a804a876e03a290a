//! Listing commands

use anyhow::Result;
use azdo_core::TaskRegistry;
use azdo_provider::Provider;
use colored::*;

pub fn list_tasks(registry: &TaskRegistry) -> Result<()> {
    let entries = registry.entries();
    println!("{} ({}):", "Workflow tasks".bold(), entries.len());
    println!();
    for (name, id) in entries {
        println!("  {} {}", "▸".cyan(), name.bold());
        println!("    ID: {}", id.to_string().dimmed());
    }
    Ok(())
}

pub fn list_types(provider: &Provider) -> Result<()> {
    println!("{}:", "Resource types".bold());
    println!();
    for name in provider.resource_types() {
        let version = provider.schema_version(name)?;
        println!("  {} {} {}", "▸".cyan(), name.bold(), format!("(schema v{})", version).dimmed());
    }
    Ok(())
}
