//! Offline definition commands: expand and state migration

use anyhow::{Context, Result};
use azdo_core::build::{expand_build_definition, validate_build_definition};
use azdo_core::domain::build::BuildDefinitionModel;
use azdo_core::domain::release::ReleaseDefinitionModel;
use azdo_core::release::{expand_release_definition, validate_release_definition};
use azdo_core::{TaskRegistry, ValidationError};
use azdo_provider::{Provider, ProviderError};
use clap::ValueEnum;
use colored::*;
use serde_json::Value;

use super::{print_json, read_json};

/// Definition kinds understood by `expand`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DefinitionKind {
    Build,
    Release,
}

/// Print the wire object a model expands to
pub fn expand_definition(kind: DefinitionKind, file: &str) -> Result<()> {
    let model = read_json(file)?;

    match expand(kind, model, &TaskRegistry::default()) {
        Ok(wire) => print_json(&wire),
        Err(e) => {
            if let Some(ProviderError::Validation(errors)) = e.downcast_ref::<ProviderError>() {
                for error in errors {
                    eprintln!("  {} {}: {}", "✗".red(), error.field.bold(), error.message);
                }
            }
            Err(e)
        }
    }
}

fn expand(kind: DefinitionKind, model: Value, registry: &TaskRegistry) -> Result<Value> {
    match kind {
        DefinitionKind::Build => {
            let model: BuildDefinitionModel =
                serde_json::from_value(model).context("Invalid build definition")?;
            ensure_valid(validate_build_definition(&model))?;
            Ok(serde_json::to_value(expand_build_definition(&model, None)?)?)
        }
        DefinitionKind::Release => {
            let model: ReleaseDefinitionModel =
                serde_json::from_value(model).context("Invalid release definition")?;
            ensure_valid(validate_release_definition(&model, registry))?;
            Ok(serde_json::to_value(expand_release_definition(
                &model, None, registry,
            )?)?)
        }
    }
}

fn ensure_valid(errors: Vec<ValidationError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ProviderError::Validation(errors).into())
    }
}

/// Print state upgraded from `from_version`
pub fn migrate_state(provider: &Provider, resource_type: &str, from_version: u32, file: &str) -> Result<()> {
    let state = read_json(file)?;
    let target = provider.schema_version(resource_type)?;

    let upgraded = provider
        .upgrade_state(resource_type, state, from_version)
        .with_context(|| format!("Failed to upgrade {} state", resource_type))?;

    eprintln!(
        "{} {} v{} -> v{}",
        "✓ Migrated".green().bold(),
        resource_type,
        from_version,
        target
    );
    print_json(&upgraded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use azdo_core::domain::build::RepositoryBlock;
    use azdo_core::domain::release::{AgentJob, Job, Stage, WorkflowTaskModel};
    use azdo_core::repository::RepoType;

    const PROJECT: &str = "4a3b6f7e-22a4-4a9e-8c1b-5d8e2f1a9b30";

    fn release_model(task: &str) -> Value {
        let mut job = AgentJob::hosted("Run", 9, "ubuntu-latest");
        job.task = vec![WorkflowTaskModel::new(task).with_input("script", "echo deploy")];
        let mut stage = Stage::new("dev");
        stage.job = vec![Job::Agent(job)];
        let mut model = ReleaseDefinitionModel::new(PROJECT, "webapp-release");
        model.stage = vec![stage];
        serde_json::to_value(model).unwrap()
    }

    #[test]
    fn test_expand_build_definition() {
        let model = BuildDefinitionModel::new(PROJECT, "webapp-ci").with_repository(
            RepositoryBlock::new(RepoType::GitHub, "contoso/webapp", "azure-pipelines.yml"),
        );

        let wire = expand(
            DefinitionKind::Build,
            serde_json::to_value(model).unwrap(),
            &TaskRegistry::default(),
        )
        .unwrap();

        assert_eq!(wire["name"], "webapp-ci");
        assert_eq!(wire["repository"]["type"], "GitHub");
        assert!(wire.get("id").is_none_or(Value::is_null));
    }

    #[test]
    fn test_expand_release_definition() {
        let wire = expand(
            DefinitionKind::Release,
            release_model("CmdLine@2.*"),
            &TaskRegistry::default(),
        )
        .unwrap();

        assert_eq!(wire["name"], "webapp-release");
        assert_eq!(wire["environments"][0]["name"], "dev");
    }

    #[test]
    fn test_expand_reports_validation_errors() {
        let err = expand(
            DefinitionKind::Release,
            release_model("NoSuchTask@1"),
            &TaskRegistry::default(),
        )
        .unwrap_err();

        let errors = err
            .downcast_ref::<ProviderError>()
            .map(ProviderError::validation_errors)
            .unwrap_or_default();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "stage.0.job.0.task.0.task");
    }

    #[test]
    fn test_expand_rejects_malformed_model() {
        let err = expand(
            DefinitionKind::Build,
            serde_json::json!({"name": 7}),
            &TaskRegistry::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid build definition"));
    }
}
