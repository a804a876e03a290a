//! Release definition codec
//!
//! Composes the stage, phase, approval, condition, artifact and property
//! codecs into a full [`ReleaseDefinition`].
//!
//! Normalizations applied by a round trip:
//! - stage ranks are recomputed as dense 1..N positions
//! - retention, environment option and execution policy blocks always read back
//! - automated approvals read back as absent
//! - empty task map values are dropped
//! - `properties` always read back, with defaults for absent keys

pub mod approvals;
pub mod artifacts;
pub mod conditions;
pub mod phases;
pub mod properties;
pub mod stages;
pub mod tasks;

use crate::convert::string_or;
use crate::domain::release::{
    DEFAULT_RELEASE_NAME_FORMAT, ReleaseDefinitionModel, ReleaseTrigger,
};
use crate::error::{Result, ValidationError};
use crate::prior::{PriorState, Scoped};
use crate::task::TaskRegistry;
use crate::validate::validate_path;
use crate::variables::{expand_variables, flatten_variables, normalize_group_ids, validate_variables};
use crate::wire::release::ReleaseDefinition;
use artifacts::{expand_artifact, flatten_artifact};
use properties::{decode_release_properties, encode_release_properties};
use serde_json::{Value, json};
use stages::{expand_stage, flatten_stage, validate_stage};

/// Collect every rule violation, with field paths from the definition root
pub fn validate_release_definition(
    model: &ReleaseDefinitionModel,
    registry: &TaskRegistry,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Err(e) = validate_path("path", &model.path) {
        errors.push(e);
    }
    if let Err(e) = validate_variables("variable", &model.variable) {
        errors.push(e);
    }
    for (i, stage) in model.stage.iter().enumerate() {
        let field = format!("stage.{}", i);
        errors.extend(
            validate_stage(stage, registry)
                .into_iter()
                .map(|e| e.within(&field)),
        );
    }

    errors
}

/// Build the service object for a model
///
/// `id` is the existing definition id on update, `None` on create. Fields the
/// service assigns are never sent.
pub fn expand_release_definition(
    model: &ReleaseDefinitionModel,
    id: Option<i32>,
    registry: &TaskRegistry,
) -> Result<ReleaseDefinition> {
    if let Some(error) = validate_release_definition(model, registry).into_iter().next() {
        return Err(error.into());
    }

    let environments = model
        .stage
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            expand_stage(stage, i as i32 + 1, registry).map_err(|e| e.within(&format!("stage.{}", i)))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let release_name_format = if model.release_name_format.is_empty() {
        DEFAULT_RELEASE_NAME_FORMAT.to_string()
    } else {
        model.release_name_format.clone()
    };

    Ok(ReleaseDefinition {
        id,
        name: Some(model.name.clone()),
        path: Some(model.path.clone()),
        revision: model.revision,
        description: Some(model.description.clone()),
        release_name_format: Some(release_name_format),
        comment: Some(model.comment.clone()),
        tags: Some(model.tags.clone()),
        variables: Some(expand_variables("variable", &model.variable)?),
        variable_groups: Some(normalize_group_ids(&model.variable_groups)),
        environments: Some(environments),
        artifacts: Some(model.build_artifact.iter().map(expand_artifact).collect()),
        triggers: Some(
            model
                .triggers
                .iter()
                .map(|t| json!({"triggerType": t.trigger_type}))
                .collect(),
        ),
        properties: Some(encode_release_properties(
            &model.properties.clone().unwrap_or_default(),
        )),
        ..Default::default()
    })
}

/// Read a service object back into the model
///
/// The service does not echo the project, so the caller passes it in. Stages
/// are ordered by rank; secret variables resolve against `prior` at
/// `variable` and `stage.<n>.variable`.
pub fn flatten_release_definition(
    project_id: &str,
    definition: &ReleaseDefinition,
    prior: &dyn PriorState,
    registry: &TaskRegistry,
) -> Result<ReleaseDefinitionModel> {
    let mut model = ReleaseDefinitionModel::new(project_id, definition.name.clone().unwrap_or_default());
    model.path = definition.path.clone().unwrap_or_else(|| "\\".to_string());
    model.revision = definition.revision;
    model.description = definition.description.clone().unwrap_or_default();
    model.release_name_format = definition
        .release_name_format
        .clone()
        .unwrap_or_else(|| DEFAULT_RELEASE_NAME_FORMAT.to_string());
    model.tags = definition.tags.clone().unwrap_or_default();
    model.comment = definition.comment.clone().unwrap_or_default();
    model.variable = flatten_variables("variable", definition.variables.as_ref(), prior);
    model.variable_groups = normalize_group_ids(definition.variable_groups.as_deref().unwrap_or_default());
    model.properties = Some(decode_release_properties(definition.properties.as_ref()));

    let mut environments: Vec<_> = definition.environments.iter().flatten().collect();
    environments.sort_by_key(|e| e.rank.unwrap_or(0));
    model.stage = environments
        .into_iter()
        .enumerate()
        .map(|(i, environment)| {
            let scoped = Scoped::new(prior, format!("stage.{}", i));
            flatten_stage(environment, &scoped, registry)
        })
        .collect::<Result<_>>()?;

    model.build_artifact = definition
        .artifacts
        .iter()
        .flatten()
        .filter_map(flatten_artifact)
        .collect();
    model.triggers = definition
        .triggers
        .iter()
        .flatten()
        .map(|t| ReleaseTrigger {
            trigger_type: trigger_type_name(t),
        })
        .collect();

    model.source = definition.source.clone().unwrap_or_default();
    model.url = definition.url.clone().unwrap_or_default();
    model.is_deleted = definition.is_deleted.unwrap_or(false);
    model.created_on = definition.created_on;
    model.modified_on = definition.modified_on;

    Ok(model)
}

/// `triggerType` may come back as its name or its numeric value
fn trigger_type_name(trigger: &Value) -> String {
    match trigger.get("triggerType") {
        Some(Value::Number(n)) => n.to_string(),
        other => string_or(other, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::days::DayOfWeek;
    use crate::domain::release::{
        AfterStage, AgentJob, AgentlessJob, Approval, ApprovalOptionsBlock, ArtifactFilter,
        ArtifactFilterInclude, BuildArtifact, DeployApproval, EnvironmentOptionsBlock,
        EnvironmentType, ExecutionPolicy, Gate, GateBlock, Job, LatestVersion, ReleaseProperties,
        RetentionPolicy, Stage, StageProperties, StageSchedule, WorkflowTaskModel,
    };
    use crate::error::{DefinitionError, ValidationKind};
    use crate::prior::NoPriorState;
    use crate::variables::Variable;
    use std::collections::BTreeMap;

    const PROJECT: &str = "9f6c3cdd-6a1f-4d1e-9c3a-2c4f1b2a7e11";

    fn normalized_stage(name: &str, rank: i32) -> Stage {
        let mut stage = Stage::new(name);
        stage.rank = rank;
        stage.retention_policy = Some(RetentionPolicy::default());
        stage.environment_options = Some(EnvironmentOptionsBlock::default());
        stage.execution_policy = Some(ExecutionPolicy::default());
        stage
    }

    fn full_model() -> ReleaseDefinitionModel {
        let mut model = ReleaseDefinitionModel::new(PROJECT, "webapp");
        model.path = "\\apps".to_string();
        model.description = "Web app release".to_string();
        model.tags = vec!["web".to_string()];
        model.variable = vec![Variable::new("region", "westeurope")];
        model.variable_groups = vec![3, 7];
        model.properties = Some(ReleaseProperties {
            integrate_boards_work_items: true,
            ..Default::default()
        });
        model.build_artifact = vec![BuildArtifact {
            project_id: PROJECT.to_string(),
            build_pipeline_id: "42".to_string(),
            alias: "webapp-ci".to_string(),
            is_primary: true,
            is_retained: false,
            latest: Some(LatestVersion {
                branch: "refs/heads/main".to_string(),
                tags: String::new(),
            }),
            specify: None,
        }];
        model.triggers = vec![ReleaseTrigger {
            trigger_type: "artifactSource".to_string(),
        }];

        let mut dev = normalized_stage("dev", 1);
        let mut deploy = AgentJob::hosted("deploy", 9, "ubuntu-22.04");
        deploy.task = vec![
            WorkflowTaskModel::new("AzureCLI@2")
                .with_input("scriptType", "bash")
                .with_input("inlineScript", "az webapp restart"),
        ];
        dev.job = vec![Job::Agent(deploy)];
        dev.artifact_filter = vec![ArtifactFilter {
            artifact_alias: "webapp-ci".to_string(),
            include: vec![ArtifactFilterInclude {
                branch_name: "refs/heads/main".to_string(),
                tags: Vec::new(),
            }],
            exclude: Vec::new(),
        }];
        dev.properties = Some(StageProperties {
            boards_environment_type: EnvironmentType::Development,
            link_boards_work_items: true,
            jira_environment_type: EnvironmentType::Unmapped,
            link_jira_work_items: false,
        });

        let mut prod = normalized_stage("prod", 2);
        prod.after_stage = vec![AfterStage {
            stage_name: "dev".to_string(),
            trigger_even_when_stages_partially_succeed: false,
        }];
        prod.pre_deploy_approval = Some(DeployApproval {
            approval: vec![Approval {
                id: 0,
                rank: 1,
                approver_id: "0d1c7a4e-3b5f-4c8a-9e2d-6f7a8b9c0d1e".to_string(),
            }],
            timeout_in_minutes: 1440,
        });
        prod.approval_options = Some(ApprovalOptionsBlock {
            required_approver_count: 1,
            ..Default::default()
        });
        prod.post_deploy_gate = Some(GateBlock {
            id: 0,
            gate: vec![Gate {
                task: vec![WorkflowTaskModel::new("InvokeRESTAPI@1").with_input("method", "GET")],
            }],
            gates_options: None,
        });
        prod.schedules = vec![StageSchedule {
            days_to_release: vec![DayOfWeek::Tue, DayOfWeek::Thu],
            job_id: String::new(),
            schedule_only_with_changes: false,
            start_hours: 22,
            start_minutes: 0,
            time_zone_id: "UTC".to_string(),
        }];
        let mut gate = AgentlessJob {
            name: "notify".to_string(),
            condition: "succeeded()".to_string(),
            timeout_in_minutes: 0,
            max_execution_time_in_minutes: 1,
            multi_configuration: None,
            override_inputs: BTreeMap::new(),
            task: Vec::new(),
        };
        gate.task.push(WorkflowTaskModel::new("Delay@1").with_input("delayForMinutes", "5"));
        prod.job = vec![Job::Agentless(gate)];

        model.stage = vec![dev, prod];
        model
    }

    #[test]
    fn test_round_trip() {
        let registry = TaskRegistry::default();
        let model = full_model();

        let definition = expand_release_definition(&model, None, &registry).unwrap();
        let flattened = flatten_release_definition(PROJECT, &definition, &NoPriorState, &registry).unwrap();
        assert_eq!(flattened, model);
    }

    #[test]
    fn test_stage_ranks_are_dense_positions() {
        let registry = TaskRegistry::default();
        let mut model = full_model();
        model.stage[0].rank = 7;
        model.stage[1].rank = 3;

        let definition = expand_release_definition(&model, Some(12), &registry).unwrap();
        assert_eq!(definition.id, Some(12));
        let ranks: Vec<_> = definition
            .environments
            .unwrap()
            .iter()
            .map(|e| e.rank)
            .collect();
        assert_eq!(ranks, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_flatten_sorts_stages_by_rank() {
        let registry = TaskRegistry::default();
        let mut definition = expand_release_definition(&full_model(), None, &registry).unwrap();
        definition.environments.as_mut().unwrap().reverse();

        let model = flatten_release_definition(PROJECT, &definition, &NoPriorState, &registry).unwrap();
        let names: Vec<_> = model.stage.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["dev", "prod"]);
    }

    #[test]
    fn test_server_fields_are_not_sent_but_read_back() {
        let registry = TaskRegistry::default();
        let mut model = full_model();
        model.source = "restApi".to_string();
        model.url = "https://vsrm.dev.azure.com/org/_apis/Release/definitions/1".to_string();

        let mut definition = expand_release_definition(&model, None, &registry).unwrap();
        assert_eq!(definition.source, None);
        assert_eq!(definition.url, None);

        definition.source = Some("restApi".to_string());
        let flattened = flatten_release_definition(PROJECT, &definition, &NoPriorState, &registry).unwrap();
        assert_eq!(flattened.source, "restApi");
    }

    #[test]
    fn test_validation_collects_nested_errors() {
        let registry = TaskRegistry::default();
        let mut model = full_model();
        model.path = "apps".to_string();
        model.stage[1].after_release = Some(Default::default());
        if let Job::Agentless(job) = &mut model.stage[1].job[0] {
            job.task[0].task = "Delay".to_string();
        }

        let errors = validate_release_definition(&model, &registry);
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["path", "stage.1.after_stage", "stage.1.job.0.task.0.task"]);
        assert_eq!(errors[0].kind, ValidationKind::PathMustStartWithBackslash);
        assert_eq!(errors[2].kind, ValidationKind::TaskFormatInvalid);

        let err = expand_release_definition(&model, None, &registry).unwrap_err();
        assert!(matches!(err, DefinitionError::Validation(_)));
    }

    #[test]
    fn test_stage_secret_recovered_from_prior_state() {
        let registry = TaskRegistry::default();
        let mut model = full_model();
        model.stage[1].variable = vec![Variable::secret("db_password", "hunter2")];

        let definition = expand_release_definition(&model, None, &registry).unwrap();
        let wire = &definition.environments.as_ref().unwrap()[1].variables.as_ref().unwrap()["db_password"];
        assert_eq!(wire.value.as_deref(), Some("hunter2"));

        let prior = serde_json::to_value(&model).unwrap();
        let flattened = flatten_release_definition(PROJECT, &definition, &prior, &registry).unwrap();
        assert_eq!(flattened.stage[1].variable[0].secret_value, "hunter2");
    }

    #[test]
    fn test_numeric_trigger_type() {
        assert_eq!(trigger_type_name(&json!({"triggerType": 1})), "1");
        assert_eq!(trigger_type_name(&json!({"triggerType": "artifactSource"})), "artifactSource");
    }
}
