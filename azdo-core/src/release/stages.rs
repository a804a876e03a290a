//! Stage (environment) codec

use super::approvals::{
    expand_approvals, expand_gates, flatten_approval_options, flatten_approvals, flatten_gates,
};
use super::conditions::{decode_conditions, encode_conditions};
use super::phases::{decode_phase, encode_phase, validate_job};
use super::properties::{decode_stage_properties, encode_stage_properties};
use super::tasks::{expand_tasks, flatten_tasks};
use crate::days::{encode_days, parse_days_value};
use crate::domain::release::{
    DeployStep, EnvironmentOptionsBlock, EnvironmentTriggerBlock, ExecutionPolicy, RetentionPolicy,
    Stage, StageSchedule,
};
use crate::error::{DefinitionError, Result, ValidationError, ValidationKind};
use crate::prior::PriorState;
use crate::task::TaskRegistry;
use crate::variables::{expand_variables, flatten_variables, normalize_group_ids, validate_variables};
use crate::wire::IdentityRef;
use crate::wire::release::{
    ApprovalExecutionOrder, EnvironmentExecutionPolicy, EnvironmentOptions,
    EnvironmentRetentionPolicy, EnvironmentTrigger, ReleaseDefinitionDeployStep,
    ReleaseDefinitionEnvironment, ReleaseSchedule,
};
use serde_json::Value;
use uuid::Uuid;

/// Collect every rule violation inside a stage
///
/// Field paths are relative to the stage.
pub fn validate_stage(stage: &Stage, registry: &TaskRegistry) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !stage.after_stage.is_empty() && stage.after_release.is_some() {
        errors.push(ValidationError::new(
            ValidationKind::ConflictingBlocks,
            "after_stage",
            "only one of after_stage or after_release can be set",
        ));
    }

    if let Err(e) = validate_variables("variable", &stage.variable) {
        errors.push(e);
    }

    for (i, job) in stage.job.iter().enumerate() {
        let field = format!("job.{}", i);
        errors.extend(validate_job(job).into_iter().map(|e| e.within(&field)));
        if let Err(e) = expand_tasks(job.tasks(), registry) {
            errors.push(e.within(&field));
        }
    }

    if let Some(step) = &stage.deploy_step {
        if let Err(e) = expand_tasks(&step.task, registry) {
            errors.push(e.within("deploy_step"));
        }
    }

    for (name, block) in [
        ("pre_deploy_gate", &stage.pre_deploy_gate),
        ("post_deploy_gate", &stage.post_deploy_gate),
    ] {
        let Some(block) = block else { continue };
        for (i, gate) in block.gate.iter().enumerate() {
            if let Err(e) = expand_tasks(&gate.task, registry) {
                errors.push(e.within(&format!("{}.gate.{}", name, i)));
            }
        }
    }

    errors
}

/// Expand a stage at 1-based `rank`
pub fn expand_stage(
    stage: &Stage,
    rank: i32,
    registry: &TaskRegistry,
) -> std::result::Result<ReleaseDefinitionEnvironment, ValidationError> {
    let variables = expand_variables("variable", &stage.variable)?;

    let deploy_phases = stage
        .job
        .iter()
        .enumerate()
        .map(|(i, job)| {
            encode_phase(job, i as i32 + 1, registry).map_err(|e| e.within(&format!("job.{}", i)))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let deploy_step = match &stage.deploy_step {
        Some(step) => ReleaseDefinitionDeployStep {
            id: (step.id != 0).then_some(step.id),
            tasks: Some(expand_tasks(&step.task, registry).map_err(|e| e.within("deploy_step"))?),
        },
        None => ReleaseDefinitionDeployStep {
            id: None,
            tasks: Some(Vec::new()),
        },
    };

    let conditions = encode_conditions(
        &stage.after_stage,
        stage.after_release.as_ref(),
        &stage.artifact_filter,
    )
    .map_err(|e| ValidationError::new(ValidationKind::ConflictingBlocks, "artifact_filter", e.to_string()))?;

    let retention = stage.retention_policy.unwrap_or_default();
    let options = stage.environment_options.unwrap_or_default();
    let execution = stage.execution_policy.unwrap_or_default();

    Ok(ReleaseDefinitionEnvironment {
        id: (stage.id != 0).then_some(stage.id),
        name: Some(stage.name.clone()),
        rank: Some(rank),
        owner: (!stage.owner_id.is_empty()).then(|| IdentityRef::with_id(stage.owner_id.clone())),
        variables: Some(variables),
        variable_groups: Some(normalize_group_ids(&stage.variable_groups)),
        pre_deploy_approvals: Some(expand_approvals(
            stage.pre_deploy_approval.as_ref(),
            stage.approval_options.as_ref(),
            ApprovalExecutionOrder::BeforeGates,
        )),
        post_deploy_approvals: Some(expand_approvals(
            stage.post_deploy_approval.as_ref(),
            stage.approval_options.as_ref(),
            ApprovalExecutionOrder::AfterSuccessfulGates,
        )),
        deploy_step: Some(deploy_step),
        deploy_phases: Some(deploy_phases),
        retention_policy: Some(EnvironmentRetentionPolicy {
            days_to_keep: Some(retention.days_to_keep),
            releases_to_keep: Some(retention.releases_to_keep),
            retain_build: Some(retention.retain_build),
        }),
        environment_options: Some(EnvironmentOptions {
            auto_link_work_items: Some(options.auto_link_work_items),
            badge_enabled: Some(options.badge_enabled),
            publish_deployment_status: Some(options.publish_deployment_status),
            pull_request_deployment_enabled: Some(options.pull_request_deployment_enabled),
        }),
        execution_policy: Some(EnvironmentExecutionPolicy {
            concurrency_count: Some(execution.concurrency_count),
            queue_depth_count: Some(execution.queue_depth_count),
        }),
        schedules: Some(stage.schedules.iter().map(expand_schedule).collect()),
        environment_triggers: Some(stage.environment_triggers.iter().map(expand_environment_trigger).collect()),
        conditions: Some(conditions),
        pre_deployment_gates: Some(
            expand_gates(stage.pre_deploy_gate.as_ref(), registry).map_err(|e| e.within("pre_deploy_gate"))?,
        ),
        post_deployment_gates: Some(
            expand_gates(stage.post_deploy_gate.as_ref(), registry)
                .map_err(|e| e.within("post_deploy_gate"))?,
        ),
        properties: stage.properties.as_ref().map(encode_stage_properties),
        badge_url: None,
    })
}

fn expand_schedule(schedule: &StageSchedule) -> ReleaseSchedule {
    ReleaseSchedule {
        days_to_release: Some(Value::from(encode_days(&schedule.days_to_release))),
        job_id: Uuid::parse_str(&schedule.job_id).ok(),
        schedule_only_with_changes: Some(schedule.schedule_only_with_changes),
        start_hours: Some(schedule.start_hours),
        start_minutes: Some(schedule.start_minutes),
        time_zone_id: Some(schedule.time_zone_id.clone()),
    }
}

fn expand_environment_trigger(trigger: &EnvironmentTriggerBlock) -> EnvironmentTrigger {
    EnvironmentTrigger {
        definition_environment_id: Some(trigger.definition_environment_id),
        release_definition_id: Some(trigger.release_definition_id),
        trigger_content: Some(trigger.trigger_content.clone()),
        trigger_type: Some(trigger.trigger_type.clone()),
    }
}

/// Read a stage back
///
/// `prior` must already be scoped to this stage so secret variables resolve
/// against `stage.<n>.variable`. Phases are ordered by their rank.
pub fn flatten_stage(
    environment: &ReleaseDefinitionEnvironment,
    prior: &dyn PriorState,
    registry: &TaskRegistry,
) -> Result<Stage> {
    let mut stage = Stage::new(environment.name.clone().unwrap_or_default());
    stage.id = environment.id.unwrap_or(0);
    stage.rank = environment.rank.unwrap_or(0);
    stage.owner_id = environment
        .owner
        .as_ref()
        .and_then(|o| o.id.clone())
        .unwrap_or_default();
    stage.variable = flatten_variables("variable", environment.variables.as_ref(), prior);
    stage.variable_groups = normalize_group_ids(environment.variable_groups.as_deref().unwrap_or_default());

    stage.pre_deploy_approval = flatten_approvals(environment.pre_deploy_approvals.as_ref());
    stage.post_deploy_approval = flatten_approvals(environment.post_deploy_approvals.as_ref());
    stage.approval_options = flatten_approval_options(
        environment.pre_deploy_approvals.as_ref(),
        environment.post_deploy_approvals.as_ref(),
    );

    stage.deploy_step = match &environment.deploy_step {
        Some(step) => {
            let task = flatten_tasks(step.tasks.as_ref(), registry)?;
            let id = step.id.unwrap_or(0);
            (id != 0 || !task.is_empty()).then_some(DeployStep { id, task })
        }
        None => None,
    };

    let mut phases = Vec::new();
    for phase in environment.deploy_phases.iter().flatten() {
        if let Some(decoded) = decode_phase(phase, registry)? {
            phases.push(decoded);
        }
    }
    phases.sort_by_key(|(rank, _)| *rank);
    stage.job = phases.into_iter().map(|(_, job)| job).collect();

    let retention = environment.retention_policy.clone().unwrap_or_default();
    let defaults = RetentionPolicy::default();
    stage.retention_policy = Some(RetentionPolicy {
        days_to_keep: retention.days_to_keep.unwrap_or(defaults.days_to_keep),
        releases_to_keep: retention.releases_to_keep.unwrap_or(defaults.releases_to_keep),
        retain_build: retention.retain_build.unwrap_or(defaults.retain_build),
    });

    let options = environment.environment_options.clone().unwrap_or_default();
    let defaults = EnvironmentOptionsBlock::default();
    stage.environment_options = Some(EnvironmentOptionsBlock {
        auto_link_work_items: options.auto_link_work_items.unwrap_or(defaults.auto_link_work_items),
        badge_enabled: options.badge_enabled.unwrap_or(defaults.badge_enabled),
        publish_deployment_status: options
            .publish_deployment_status
            .unwrap_or(defaults.publish_deployment_status),
        pull_request_deployment_enabled: options
            .pull_request_deployment_enabled
            .unwrap_or(defaults.pull_request_deployment_enabled),
    });

    let execution = environment.execution_policy.clone().unwrap_or_default();
    let defaults = ExecutionPolicy::default();
    stage.execution_policy = Some(ExecutionPolicy {
        concurrency_count: execution.concurrency_count.unwrap_or(defaults.concurrency_count),
        queue_depth_count: execution.queue_depth_count.unwrap_or(defaults.queue_depth_count),
    });

    stage.schedules = environment
        .schedules
        .iter()
        .flatten()
        .map(flatten_schedule)
        .collect::<Result<_>>()?;
    stage.environment_triggers = environment
        .environment_triggers
        .iter()
        .flatten()
        .map(|t| EnvironmentTriggerBlock {
            definition_environment_id: t.definition_environment_id.unwrap_or(0),
            release_definition_id: t.release_definition_id.unwrap_or(0),
            trigger_content: t.trigger_content.clone().unwrap_or_default(),
            trigger_type: t.trigger_type.clone().unwrap_or_default(),
        })
        .collect();

    let conditions = decode_conditions(environment.conditions.as_deref().unwrap_or_default())?;
    stage.after_stage = conditions.after_stage;
    stage.after_release = conditions.after_release;
    stage.artifact_filter = conditions.artifact_filter;

    stage.pre_deploy_gate = flatten_gates(environment.pre_deployment_gates.as_ref(), registry)?;
    stage.post_deploy_gate = flatten_gates(environment.post_deployment_gates.as_ref(), registry)?;
    stage.properties = decode_stage_properties(environment.properties.as_ref());
    stage.badge_url = environment.badge_url.clone().unwrap_or_default();

    Ok(stage)
}

fn flatten_schedule(schedule: &ReleaseSchedule) -> Result<StageSchedule> {
    let days_to_release = match &schedule.days_to_release {
        Some(value) => parse_days_value(value).ok_or_else(|| {
            DefinitionError::unexpected("release schedule", format!("invalid daysToRelease: {}", value))
        })?,
        None => Vec::new(),
    };

    Ok(StageSchedule {
        days_to_release,
        job_id: schedule.job_id.map(|id| id.to_string()).unwrap_or_default(),
        schedule_only_with_changes: schedule.schedule_only_with_changes.unwrap_or(false),
        start_hours: schedule.start_hours.unwrap_or(0),
        start_minutes: schedule.start_minutes.unwrap_or(0),
        time_zone_id: schedule.time_zone_id.clone().unwrap_or_default(),
    })
}
