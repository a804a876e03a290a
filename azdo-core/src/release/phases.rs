//! Deploy phase codec
//!
//! A stage's `deployPhases` is a list of maps discriminated by `phaseType`:
//!
//! | phaseType | job kind |
//! |---|---|
//! | `agentBasedDeployment` | [`Job::Agent`] |
//! | `machineGroupBasedDeployment` | [`Job::DeploymentGroup`] |
//! | `runOnServer` | [`Job::Agentless`] |
//!
//! Every phase carries `name`, `rank`, `workflowTasks` and a kind-specific
//! `deploymentInput`.

use super::tasks::{expand_tasks, flatten_tasks};
use crate::convert::{bool_or, int32_or, string_list, string_or};
use crate::domain::release::{
    AgentJob, AgentlessJob, AgentlessMultiConfiguration, ArtifactDownload, DEFAULT_CONDITION,
    Demand, DeploymentGroupJob, HostedAgentPool, Job, MultiAgent, MultiConfiguration,
    MultipleTargets, PrivateAgentPool,
};
use crate::error::{DefinitionError, Result, ValidationError, ValidationKind};
use crate::task::TaskRegistry;
use crate::wire::release::WorkflowTask;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

pub const AGENT_BASED_DEPLOYMENT: &str = "agentBasedDeployment";
pub const MACHINE_GROUP_BASED_DEPLOYMENT: &str = "machineGroupBasedDeployment";
pub const RUN_ON_SERVER: &str = "runOnServer";

const PARALLEL_NONE: &str = "none";
const PARALLEL_MULTI_CONFIGURATION: &str = "multiConfiguration";
const PARALLEL_MULTI_MACHINE: &str = "multiMachine";

const HEALTH_ONE_TARGET_AT_A_TIME: &str = "OneTargetAtATime";
const HEALTH_CUSTOM: &str = "Custom";

const DEMAND_EQUALS: &str = " -equals ";
const ARTIFACT_TYPE_BUILD: &str = "Build";

/// Check the sibling-block rules of a job
pub fn validate_job(job: &Job) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Job::Agent(agent) = job {
        match (
            agent.agent_pool_hosted_azure_pipelines.is_some(),
            agent.agent_pool_private.is_some(),
        ) {
            (true, true) => errors.push(ValidationError::new(
                ValidationKind::ConflictingBlocks,
                "agent",
                "only one of agent_pool_hosted_azure_pipelines or agent_pool_private can be set",
            )),
            (false, false) => errors.push(ValidationError::new(
                ValidationKind::ConflictingBlocks,
                "agent",
                "one of agent_pool_hosted_azure_pipelines or agent_pool_private is required",
            )),
            _ => {}
        }

        if agent.multi_configuration.is_some() && agent.multi_agent.is_some() {
            errors.push(ValidationError::new(
                ValidationKind::ConflictingBlocks,
                "agent",
                "only one of multi_configuration or multi_agent can be set",
            ));
        }
    }

    errors
}

/// Encode a job as the phase at 1-based `rank`
pub fn encode_phase(
    job: &Job,
    rank: i32,
    registry: &TaskRegistry,
) -> std::result::Result<Value, ValidationError> {
    let (phase_type, deployment_input, tasks) = match job {
        Job::Agent(agent) => (AGENT_BASED_DEPLOYMENT, encode_agent_input(agent), &agent.task),
        Job::DeploymentGroup(group) => (
            MACHINE_GROUP_BASED_DEPLOYMENT,
            encode_deployment_group_input(group),
            &group.task,
        ),
        Job::Agentless(agentless) => (RUN_ON_SERVER, encode_agentless_input(agentless), &agentless.task),
    };
    let workflow_tasks = expand_tasks(tasks, registry)?;

    Ok(json!({
        "deploymentInput": deployment_input,
        "name": job.name(),
        "phaseType": phase_type,
        "rank": rank,
        "workflowTasks": workflow_tasks,
    }))
}

/// Decode a phase into `(rank, job)`
///
/// Returns `Ok(None)` for phase types without a job counterpart.
pub fn decode_phase(value: &Value, registry: &TaskRegistry) -> Result<Option<(i32, Job)>> {
    let phase_type = string_or(value.get("phaseType"), "");
    let rank = int32_or(value.get("rank"), 0);
    let name = string_or(value.get("name"), "");
    let input = value.get("deploymentInput").cloned().unwrap_or(Value::Null);

    let tasks: Option<Vec<WorkflowTask>> = match value.get("workflowTasks") {
        Some(Value::Null) | None => None,
        Some(tasks) => Some(
            serde_json::from_value(tasks.clone())
                .map_err(|e| DefinitionError::malformed("workflowTasks", e))?,
        ),
    };
    let task = flatten_tasks(tasks.as_ref(), registry)?;

    let job = if phase_type.eq_ignore_ascii_case(AGENT_BASED_DEPLOYMENT) {
        Job::Agent(decode_agent_input(name, &input, task))
    } else if phase_type.eq_ignore_ascii_case(MACHINE_GROUP_BASED_DEPLOYMENT) {
        Job::DeploymentGroup(decode_deployment_group_input(name, &input, task))
    } else if phase_type.eq_ignore_ascii_case(RUN_ON_SERVER) {
        Job::Agentless(decode_agentless_input(name, &input, task))
    } else {
        return Ok(None);
    };

    Ok(Some((rank, job)))
}

// ============================================================================
// Shared pieces
// ============================================================================

fn base_input(
    condition: &str,
    timeout_in_minutes: i32,
    max_execution_time_in_minutes: i32,
    override_inputs: &BTreeMap<String, String>,
) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("condition".into(), json!(condition));
    map.insert("jobCancelTimeoutInMinutes".into(), json!(max_execution_time_in_minutes));
    map.insert("timeoutInMinutes".into(), json!(timeout_in_minutes));
    if !override_inputs.is_empty() {
        map.insert("overrideInputs".into(), json!(override_inputs));
    }
    map
}

fn read_override_inputs(input: &Value) -> BTreeMap<String, String> {
    input
        .get("overrideInputs")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn encode_demand(demand: &Demand) -> String {
    if demand.value.is_empty() {
        demand.name.clone()
    } else {
        format!("{}{}{}", demand.name, DEMAND_EQUALS, demand.value)
    }
}

fn decode_demand(demand: &str) -> Demand {
    match demand.split_once(DEMAND_EQUALS.trim()) {
        Some((name, value)) => Demand {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
        },
        None => Demand {
            name: demand.trim().to_string(),
            value: String::new(),
        },
    }
}

fn encode_download(download: &ArtifactDownload) -> Value {
    let (mode, items): (&str, Vec<String>) = match download.include.as_slice() {
        [] => ("Skip", Vec::new()),
        [only] if only == "*" => ("All", Vec::new()),
        items => ("Selective", items.to_vec()),
    };
    json!({
        "alias": download.artifact_alias,
        "artifactDownloadMode": mode,
        "artifactItems": items,
        "artifactType": ARTIFACT_TYPE_BUILD,
    })
}

fn decode_download(value: &Value) -> ArtifactDownload {
    let mode = string_or(value.get("artifactDownloadMode"), "");
    let include = if mode.eq_ignore_ascii_case("All") {
        vec!["*".to_string()]
    } else if mode.eq_ignore_ascii_case("Selective") {
        string_list(value.get("artifactItems"))
    } else {
        Vec::new()
    };
    ArtifactDownload {
        artifact_alias: string_or(value.get("alias"), ""),
        include,
    }
}

// ============================================================================
// Agent
// ============================================================================

fn encode_agent_input(agent: &AgentJob) -> Value {
    let mut map = base_input(
        &agent.condition,
        agent.timeout_in_minutes,
        agent.max_execution_time_in_minutes,
        &agent.override_inputs,
    );

    map.insert(
        "demands".into(),
        json!(agent.demand.iter().map(encode_demand).collect::<Vec<_>>()),
    );
    map.insert("enableAccessToken".into(), json!(agent.allow_scripts_to_access_oauth_token));
    map.insert("skipArtifactsDownload".into(), json!(agent.skip_artifacts_download));

    if let Some(hosted) = &agent.agent_pool_hosted_azure_pipelines {
        map.insert("queueId".into(), json!(hosted.agent_pool_id));
        map.insert(
            "agentSpecification".into(),
            json!({"identifier": hosted.agent_specification}),
        );
    } else if let Some(private) = &agent.agent_pool_private {
        map.insert("queueId".into(), json!(private.agent_pool_id));
    }

    let parallel = if let Some(multi) = &agent.multi_configuration {
        json!({
            "continueOnError": multi.continue_on_error,
            "maxNumberOfAgents": multi.number_of_agents,
            "multipliers": multi.multipliers,
            "parallelExecutionType": PARALLEL_MULTI_CONFIGURATION,
        })
    } else if let Some(multi) = &agent.multi_agent {
        json!({
            "continueOnError": multi.continue_on_error,
            "maxNumberOfAgents": multi.max_number_of_agents,
            "parallelExecutionType": PARALLEL_MULTI_MACHINE,
        })
    } else {
        json!({"parallelExecutionType": PARALLEL_NONE})
    };
    map.insert("parallelExecution".into(), parallel);

    map.insert(
        "artifactsDownloadInput".into(),
        json!({
            "downloadInputs": agent
                .build_artifact_download
                .iter()
                .map(encode_download)
                .collect::<Vec<_>>()
        }),
    );

    Value::Object(map)
}

fn decode_agent_input(name: String, input: &Value, task: Vec<crate::domain::release::WorkflowTaskModel>) -> AgentJob {
    let queue_id = int32_or(input.get("queueId"), 0);
    let specification = input
        .get("agentSpecification")
        .and_then(|s| s.get("identifier"))
        .and_then(Value::as_str);

    let (hosted, private) = match specification {
        Some(identifier) => (
            Some(HostedAgentPool {
                agent_pool_id: queue_id,
                agent_specification: identifier.to_string(),
            }),
            None,
        ),
        None => (None, Some(PrivateAgentPool { agent_pool_id: queue_id })),
    };

    let parallel = input.get("parallelExecution");
    let parallel_type = string_or(parallel.and_then(|p| p.get("parallelExecutionType")), PARALLEL_NONE);
    let continue_on_error = bool_or(parallel.and_then(|p| p.get("continueOnError")), false);
    let max_agents = int32_or(parallel.and_then(|p| p.get("maxNumberOfAgents")), 0);

    let (multi_configuration, multi_agent) = if parallel_type.eq_ignore_ascii_case(PARALLEL_MULTI_CONFIGURATION) {
        (
            Some(MultiConfiguration {
                multipliers: string_or(parallel.and_then(|p| p.get("multipliers")), ""),
                number_of_agents: max_agents,
                continue_on_error,
            }),
            None,
        )
    } else if parallel_type.eq_ignore_ascii_case(PARALLEL_MULTI_MACHINE) {
        (
            None,
            Some(MultiAgent {
                max_number_of_agents: max_agents,
                continue_on_error,
            }),
        )
    } else {
        (None, None)
    };

    let build_artifact_download = input
        .get("artifactsDownloadInput")
        .and_then(|d| d.get("downloadInputs"))
        .and_then(Value::as_array)
        .map(|downloads| downloads.iter().map(decode_download).collect())
        .unwrap_or_default();

    AgentJob {
        name,
        condition: string_or(input.get("condition"), DEFAULT_CONDITION),
        timeout_in_minutes: int32_or(input.get("timeoutInMinutes"), 0),
        max_execution_time_in_minutes: int32_or(input.get("jobCancelTimeoutInMinutes"), 1),
        demand: string_list(input.get("demands"))
            .iter()
            .map(|d| decode_demand(d))
            .collect(),
        agent_pool_hosted_azure_pipelines: hosted,
        agent_pool_private: private,
        build_artifact_download,
        multi_configuration,
        multi_agent,
        skip_artifacts_download: bool_or(input.get("skipArtifactsDownload"), false),
        allow_scripts_to_access_oauth_token: bool_or(input.get("enableAccessToken"), false),
        override_inputs: read_override_inputs(input),
        task,
    }
}

// ============================================================================
// Deployment group
// ============================================================================

fn encode_deployment_group_input(group: &DeploymentGroupJob) -> Value {
    let mut map = base_input(
        &group.condition,
        group.timeout_in_minutes,
        group.max_execution_time_in_minutes,
        &group.override_inputs,
    );

    map.insert("artifactsDownloadInput".into(), json!({}));
    map.insert("enableAccessToken".into(), json!(group.allow_scripts_to_access_oauth_token));
    map.insert("queueId".into(), json!(group.deployment_group_id));
    map.insert("skipArtifactsDownload".into(), json!(group.skip_artifacts_download));
    map.insert("tags".into(), json!(group.tags));

    match &group.multiple {
        Some(multiple) => {
            map.insert("deploymentHealthOption".into(), json!(HEALTH_CUSTOM));
            map.insert("healthPercent".into(), json!(multiple.max_targets_in_parallel));
        }
        None => {
            map.insert("deploymentHealthOption".into(), json!(HEALTH_ONE_TARGET_AT_A_TIME));
        }
    }

    Value::Object(map)
}

fn decode_deployment_group_input(
    name: String,
    input: &Value,
    task: Vec<crate::domain::release::WorkflowTaskModel>,
) -> DeploymentGroupJob {
    let health = string_or(input.get("deploymentHealthOption"), HEALTH_ONE_TARGET_AT_A_TIME);
    let multiple = health.eq_ignore_ascii_case(HEALTH_CUSTOM).then(|| MultipleTargets {
        max_targets_in_parallel: int32_or(input.get("healthPercent"), 0),
    });

    DeploymentGroupJob {
        name,
        deployment_group_id: int32_or(input.get("queueId"), 0),
        condition: string_or(input.get("condition"), DEFAULT_CONDITION),
        timeout_in_minutes: int32_or(input.get("timeoutInMinutes"), 0),
        max_execution_time_in_minutes: int32_or(input.get("jobCancelTimeoutInMinutes"), 1),
        tags: string_list(input.get("tags")),
        multiple,
        skip_artifacts_download: bool_or(input.get("skipArtifactsDownload"), false),
        allow_scripts_to_access_oauth_token: bool_or(input.get("enableAccessToken"), false),
        override_inputs: read_override_inputs(input),
        task,
    }
}

// ============================================================================
// Agentless
// ============================================================================

fn encode_agentless_input(agentless: &AgentlessJob) -> Value {
    let mut map = base_input(
        &agentless.condition,
        agentless.timeout_in_minutes,
        agentless.max_execution_time_in_minutes,
        &agentless.override_inputs,
    );

    let parallel = match &agentless.multi_configuration {
        Some(multi) => json!({
            "continueOnError": multi.continue_on_error,
            "multipliers": multi.multipliers,
            "parallelExecutionType": PARALLEL_MULTI_CONFIGURATION,
        }),
        None => json!({"parallelExecutionType": PARALLEL_NONE}),
    };
    map.insert("parallelExecution".into(), parallel);

    Value::Object(map)
}

fn decode_agentless_input(
    name: String,
    input: &Value,
    task: Vec<crate::domain::release::WorkflowTaskModel>,
) -> AgentlessJob {
    let parallel = input.get("parallelExecution");
    let parallel_type = string_or(parallel.and_then(|p| p.get("parallelExecutionType")), PARALLEL_NONE);
    let multi_configuration = parallel_type
        .eq_ignore_ascii_case(PARALLEL_MULTI_CONFIGURATION)
        .then(|| AgentlessMultiConfiguration {
            multipliers: string_or(parallel.and_then(|p| p.get("multipliers")), ""),
            continue_on_error: bool_or(parallel.and_then(|p| p.get("continueOnError")), false),
        });

    AgentlessJob {
        name,
        condition: string_or(input.get("condition"), DEFAULT_CONDITION),
        timeout_in_minutes: int32_or(input.get("timeoutInMinutes"), 0),
        max_execution_time_in_minutes: int32_or(input.get("jobCancelTimeoutInMinutes"), 1),
        multi_configuration,
        override_inputs: read_override_inputs(input),
        task,
    }
}
