//! Release definition resource model

use crate::days::DayOfWeek;
use crate::variables::Variable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_RELEASE_NAME_FORMAT: &str = "Release-$(rev:r)";
pub const DEFAULT_CONDITION: &str = "succeeded()";
pub const DEFAULT_EVENT_NAME: &str = "ReleaseStarted";
pub const DEFAULT_CREATION_SOURCE: &str = "ReleaseNew";

fn default_true() -> bool {
    true
}

fn default_condition() -> String {
    DEFAULT_CONDITION.to_string()
}

fn default_max_execution_time() -> i32 {
    1
}

/// A classic release pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseDefinitionModel {
    pub project_id: String,
    pub name: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub revision: Option<i32>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_release_name_format")]
    pub release_name_format: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub variable: Vec<Variable>,
    #[serde(default)]
    pub variable_groups: Vec<i32>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub properties: Option<ReleaseProperties>,
    #[serde(default)]
    pub stage: Vec<Stage>,
    #[serde(default)]
    pub build_artifact: Vec<BuildArtifact>,
    #[serde(default)]
    pub triggers: Vec<ReleaseTrigger>,

    // Assigned by the service
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_on: Option<DateTime<Utc>>,
}

fn default_path() -> String {
    "\\".to_string()
}

fn default_release_name_format() -> String {
    DEFAULT_RELEASE_NAME_FORMAT.to_string()
}

impl ReleaseDefinitionModel {
    pub fn new(project_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            path: default_path(),
            revision: None,
            description: String::new(),
            release_name_format: default_release_name_format(),
            tags: Vec::new(),
            variable: Vec::new(),
            variable_groups: Vec::new(),
            comment: String::new(),
            properties: None,
            stage: Vec::new(),
            build_artifact: Vec::new(),
            triggers: Vec::new(),
            source: String::new(),
            url: String::new(),
            is_deleted: false,
            created_on: None,
            modified_on: None,
        }
    }
}

/// Definition-level work item integration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseProperties {
    #[serde(default = "default_creation_source")]
    pub definition_creation_source: String,
    #[serde(default)]
    pub integrate_jira_work_items: bool,
    #[serde(default)]
    pub integrate_boards_work_items: bool,
    #[serde(default)]
    pub jira_service_endpoint_id: String,
}

fn default_creation_source() -> String {
    DEFAULT_CREATION_SOURCE.to_string()
}

impl Default for ReleaseProperties {
    fn default() -> Self {
        Self {
            definition_creation_source: default_creation_source(),
            integrate_jira_work_items: false,
            integrate_boards_work_items: false,
            jira_service_endpoint_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseTrigger {
    pub trigger_type: String,
}

// ============================================================================
// Stage
// ============================================================================

/// One environment of a release pipeline
///
/// Stages are ordered; `rank` is the 1-based position and is recomputed on
/// every expand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub rank: i32,
    pub name: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub variable: Vec<Variable>,
    #[serde(default)]
    pub variable_groups: Vec<i32>,
    #[serde(default)]
    pub pre_deploy_approval: Option<DeployApproval>,
    #[serde(default)]
    pub post_deploy_approval: Option<DeployApproval>,
    #[serde(default)]
    pub approval_options: Option<ApprovalOptionsBlock>,
    #[serde(default)]
    pub deploy_step: Option<DeployStep>,
    #[serde(default)]
    pub job: Vec<Job>,
    #[serde(default)]
    pub retention_policy: Option<RetentionPolicy>,
    #[serde(default)]
    pub environment_options: Option<EnvironmentOptionsBlock>,
    #[serde(default)]
    pub execution_policy: Option<ExecutionPolicy>,
    #[serde(default)]
    pub schedules: Vec<StageSchedule>,
    #[serde(default)]
    pub environment_triggers: Vec<EnvironmentTriggerBlock>,
    #[serde(default)]
    pub after_stage: Vec<AfterStage>,
    #[serde(default)]
    pub after_release: Option<AfterRelease>,
    #[serde(default)]
    pub artifact_filter: Vec<ArtifactFilter>,
    #[serde(default)]
    pub pre_deploy_gate: Option<GateBlock>,
    #[serde(default)]
    pub post_deploy_gate: Option<GateBlock>,
    #[serde(default)]
    pub properties: Option<StageProperties>,
    /// Assigned by the service
    #[serde(default)]
    pub badge_url: String,
}

impl Stage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            rank: 0,
            name: name.into(),
            owner_id: String::new(),
            variable: Vec::new(),
            variable_groups: Vec::new(),
            pre_deploy_approval: None,
            post_deploy_approval: None,
            approval_options: None,
            deploy_step: None,
            job: Vec::new(),
            retention_policy: None,
            environment_options: None,
            execution_policy: None,
            schedules: Vec::new(),
            environment_triggers: Vec::new(),
            after_stage: Vec::new(),
            after_release: None,
            artifact_filter: Vec::new(),
            pre_deploy_gate: None,
            post_deploy_gate: None,
            properties: None,
            badge_url: String::new(),
        }
    }
}

/// Approvals required before or after deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployApproval {
    #[serde(default)]
    pub approval: Vec<Approval>,
    #[serde(default)]
    pub timeout_in_minutes: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub rank: i32,
    /// Identity that must approve; empty for an automated approval
    #[serde(default)]
    pub approver_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalOptionsBlock {
    #[serde(default)]
    pub auto_triggered_and_previous_environment_approved_can_be_skipped: bool,
    #[serde(default)]
    pub enforce_identity_revalidation: bool,
    #[serde(default)]
    pub release_creator_can_be_approver: bool,
    #[serde(default)]
    pub required_approver_count: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployStep {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub task: Vec<WorkflowTaskModel>,
}

/// Deployment gates: each gate is a list of tasks evaluated together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateBlock {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub gate: Vec<Gate>,
    #[serde(default)]
    pub gates_options: Option<GatesOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    #[serde(default)]
    pub task: Vec<WorkflowTaskModel>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatesOptions {
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub minimum_success_duration: i32,
    #[serde(default)]
    pub sampling_interval: i32,
    #[serde(default)]
    pub stabilization_time: i32,
    #[serde(default)]
    pub timeout: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    #[serde(default = "default_days_to_keep")]
    pub days_to_keep: i32,
    #[serde(default = "default_releases_to_keep")]
    pub releases_to_keep: i32,
    #[serde(default = "default_true")]
    pub retain_build: bool,
}

fn default_days_to_keep() -> i32 {
    30
}

fn default_releases_to_keep() -> i32 {
    3
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            days_to_keep: default_days_to_keep(),
            releases_to_keep: default_releases_to_keep(),
            retain_build: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentOptionsBlock {
    #[serde(default)]
    pub auto_link_work_items: bool,
    #[serde(default)]
    pub badge_enabled: bool,
    #[serde(default = "default_true")]
    pub publish_deployment_status: bool,
    #[serde(default)]
    pub pull_request_deployment_enabled: bool,
}

impl Default for EnvironmentOptionsBlock {
    fn default() -> Self {
        Self {
            auto_link_work_items: false,
            badge_enabled: false,
            publish_deployment_status: true,
            pull_request_deployment_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPolicy {
    #[serde(default = "default_concurrency")]
    pub concurrency_count: i32,
    #[serde(default)]
    pub queue_depth_count: i32,
}

fn default_concurrency() -> i32 {
    1
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            concurrency_count: 1,
            queue_depth_count: 0,
        }
    }
}

/// Scheduled deployment of a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSchedule {
    #[serde(default)]
    pub days_to_release: Vec<DayOfWeek>,
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub schedule_only_with_changes: bool,
    #[serde(default)]
    pub start_hours: i32,
    #[serde(default)]
    pub start_minutes: i32,
    #[serde(default)]
    pub time_zone_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentTriggerBlock {
    #[serde(default)]
    pub definition_environment_id: i32,
    #[serde(default)]
    pub release_definition_id: i32,
    #[serde(default)]
    pub trigger_content: String,
    #[serde(default)]
    pub trigger_type: String,
}

/// Start after other stages finish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AfterStage {
    pub stage_name: String,
    #[serde(default)]
    pub trigger_even_when_stages_partially_succeed: bool,
}

/// Start when the release is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AfterRelease {
    #[serde(default = "default_event_name")]
    pub event_name: String,
}

fn default_event_name() -> String {
    DEFAULT_EVENT_NAME.to_string()
}

impl Default for AfterRelease {
    fn default() -> Self {
        Self {
            event_name: default_event_name(),
        }
    }
}

/// Branch and tag filters on one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFilter {
    pub artifact_alias: String,
    #[serde(default)]
    pub include: Vec<ArtifactFilterInclude>,
    #[serde(default)]
    pub exclude: Vec<ArtifactFilterExclude>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFilterInclude {
    pub branch_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFilterExclude {
    pub branch_name: String,
}

/// Work item integration for one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProperties {
    #[serde(default)]
    pub boards_environment_type: EnvironmentType,
    #[serde(default)]
    pub link_boards_work_items: bool,
    #[serde(default)]
    pub jira_environment_type: EnvironmentType,
    #[serde(default)]
    pub link_jira_work_items: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentType {
    Production,
    Staging,
    Testing,
    Development,
    #[default]
    Unmapped,
}

impl EnvironmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Testing => "testing",
            Self::Development => "development",
            Self::Unmapped => "unmapped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "testing" => Some(Self::Testing),
            "development" => Some(Self::Development),
            "unmapped" => Some(Self::Unmapped),
            _ => None,
        }
    }
}

// ============================================================================
// Jobs
// ============================================================================

/// A deploy phase of a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Job {
    Agent(AgentJob),
    DeploymentGroup(DeploymentGroupJob),
    Agentless(AgentlessJob),
}

impl Job {
    pub fn name(&self) -> &str {
        match self {
            Job::Agent(job) => &job.name,
            Job::DeploymentGroup(job) => &job.name,
            Job::Agentless(job) => &job.name,
        }
    }

    pub fn tasks(&self) -> &[WorkflowTaskModel] {
        match self {
            Job::Agent(job) => &job.task,
            Job::DeploymentGroup(job) => &job.task,
            Job::Agentless(job) => &job.task,
        }
    }
}

/// Runs on an agent from a hosted or private pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentJob {
    pub name: String,
    #[serde(default = "default_condition")]
    pub condition: String,
    #[serde(default)]
    pub timeout_in_minutes: i32,
    #[serde(default = "default_max_execution_time")]
    pub max_execution_time_in_minutes: i32,
    #[serde(default)]
    pub demand: Vec<Demand>,
    #[serde(default)]
    pub agent_pool_hosted_azure_pipelines: Option<HostedAgentPool>,
    #[serde(default)]
    pub agent_pool_private: Option<PrivateAgentPool>,
    #[serde(default)]
    pub build_artifact_download: Vec<ArtifactDownload>,
    #[serde(default)]
    pub multi_configuration: Option<MultiConfiguration>,
    #[serde(default)]
    pub multi_agent: Option<MultiAgent>,
    #[serde(default)]
    pub skip_artifacts_download: bool,
    #[serde(default)]
    pub allow_scripts_to_access_oauth_token: bool,
    #[serde(default)]
    pub override_inputs: BTreeMap<String, String>,
    #[serde(default)]
    pub task: Vec<WorkflowTaskModel>,
}

impl AgentJob {
    pub fn hosted(name: impl Into<String>, agent_pool_id: i32, agent_specification: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: default_condition(),
            timeout_in_minutes: 0,
            max_execution_time_in_minutes: default_max_execution_time(),
            demand: Vec::new(),
            agent_pool_hosted_azure_pipelines: Some(HostedAgentPool {
                agent_pool_id,
                agent_specification: agent_specification.into(),
            }),
            agent_pool_private: None,
            build_artifact_download: Vec::new(),
            multi_configuration: None,
            multi_agent: None,
            skip_artifacts_download: false,
            allow_scripts_to_access_oauth_token: false,
            override_inputs: BTreeMap::new(),
            task: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedAgentPool {
    pub agent_pool_id: i32,
    pub agent_specification: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateAgentPool {
    pub agent_pool_id: i32,
}

/// Agent capability requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demand {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Artifacts to download before the job runs
///
/// `include = ["*"]` downloads everything, an empty list skips the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDownload {
    pub artifact_alias: String,
    #[serde(default)]
    pub include: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiConfiguration {
    pub multipliers: String,
    #[serde(default)]
    pub number_of_agents: i32,
    #[serde(default)]
    pub continue_on_error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiAgent {
    pub max_number_of_agents: i32,
    #[serde(default)]
    pub continue_on_error: bool,
}

/// Runs on the targets of a deployment group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentGroupJob {
    pub name: String,
    pub deployment_group_id: i32,
    #[serde(default = "default_condition")]
    pub condition: String,
    #[serde(default)]
    pub timeout_in_minutes: i32,
    #[serde(default = "default_max_execution_time")]
    pub max_execution_time_in_minutes: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub multiple: Option<MultipleTargets>,
    #[serde(default)]
    pub skip_artifacts_download: bool,
    #[serde(default)]
    pub allow_scripts_to_access_oauth_token: bool,
    #[serde(default)]
    pub override_inputs: BTreeMap<String, String>,
    #[serde(default)]
    pub task: Vec<WorkflowTaskModel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleTargets {
    pub max_targets_in_parallel: i32,
}

/// Runs on the server without an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentlessJob {
    pub name: String,
    #[serde(default = "default_condition")]
    pub condition: String,
    #[serde(default)]
    pub timeout_in_minutes: i32,
    #[serde(default = "default_max_execution_time")]
    pub max_execution_time_in_minutes: i32,
    #[serde(default)]
    pub multi_configuration: Option<AgentlessMultiConfiguration>,
    #[serde(default)]
    pub override_inputs: BTreeMap<String, String>,
    #[serde(default)]
    pub task: Vec<WorkflowTaskModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentlessMultiConfiguration {
    pub multipliers: String,
    #[serde(default)]
    pub continue_on_error: bool,
}

/// A task invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTaskModel {
    /// `name@version`
    pub task: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub override_inputs: BTreeMap<String, String>,
    #[serde(default = "default_condition")]
    pub condition: String,
    #[serde(default)]
    pub always_run: bool,
    #[serde(default)]
    pub continue_on_error: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub timeout_in_minutes: i32,
}

impl WorkflowTaskModel {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            display_name: String::new(),
            inputs: BTreeMap::new(),
            environment: BTreeMap::new(),
            override_inputs: BTreeMap::new(),
            condition: default_condition(),
            always_run: false,
            continue_on_error: false,
            enabled: true,
            timeout_in_minutes: 0,
        }
    }

    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Artifacts
// ============================================================================

/// A build pipeline whose output feeds the release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArtifact {
    pub project_id: String,
    pub build_pipeline_id: String,
    pub alias: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub is_retained: bool,
    #[serde(default)]
    pub latest: Option<LatestVersion>,
    #[serde(default)]
    pub specify: Option<SpecificVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestVersion {
    #[serde(default)]
    pub branch: String,
    /// Comma-separated build tags
    #[serde(default)]
    pub tags: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificVersion {
    #[serde(default)]
    pub version: String,
}
