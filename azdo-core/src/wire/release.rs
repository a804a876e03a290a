//! Release service wire objects

use super::{IdentityRef, VariableValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// A release definition as the service stores it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_name_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, VariableValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_groups: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environments: Option<Vec<ReleaseDefinitionEnvironment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<Artifact>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
}

/// A stage of a release definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDefinitionEnvironment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<IdentityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, VariableValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_groups: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_deploy_approvals: Option<ReleaseDefinitionApprovals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_deploy_approvals: Option<ReleaseDefinitionApprovals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_step: Option<ReleaseDefinitionDeployStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_phases: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_policy: Option<EnvironmentRetentionPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_options: Option<EnvironmentOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_policy: Option<EnvironmentExecutionPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedules: Option<Vec<ReleaseSchedule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_triggers: Option<Vec<EnvironmentTrigger>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_deployment_gates: Option<ReleaseDefinitionGatesStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_deployment_gates: Option<ReleaseDefinitionGatesStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDefinitionApprovals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approvals: Option<Vec<ReleaseDefinitionApprovalStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_options: Option<ApprovalOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDefinitionApprovalStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_automated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_notification_on: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver: Option<IdentityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_triggered_and_previous_environment_approved_can_be_skipped: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforce_identity_revalidation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_order: Option<ApprovalExecutionOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_creator_can_be_approver: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_approver_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_in_minutes: Option<i32>,
}

/// Whether approvals run before or after gates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApprovalExecutionOrder {
    BeforeGates,
    AfterSuccessfulGates,
    AfterGatesAlways,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDefinitionDeployStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<WorkflowTask>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDefinitionGatesStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gates: Option<Vec<ReleaseDefinitionGate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gates_options: Option<ReleaseDefinitionGatesOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDefinitionGate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<WorkflowTask>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDefinitionGatesOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_success_duration: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_interval: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stabilization_time: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i32>,
}

/// One task invocation inside a phase, deploy step or gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTask {
    pub task_id: Uuid,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_run: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on_error: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_in_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_inputs: Option<BTreeMap<String, String>>,
}

/// Stage start condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "ConditionType::undefined")]
    pub condition_type: ConditionType,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionType {
    Event,
    EnvironmentState,
    Artifact,
    #[serde(other)]
    Undefined,
}

impl ConditionType {
    fn undefined() -> Self {
        ConditionType::Undefined
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentRetentionPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_to_keep: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub releases_to_keep: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retain_build: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_link_work_items: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_deployment_status: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request_deployment_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentExecutionPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_depth_count: Option<i32>,
}

/// Scheduled deployment of a stage
///
/// `daysToRelease` is a bitmask on write; the service may echo the flags enum
/// name instead, so it is kept untyped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_to_release: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_only_with_changes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_hours: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_environment_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_definition_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<String>,
}

/// An artifact linked to a release definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_reference: Option<BTreeMap<String, ArtifactSourceReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_retained: Option<bool>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSourceReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ArtifactSourceReference {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }
}
