//! Workflow task codec

use crate::domain::release::WorkflowTaskModel;
use crate::error::{Result, ValidationError};
use crate::task::TaskRegistry;
use crate::wire::release::WorkflowTask;
use std::collections::BTreeMap;

const DEFINITION_TYPE_TASK: &str = "task";

pub fn expand_task(
    task: &WorkflowTaskModel,
    registry: &TaskRegistry,
) -> std::result::Result<WorkflowTask, ValidationError> {
    let reference = registry.parse_task(&task.task)?;

    Ok(WorkflowTask {
        task_id: reference.task_id,
        version: reference.version,
        name: Some(task.display_name.clone()),
        ref_name: None,
        definition_type: Some(DEFINITION_TYPE_TASK.to_string()),
        enabled: Some(task.enabled),
        always_run: Some(task.always_run),
        continue_on_error: Some(task.continue_on_error),
        timeout_in_minutes: Some(task.timeout_in_minutes),
        condition: Some(task.condition.clone()),
        inputs: Some(task.inputs.clone()),
        environment: Some(task.environment.clone()),
        override_inputs: Some(task.override_inputs.clone()),
    })
}

/// Expand a task list; errors name the failing entry, e.g. `task.2.task`
pub fn expand_tasks(
    tasks: &[WorkflowTaskModel],
    registry: &TaskRegistry,
) -> std::result::Result<Vec<WorkflowTask>, ValidationError> {
    tasks
        .iter()
        .enumerate()
        .map(|(i, task)| expand_task(task, registry).map_err(|e| e.within(&format!("task.{}", i))))
        .collect()
}

/// Read a task back; map entries with empty values are dropped
pub fn flatten_task(task: &WorkflowTask, registry: &TaskRegistry) -> Result<WorkflowTaskModel> {
    Ok(WorkflowTaskModel {
        task: registry.render_task(&task.task_id, &task.version),
        display_name: task.name.clone().unwrap_or_default(),
        inputs: non_empty(task.inputs.as_ref()),
        environment: non_empty(task.environment.as_ref()),
        override_inputs: non_empty(task.override_inputs.as_ref()),
        condition: task
            .condition
            .clone()
            .unwrap_or_else(|| crate::domain::release::DEFAULT_CONDITION.to_string()),
        always_run: task.always_run.unwrap_or(false),
        continue_on_error: task.continue_on_error.unwrap_or(false),
        enabled: task.enabled.unwrap_or(true),
        timeout_in_minutes: task.timeout_in_minutes.unwrap_or(0),
    })
}

pub fn flatten_tasks(tasks: Option<&Vec<WorkflowTask>>, registry: &TaskRegistry) -> Result<Vec<WorkflowTaskModel>> {
    tasks
        .into_iter()
        .flatten()
        .map(|task| flatten_task(task, registry))
        .collect()
}

fn non_empty(map: Option<&BTreeMap<String, String>>) -> BTreeMap<String, String> {
    map.into_iter()
        .flatten()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationKind;

    #[test]
    fn test_task_round_trip() {
        let registry = TaskRegistry::default();
        let mut task = WorkflowTaskModel::new("PowerShell@2").with_input("script", "Write-Host hi");
        task.display_name = "Say hi".to_string();
        task.timeout_in_minutes = 5;

        let wire = expand_task(&task, &registry).unwrap();
        assert_eq!(wire.version, "2");
        assert_eq!(wire.definition_type.as_deref(), Some("task"));
        assert_eq!(flatten_task(&wire, &registry).unwrap(), task);
    }

    #[test]
    fn test_flatten_drops_empty_inputs() {
        let registry = TaskRegistry::default();
        let task = WorkflowTaskModel::new("PowerShell@2")
            .with_input("script", "x")
            .with_input("workingDirectory", "");
        let wire = expand_task(&task, &registry).unwrap();
        let flattened = flatten_task(&wire, &registry).unwrap();
        assert_eq!(flattened.inputs.len(), 1);
    }

    #[test]
    fn test_expand_tasks_reports_position() {
        let registry = TaskRegistry::default();
        let tasks = vec![
            WorkflowTaskModel::new("PowerShell@2"),
            WorkflowTaskModel::new("NoSuchTask@1"),
        ];
        let err = expand_tasks(&tasks, &registry).unwrap_err();
        assert_eq!(err.kind, ValidationKind::UnknownTask);
        assert_eq!(err.field, "task.1.task");
    }

    #[test]
    fn test_flatten_unregistered_task_keeps_its_id() {
        let registry = TaskRegistry::default();
        let wire = expand_task(&WorkflowTaskModel::new("PowerShell@2"), &registry).unwrap();

        let flattened = flatten_task(&wire, &TaskRegistry::empty()).unwrap();
        assert_eq!(flattened.task, "e213ff0f-5d5c-4791-802d-52ea3e7be1f1@2");

        let again = expand_task(&flattened, &TaskRegistry::empty()).unwrap();
        assert_eq!(again.task_id, wire.task_id);
    }
}
