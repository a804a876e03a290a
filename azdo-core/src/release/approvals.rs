//! Approval and gate codec

use super::tasks::{expand_tasks, flatten_tasks};
use crate::domain::release::{Approval, ApprovalOptionsBlock, DeployApproval, Gate, GateBlock, GatesOptions};
use crate::error::{Result, ValidationError};
use crate::task::TaskRegistry;
use crate::wire::IdentityRef;
use crate::wire::release::{
    ApprovalExecutionOrder, ApprovalOptions, ReleaseDefinitionApprovalStep,
    ReleaseDefinitionApprovals, ReleaseDefinitionGate, ReleaseDefinitionGatesOptions,
    ReleaseDefinitionGatesStep,
};

/// The step the service expects when nobody has to approve
fn automated_step() -> ReleaseDefinitionApprovalStep {
    ReleaseDefinitionApprovalStep {
        id: None,
        rank: Some(1),
        is_automated: Some(true),
        is_notification_on: Some(false),
        approver: None,
    }
}

/// Expand one side of a stage's approvals
///
/// Options are shared between both sides; `order` is the side's execution
/// order and the side's timeout is copied into its options.
pub fn expand_approvals(
    approval: Option<&DeployApproval>,
    options: Option<&ApprovalOptionsBlock>,
    order: ApprovalExecutionOrder,
) -> ReleaseDefinitionApprovals {
    let timeout_in_minutes = approval.map(|a| a.timeout_in_minutes).unwrap_or(0);

    let mut steps: Vec<_> = approval
        .map(|a| a.approval.as_slice())
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let automated = step.approver_id.is_empty();
            ReleaseDefinitionApprovalStep {
                id: (step.id != 0).then_some(step.id),
                rank: Some(i as i32 + 1),
                is_automated: Some(automated),
                is_notification_on: Some(false),
                approver: (!automated).then(|| IdentityRef::with_id(step.approver_id.clone())),
            }
        })
        .collect();
    if steps.is_empty() {
        steps.push(automated_step());
    }

    let approval_options = match options {
        Some(options) => Some(ApprovalOptions {
            auto_triggered_and_previous_environment_approved_can_be_skipped: Some(
                options.auto_triggered_and_previous_environment_approved_can_be_skipped,
            ),
            enforce_identity_revalidation: Some(options.enforce_identity_revalidation),
            execution_order: Some(order),
            release_creator_can_be_approver: Some(options.release_creator_can_be_approver),
            required_approver_count: Some(options.required_approver_count),
            timeout_in_minutes: Some(timeout_in_minutes),
        }),
        None if timeout_in_minutes > 0 => Some(ApprovalOptions {
            execution_order: Some(order),
            timeout_in_minutes: Some(timeout_in_minutes),
            ..Default::default()
        }),
        None => None,
    };

    ReleaseDefinitionApprovals {
        approvals: Some(steps),
        approval_options,
    }
}

/// Flatten one side of a stage's approvals
///
/// Automated steps are implied and dropped; a side with no manual approvals
/// and no timeout reads back as absent.
pub fn flatten_approvals(approvals: Option<&ReleaseDefinitionApprovals>) -> Option<DeployApproval> {
    let approvals = approvals?;
    let timeout_in_minutes = approvals
        .approval_options
        .as_ref()
        .and_then(|o| o.timeout_in_minutes)
        .unwrap_or(0);

    let approval: Vec<Approval> = approvals
        .approvals
        .iter()
        .flatten()
        .filter(|step| !step.is_automated.unwrap_or(false))
        .filter_map(|step| {
            let approver_id = step.approver.as_ref()?.id.clone()?;
            Some(Approval {
                id: step.id.unwrap_or(0),
                rank: step.rank.unwrap_or(0),
                approver_id,
            })
        })
        .collect();

    if approval.is_empty() && timeout_in_minutes == 0 {
        return None;
    }
    Some(DeployApproval {
        approval,
        timeout_in_minutes,
    })
}

/// Shared options, read from the post-deployment side if present
pub fn flatten_approval_options(
    pre: Option<&ReleaseDefinitionApprovals>,
    post: Option<&ReleaseDefinitionApprovals>,
) -> Option<ApprovalOptionsBlock> {
    let options = post
        .and_then(|p| p.approval_options.as_ref())
        .or_else(|| pre.and_then(|p| p.approval_options.as_ref()))?;

    Some(ApprovalOptionsBlock {
        auto_triggered_and_previous_environment_approved_can_be_skipped: options
            .auto_triggered_and_previous_environment_approved_can_be_skipped
            .unwrap_or(false),
        enforce_identity_revalidation: options.enforce_identity_revalidation.unwrap_or(false),
        release_creator_can_be_approver: options.release_creator_can_be_approver.unwrap_or(false),
        required_approver_count: options.required_approver_count.unwrap_or(0),
    })
}

// ============================================================================
// Gates
// ============================================================================

pub fn expand_gates(
    gates: Option<&GateBlock>,
    registry: &TaskRegistry,
) -> std::result::Result<ReleaseDefinitionGatesStep, ValidationError> {
    let Some(block) = gates else {
        return Ok(ReleaseDefinitionGatesStep {
            id: None,
            gates: Some(Vec::new()),
            gates_options: None,
        });
    };

    let gates = block
        .gate
        .iter()
        .enumerate()
        .map(|(i, gate)| {
            expand_tasks(&gate.task, registry)
                .map(|tasks| ReleaseDefinitionGate { tasks: Some(tasks) })
                .map_err(|e| e.within(&format!("gate.{}", i)))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(ReleaseDefinitionGatesStep {
        id: (block.id != 0).then_some(block.id),
        gates: Some(gates),
        gates_options: block.gates_options.map(|o| ReleaseDefinitionGatesOptions {
            is_enabled: Some(o.is_enabled),
            minimum_success_duration: Some(o.minimum_success_duration),
            sampling_interval: Some(o.sampling_interval),
            stabilization_time: Some(o.stabilization_time),
            timeout: Some(o.timeout),
        }),
    })
}

/// Flatten a gates step; an empty step reads back as absent
pub fn flatten_gates(
    step: Option<&ReleaseDefinitionGatesStep>,
    registry: &TaskRegistry,
) -> Result<Option<GateBlock>> {
    let Some(step) = step else {
        return Ok(None);
    };

    let gate = step
        .gates
        .iter()
        .flatten()
        .map(|gate| {
            Ok(Gate {
                task: flatten_tasks(gate.tasks.as_ref(), registry)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let gates_options = step.gates_options.as_ref().map(|o| GatesOptions {
        is_enabled: o.is_enabled.unwrap_or(false),
        minimum_success_duration: o.minimum_success_duration.unwrap_or(0),
        sampling_interval: o.sampling_interval.unwrap_or(0),
        stabilization_time: o.stabilization_time.unwrap_or(0),
        timeout: o.timeout.unwrap_or(0),
    });

    if gate.is_empty() && gates_options.is_none() {
        return Ok(None);
    }
    Ok(Some(GateBlock {
        id: step.id.unwrap_or(0),
        gate,
        gates_options,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::release::WorkflowTaskModel;

    #[test]
    fn test_empty_approvals_synthesize_automated_step() {
        let approvals = expand_approvals(None, None, ApprovalExecutionOrder::BeforeGates);
        let steps = approvals.approvals.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].is_automated, Some(true));
        assert_eq!(steps[0].is_notification_on, Some(false));
        assert_eq!(steps[0].rank, Some(1));
        assert!(approvals.approval_options.is_none());
    }

    #[test]
    fn test_manual_approval_and_options() {
        let approval = DeployApproval {
            approval: vec![Approval {
                id: 0,
                rank: 0,
                approver_id: "a3e2c4b1-0000-4000-8000-000000000001".to_string(),
            }],
            timeout_in_minutes: 60,
        };
        let options = ApprovalOptionsBlock {
            required_approver_count: 1,
            ..Default::default()
        };

        let wire = expand_approvals(
            Some(&approval),
            Some(&options),
            ApprovalExecutionOrder::AfterSuccessfulGates,
        );
        let step = &wire.approvals.as_ref().unwrap()[0];
        assert_eq!(step.is_automated, Some(false));
        assert_eq!(
            step.approver.as_ref().unwrap().id.as_deref(),
            Some("a3e2c4b1-0000-4000-8000-000000000001")
        );

        let wire_options = wire.approval_options.as_ref().unwrap();
        assert_eq!(
            wire_options.execution_order,
            Some(ApprovalExecutionOrder::AfterSuccessfulGates)
        );
        assert_eq!(wire_options.timeout_in_minutes, Some(60));

        let flattened = flatten_approvals(Some(&wire)).unwrap();
        assert_eq!(flattened.timeout_in_minutes, 60);
        assert_eq!(flattened.approval[0].rank, 1);
        assert_eq!(flattened.approval[0].approver_id, approval.approval[0].approver_id);
        assert_eq!(flatten_approval_options(None, Some(&wire)), Some(options));
    }

    #[test]
    fn test_automated_side_reads_back_as_absent() {
        let wire = expand_approvals(None, None, ApprovalExecutionOrder::BeforeGates);
        assert_eq!(flatten_approvals(Some(&wire)), None);
    }

    #[test]
    fn test_gates_round_trip() {
        let registry = TaskRegistry::default();
        let block = GateBlock {
            id: 9,
            gate: vec![Gate {
                task: vec![WorkflowTaskModel::new("InvokeRESTAPI@1").with_input("method", "GET")],
            }],
            gates_options: Some(GatesOptions {
                is_enabled: true,
                minimum_success_duration: 0,
                sampling_interval: 15,
                stabilization_time: 5,
                timeout: 1440,
            }),
        };
        let wire = expand_gates(Some(&block), &registry).unwrap();
        assert_eq!(flatten_gates(Some(&wire), &registry).unwrap(), Some(block));
    }

    #[test]
    fn test_absent_gates() {
        let registry = TaskRegistry::default();
        let wire = expand_gates(None, &registry).unwrap();
        assert_eq!(flatten_gates(Some(&wire), &registry).unwrap(), None);
    }
}
