//! Stage start conditions
//!
//! One flat condition list on the wire carries three model blocks:
//! `after_stage` (environmentState), `after_release` (event) and
//! `artifact_filter` (artifact, with a JSON-encoded value).

use crate::domain::release::{
    AfterRelease, AfterStage, ArtifactFilter, ArtifactFilterExclude, ArtifactFilterInclude,
    DEFAULT_EVENT_NAME,
};
use crate::error::{DefinitionError, Result};
use crate::wire::release::{Condition, ConditionType};
use serde::{Deserialize, Serialize};

/// Previous stage succeeded
pub const STAGE_SUCCEEDED: &str = "4";
/// Previous stage succeeded or partially succeeded
pub const STAGE_SUCCEEDED_OR_PARTIAL: &str = "12";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactConditionValue {
    #[serde(default)]
    source_branch: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    use_build_definition_branch: bool,
    #[serde(default)]
    create_release_on_build_tagging: bool,
}

/// Encode in wire order: stage conditions, then the release event, then artifact filters
pub fn encode_conditions(
    after_stage: &[AfterStage],
    after_release: Option<&AfterRelease>,
    artifact_filter: &[ArtifactFilter],
) -> Result<Vec<Condition>> {
    let mut conditions: Vec<Condition> = after_stage
        .iter()
        .map(|stage| Condition {
            name: Some(stage.stage_name.clone()),
            condition_type: ConditionType::EnvironmentState,
            value: Some(
                if stage.trigger_even_when_stages_partially_succeed {
                    STAGE_SUCCEEDED_OR_PARTIAL
                } else {
                    STAGE_SUCCEEDED
                }
                .to_string(),
            ),
        })
        .collect();

    if let Some(release) = after_release {
        let event_name = if release.event_name.is_empty() {
            DEFAULT_EVENT_NAME.to_string()
        } else {
            release.event_name.clone()
        };
        conditions.push(Condition {
            name: Some(event_name),
            condition_type: ConditionType::Event,
            value: Some(String::new()),
        });
    }

    for filter in artifact_filter {
        let includes = filter.include.iter().map(|include| ArtifactConditionValue {
            source_branch: include.branch_name.clone(),
            tags: include.tags.clone(),
            ..Default::default()
        });
        let excludes = filter.exclude.iter().map(|exclude| ArtifactConditionValue {
            source_branch: format!("-{}", exclude.branch_name),
            ..Default::default()
        });

        for value in includes.chain(excludes) {
            let value = serde_json::to_string(&value)
                .map_err(|e| DefinitionError::malformed("artifact condition", e))?;
            conditions.push(Condition {
                name: Some(filter.artifact_alias.clone()),
                condition_type: ConditionType::Artifact,
                value: Some(value),
            });
        }
    }

    Ok(conditions)
}

/// Decoded condition blocks of a stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageConditions {
    pub after_stage: Vec<AfterStage>,
    pub after_release: Option<AfterRelease>,
    pub artifact_filter: Vec<ArtifactFilter>,
}

/// Split the wire list back into blocks
///
/// Artifact filters are grouped by alias in order of first appearance.
/// Undefined condition types are ignored.
pub fn decode_conditions(conditions: &[Condition]) -> Result<StageConditions> {
    let mut decoded = StageConditions::default();

    for condition in conditions {
        let name = condition.name.clone().unwrap_or_default();
        match condition.condition_type {
            ConditionType::EnvironmentState => decoded.after_stage.push(AfterStage {
                stage_name: name,
                trigger_even_when_stages_partially_succeed: condition.value.as_deref()
                    != Some(STAGE_SUCCEEDED),
            }),
            ConditionType::Event => {
                decoded.after_release = Some(AfterRelease { event_name: name });
            }
            ConditionType::Artifact => {
                let raw = condition.value.as_deref().unwrap_or("{}");
                let value: ArtifactConditionValue = serde_json::from_str(raw)
                    .map_err(|e| DefinitionError::malformed("artifact condition", e))?;

                let index = match decoded
                    .artifact_filter
                    .iter()
                    .position(|f| f.artifact_alias == name)
                {
                    Some(index) => index,
                    None => {
                        decoded.artifact_filter.push(ArtifactFilter {
                            artifact_alias: name,
                            include: Vec::new(),
                            exclude: Vec::new(),
                        });
                        decoded.artifact_filter.len() - 1
                    }
                };
                let filter = &mut decoded.artifact_filter[index];

                match value.source_branch.strip_prefix('-') {
                    Some(branch) => filter.exclude.push(ArtifactFilterExclude {
                        branch_name: branch.to_string(),
                    }),
                    None => filter.include.push(ArtifactFilterInclude {
                        branch_name: value.source_branch,
                        tags: value.tags,
                    }),
                }
            }
            ConditionType::Undefined => {}
        }
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ArtifactFilter {
        ArtifactFilter {
            artifact_alias: "app".to_string(),
            include: vec![ArtifactFilterInclude {
                branch_name: "main".to_string(),
                tags: vec!["release".to_string()],
            }],
            exclude: vec![ArtifactFilterExclude {
                branch_name: "wip".to_string(),
            }],
        }
    }

    #[test]
    fn test_encode_order_and_values() {
        let after_stage = vec![
            AfterStage {
                stage_name: "dev".to_string(),
                trigger_even_when_stages_partially_succeed: false,
            },
            AfterStage {
                stage_name: "qa".to_string(),
                trigger_even_when_stages_partially_succeed: true,
            },
        ];
        let conditions = encode_conditions(&after_stage, None, &[filter()]).unwrap();

        assert_eq!(conditions.len(), 4);
        assert_eq!(conditions[0].value.as_deref(), Some("4"));
        assert_eq!(conditions[1].value.as_deref(), Some("12"));
        assert_eq!(conditions[2].condition_type, ConditionType::Artifact);

        let include: serde_json::Value =
            serde_json::from_str(conditions[2].value.as_deref().unwrap()).unwrap();
        assert_eq!(include["sourceBranch"], "main");
        assert_eq!(include["useBuildDefinitionBranch"], false);
        assert_eq!(include["createReleaseOnBuildTagging"], false);

        let exclude: serde_json::Value =
            serde_json::from_str(conditions[3].value.as_deref().unwrap()).unwrap();
        assert_eq!(exclude["sourceBranch"], "-wip");
    }

    #[test]
    fn test_after_release_defaults_event_name() {
        let conditions = encode_conditions(
            &[],
            Some(&AfterRelease {
                event_name: String::new(),
            }),
            &[],
        )
        .unwrap();
        assert_eq!(conditions[0].name.as_deref(), Some("ReleaseStarted"));
        assert_eq!(conditions[0].condition_type, ConditionType::Event);
    }

    #[test]
    fn test_round_trip() {
        let after_stage = vec![AfterStage {
            stage_name: "dev".to_string(),
            trigger_even_when_stages_partially_succeed: true,
        }];
        let conditions = encode_conditions(&after_stage, None, &[filter()]).unwrap();
        let decoded = decode_conditions(&conditions).unwrap();

        assert_eq!(decoded.after_stage, after_stage);
        assert_eq!(decoded.after_release, None);
        assert_eq!(decoded.artifact_filter, vec![filter()]);
    }

    #[test]
    fn test_artifact_conditions_grouped_by_alias() {
        let mut second = filter();
        second.artifact_alias = "lib".to_string();
        let mut conditions = encode_conditions(&[], None, &[filter(), second.clone()]).unwrap();
        conditions.swap(1, 2);

        let decoded = decode_conditions(&conditions).unwrap();
        assert_eq!(decoded.artifact_filter.len(), 2);
        assert_eq!(decoded.artifact_filter[0].artifact_alias, "app");
        assert_eq!(decoded.artifact_filter[0].exclude.len(), 1);
        assert_eq!(decoded.artifact_filter[1], second);
    }
}
