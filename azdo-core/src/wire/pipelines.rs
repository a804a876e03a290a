//! Pipelines, Git and Core service wire objects

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Pipeline permissions granted on a protected resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePipelinePermissions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<PermissionResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_pipelines: Option<Permission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipelines: Option<Vec<PipelinePermission>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub authorized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelinePermission {
    pub id: i32,
    pub authorized: bool,
}

/// Body of a pipeline run request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPipelineParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<RunResourcesParameters>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResourcesParameters {
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryResourceParameters>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryResourceParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl RunPipelineParameters {
    /// Run the pipeline's own repository at a ref, optionally pinned to a commit
    pub fn for_self_ref(ref_name: impl Into<String>, version: Option<String>) -> Self {
        let mut repositories = BTreeMap::new();
        repositories.insert(
            "self".to_string(),
            RepositoryResourceParameters {
                ref_name: Some(ref_name.into()),
                version,
            },
        );
        Self {
            resources: Some(RunResourcesParameters { repositories }),
        }
    }
}

/// A pipeline run as returned by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    #[serde(default)]
    pub id: Option<i32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// A Git ref and the commit it points at
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub object_id: Option<String>,
}

/// A team project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamProject {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_parameters_for_self_ref() {
        let params = RunPipelineParameters::for_self_ref("refs/heads/main", Some("abc123".into()));
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({
                "resources": {
                    "repositories": {
                        "self": {"refName": "refs/heads/main", "version": "abc123"}
                    }
                }
            })
        );
    }

    #[test]
    fn test_permissions_deserialize() {
        let payload = json!({
            "resource": {"id": "42", "type": "queue"},
            "allPipelines": {"authorized": true, "authorizedBy": null},
            "pipelines": [{"id": 7, "authorized": true}]
        });
        let permissions: ResourcePipelinePermissions = serde_json::from_value(payload).unwrap();
        assert_eq!(permissions.all_pipelines, Some(Permission { authorized: true }));
        assert_eq!(permissions.pipelines.unwrap()[0].id, 7);
    }
}
