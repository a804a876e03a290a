//! Pipeline and resource authorization models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of protected resource a pipeline may be authorized to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizedResourceType {
    Endpoint,
    Queue,
    VariableGroup,
    Environment,
    Repository,
}

impl AuthorizedResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Endpoint => "endpoint",
            Self::Queue => "queue",
            Self::VariableGroup => "variablegroup",
            Self::Environment => "environment",
            Self::Repository => "repository",
        }
    }

    /// Types accepted by the legacy definition-level resource authorization
    pub fn is_definition_resource(&self) -> bool {
        matches!(self, Self::Endpoint | Self::Queue | Self::VariableGroup)
    }
}

impl fmt::Display for AuthorizedResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthorizedResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "endpoint" => Ok(Self::Endpoint),
            "queue" => Ok(Self::Queue),
            "variablegroup" => Ok(Self::VariableGroup),
            "environment" => Ok(Self::Environment),
            "repository" => Ok(Self::Repository),
            _ => Err(format!("unknown resource type: {}", s)),
        }
    }
}

/// Grant of a protected resource to one pipeline, or to all pipelines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineAuthorizationModel {
    pub project_id: String,
    /// Project of the pipeline when it differs from the resource's project
    #[serde(default)]
    pub pipeline_project_id: Option<String>,
    pub resource_id: String,
    #[serde(rename = "type")]
    pub resource_type: AuthorizedResourceType,
    #[serde(default)]
    pub pipeline_id: Option<i32>,
}

impl PipelineAuthorizationModel {
    /// Resource id as the permissions API expects it
    ///
    /// Repositories are addressed as `<project>.<repository>`.
    pub fn api_resource_id(&self) -> String {
        match self.resource_type {
            AuthorizedResourceType::Repository => {
                format!("{}.{}", self.project_id, self.resource_id)
            }
            _ => self.resource_id.clone(),
        }
    }

    /// Project the pipeline lives in
    pub fn pipeline_project(&self) -> &str {
        self.pipeline_project_id
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.project_id)
    }

    /// Composite id: `project/type/resource[/pipeline]`
    pub fn composite_id(&self) -> String {
        match self.pipeline_id {
            Some(pipeline_id) => format!(
                "{}/{}/{}/{}",
                self.project_id, self.resource_type, self.resource_id, pipeline_id
            ),
            None => format!(
                "{}/{}/{}",
                self.project_id, self.resource_type, self.resource_id
            ),
        }
    }
}

/// Legacy authorization of a resource for a definition or the whole project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAuthorizationModel {
    pub project_id: String,
    pub resource_id: String,
    /// 0 authorizes the resource for every definition in the project
    #[serde(default)]
    pub definition_id: i32,
    #[serde(rename = "type", default = "default_resource_type")]
    pub resource_type: AuthorizedResourceType,
    pub authorized: bool,
}

fn default_resource_type() -> AuthorizedResourceType {
    AuthorizedResourceType::Endpoint
}
