//! Resource lifecycle seam
//!
//! Every resource type implements [`Resource`] over its model from
//! `azdo_core::domain`. The host hands the callbacks a [`ResourceData`]: the
//! resource id, the configured or persisted attributes, and optionally the
//! state persisted on the previous apply.

use crate::error::{ImportError, ProviderError, RemoteContext, Result};
use async_trait::async_trait;
use azdo_client::CoreApi;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Id plus attributes of one resource instance
///
/// Serializes as a flat JSON object: `{"id": ..., <attributes>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceData<T> {
    /// Empty until the service has accepted a Create
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub attributes: T,
    /// State persisted on the last apply
    #[serde(skip)]
    pub prior: Option<Value>,
}

impl<T> ResourceData<T> {
    pub fn new(attributes: T) -> Self {
        Self {
            id: String::new(),
            attributes,
            prior: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_prior(mut self, prior: Value) -> Self {
        self.prior = Some(prior);
        self
    }

    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Mark the resource as gone so the host drops it from state
    pub fn clear_id(&mut self) {
        self.id.clear();
    }
}

impl<T: Serialize> ResourceData<T> {
    /// Current attributes as a JSON object
    pub fn snapshot(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.attributes)?)
    }

    /// State secret values are recovered from: the prior state when known,
    /// the current attributes otherwise
    pub fn prior_state(&self) -> Result<Value> {
        match &self.prior {
            Some(prior) => Ok(prior.clone()),
            None => self.snapshot(),
        }
    }
}

/// CRUD callbacks of one resource type
#[async_trait]
pub trait Resource: Send + Sync {
    type Model: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// Type name the host addresses the resource by
    const TYPE_NAME: &'static str;

    /// Version of the persisted state layout
    const SCHEMA_VERSION: u32 = 0;

    /// Top-level attributes assigned by the service. An update whose
    /// configuration omits them takes them from the prior state.
    const COMPUTED: &'static [&'static str] = &[];

    async fn create(&self, data: &mut ResourceData<Self::Model>) -> Result<()>;

    /// Refresh attributes from the service; clears the id when the object is gone
    async fn read(&self, data: &mut ResourceData<Self::Model>) -> Result<()>;

    async fn update(&self, data: &mut ResourceData<Self::Model>) -> Result<()>;

    async fn delete(&self, data: &mut ResourceData<Self::Model>) -> Result<()>;

    /// Build resource data from an import id and read it
    async fn import(&self, import_id: &str) -> Result<ResourceData<Self::Model>> {
        let _ = import_id;
        Err(ImportError::Unsupported(Self::TYPE_NAME.to_string()).into())
    }

    /// Rewrite persisted state written at `from_version` to [`Self::SCHEMA_VERSION`]
    fn upgrade_state(&self, state: Value, from_version: u32) -> Result<Value> {
        let _ = from_version;
        Ok(state)
    }
}

// =============================================================================
// Import helpers
// =============================================================================

/// Split `<project>/<rest>` at the first `/`
pub fn split_import_id<'a>(import_id: &'a str, expected: &'static str) -> Result<(&'a str, &'a str)> {
    if import_id.trim().is_empty() {
        return Err(ImportError::ImportIdMissing { expected }.into());
    }
    match import_id.split_once('/') {
        Some((project, rest)) if !project.is_empty() && !rest.is_empty() => Ok((project, rest)),
        _ => Err(ImportError::ImportIdInvalidFormat {
            id: import_id.to_string(),
            expected,
        }
        .into()),
    }
}

/// Parse a numeric definition id out of an import id
pub fn parse_import_number(import_id: &str, part: &str, expected: &'static str) -> Result<i32> {
    part.parse().map_err(|_| {
        ProviderError::from(ImportError::ImportIdInvalidFormat {
            id: import_id.to_string(),
            expected,
        })
    })
}

/// Project id for a project given by id or by name
pub async fn resolve_project(projects: &dyn CoreApi, project: &str) -> Result<String> {
    if Uuid::parse_str(project).is_ok() {
        return Ok(project.to_string());
    }

    let found = projects
        .get_project(project)
        .await
        .remote(format!("looking up project {}", project))?;
    found
        .id
        .map(|id| id.to_string())
        .ok_or_else(|| ProviderError::NotFound(format!("project {}", project)))
}

/// Numeric id of a definition resource
pub fn definition_id(id: &str) -> Result<i32> {
    id.parse()
        .map_err(|_| ProviderError::InvalidId(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDevOps;
    use azdo_core::domain::folder::BuildFolderModel;
    use serde_json::json;

    #[test]
    fn test_resource_data_serializes_flat() {
        let data = ResourceData::new(BuildFolderModel::new("proj", "\\infra")).with_id("42");
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({"id": "42", "project_id": "proj", "path": "\\infra", "description": ""})
        );

        let parsed: ResourceData<BuildFolderModel> = serde_json::from_value(json!({
            "project_id": "proj",
            "path": "\\infra"
        }))
        .unwrap();
        assert!(!parsed.has_id());
        assert_eq!(parsed.attributes.path, "\\infra");
    }

    #[test]
    fn test_prior_state_falls_back_to_attributes() {
        let data = ResourceData::new(BuildFolderModel::new("proj", "\\a"));
        assert_eq!(data.prior_state().unwrap()["path"], "\\a");

        let data = data.with_prior(json!({"path": "\\old"}));
        assert_eq!(data.prior_state().unwrap()["path"], "\\old");
    }

    #[test]
    fn test_split_import_id() {
        assert_eq!(split_import_id("proj/12", "project/id").unwrap(), ("proj", "12"));
        assert_eq!(
            split_import_id("proj/\\a\\b", "project/path").unwrap(),
            ("proj", "\\a\\b")
        );

        let err = split_import_id("", "project/id").unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Import(ImportError::ImportIdMissing { .. })
        ));

        for id in ["proj", "proj/", "/12"] {
            let err = split_import_id(id, "project/id").unwrap_err();
            assert!(
                matches!(err, ProviderError::Import(ImportError::ImportIdInvalidFormat { .. })),
                "{}",
                id
            );
        }
    }

    #[test]
    fn test_parse_import_number_rejects_text() {
        assert_eq!(parse_import_number("p/7", "7", "project/id").unwrap(), 7);
        assert!(matches!(
            parse_import_number("p/seven", "seven", "project/id"),
            Err(ProviderError::Import(ImportError::ImportIdInvalidFormat { .. }))
        ));
    }

    #[tokio::test]
    async fn test_resolve_project_by_name() {
        let fake = FakeDevOps::new();
        let project_id = fake.add_project("webapp");

        assert_eq!(resolve_project(&fake, "webapp").await.unwrap(), project_id);
        assert_eq!(resolve_project(&fake, &project_id).await.unwrap(), project_id);
        assert!(matches!(
            resolve_project(&fake, "missing").await,
            Err(ProviderError::Remote { .. })
        ));
    }
}
