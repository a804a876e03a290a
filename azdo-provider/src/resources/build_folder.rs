//! `azuredevops_build_folder`

use crate::error::{ProviderError, RemoteContext, Result};
use crate::resource::{Resource, ResourceData, resolve_project, split_import_id};
use async_trait::async_trait;
use azdo_client::{BuildFolderApi, CoreApi};
use azdo_core::build::project_reference;
use azdo_core::domain::folder::BuildFolderModel;
use azdo_core::validate::validate_path;
use azdo_core::wire::build::Folder;
use std::sync::Arc;
use tracing::{info, warn};

const IMPORT_FORMAT: &str = "<project>/<\\path>";

/// Folders are keyed by project and path; the resource id is the project id.
pub struct BuildFolderResource {
    folders: Arc<dyn BuildFolderApi>,
    projects: Arc<dyn CoreApi>,
}

impl BuildFolderResource {
    pub fn new(folders: Arc<dyn BuildFolderApi>, projects: Arc<dyn CoreApi>) -> Self {
        Self { folders, projects }
    }
}

fn to_folder(model: &BuildFolderModel) -> Folder {
    Folder {
        path: Some(model.path.clone()),
        description: Some(model.description.clone()),
        project: Some(project_reference(&model.project_id)),
    }
}

fn validate(model: &BuildFolderModel) -> Result<()> {
    validate_path("path", &model.path).map_err(|e| ProviderError::Validation(vec![e]))
}

#[async_trait]
impl Resource for BuildFolderResource {
    type Model = BuildFolderModel;

    const TYPE_NAME: &'static str = "azuredevops_build_folder";

    async fn create(&self, data: &mut ResourceData<BuildFolderModel>) -> Result<()> {
        validate(&data.attributes)?;

        let created = self
            .folders
            .create_folder(&data.attributes.project_id, &to_folder(&data.attributes))
            .await
            .remote(format!("creating build folder {}", data.attributes.path))?;

        data.id = created
            .project
            .and_then(|p| p.id.map(|id| id.to_string()))
            .unwrap_or_else(|| data.attributes.project_id.clone());
        info!("Build folder created: {}", data.attributes.path);

        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData<BuildFolderModel>) -> Result<()> {
        let path = data.attributes.path.clone();

        let folders = match self
            .folders
            .list_folders(&data.attributes.project_id, &path)
            .await
        {
            Ok(folders) => folders,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(ProviderError::remote(format!("reading build folder {}", path), e)),
        };

        let Some(folder) = folders.into_iter().next() else {
            warn!("Build folder {} no longer exists, removing from state", path);
            data.clear_id();
            return Ok(());
        };

        if let Some(path) = folder.path {
            data.attributes.path = path;
        }
        if let Some(description) = folder.description {
            data.attributes.description = description;
        }
        Ok(())
    }

    /// Renames move the folder from the path persisted on the last apply
    async fn update(&self, data: &mut ResourceData<BuildFolderModel>) -> Result<()> {
        validate(&data.attributes)?;
        let old_path = data
            .prior
            .as_ref()
            .and_then(|prior| prior.get("path"))
            .and_then(|path| path.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| data.attributes.path.clone());

        self.folders
            .update_folder(&data.attributes.project_id, &old_path, &to_folder(&data.attributes))
            .await
            .remote(format!("updating build folder {}", old_path))?;

        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData<BuildFolderModel>) -> Result<()> {
        if !data.has_id() {
            return Ok(());
        }

        self.folders
            .delete_folder(&data.attributes.project_id, &data.attributes.path)
            .await
            .remote(format!("deleting build folder {}", data.attributes.path))?;

        info!("Build folder deleted: {}", data.attributes.path);
        data.clear_id();
        Ok(())
    }

    async fn import(&self, import_id: &str) -> Result<ResourceData<BuildFolderModel>> {
        let (project, path) = split_import_id(import_id, IMPORT_FORMAT)?;
        validate_path("path", path).map_err(|e| ProviderError::Validation(vec![e]))?;
        let project_id = resolve_project(self.projects.as_ref(), project).await?;

        let mut data =
            ResourceData::new(BuildFolderModel::new(project_id.clone(), path)).with_id(project_id);
        self.read(&mut data).await?;
        if !data.has_id() {
            return Err(ProviderError::NotFound(format!("build folder {}", import_id)));
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDevOps;
    use azdo_core::ValidationKind;
    use serde_json::json;

    const PROJECT: &str = "4a3b6f7e-22a4-4a9e-8c1b-5d8e2f1a9b30";

    fn resource(fake: &Arc<FakeDevOps>) -> BuildFolderResource {
        BuildFolderResource::new(fake.clone(), fake.clone())
    }

    fn folder(path: &str) -> BuildFolderModel {
        let mut model = BuildFolderModel::new(PROJECT, path);
        model.description = "team pipelines".to_string();
        model
    }

    #[tokio::test]
    async fn test_create_uses_project_as_id() {
        let fake = FakeDevOps::shared();
        let mut data = ResourceData::new(folder("\\team\\web"));

        resource(&fake).create(&mut data).await.unwrap();

        assert_eq!(data.id, PROJECT);
        assert_eq!(data.attributes.description, "team pipelines");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_path() {
        let fake = FakeDevOps::shared();
        for (path, kind) in [
            ("", ValidationKind::PathEmpty),
            ("team", ValidationKind::PathMustStartWithBackslash),
            ("\\<", ValidationKind::PathForbiddenChar),
        ] {
            let mut data = ResourceData::new(folder(path));
            let err = resource(&fake).create(&mut data).await.unwrap_err();
            assert_eq!(err.validation_errors()[0].kind, kind, "{:?}", path);
        }
        assert_eq!(fake.state().requests, 0);
    }

    #[tokio::test]
    async fn test_update_moves_from_prior_path() {
        let fake = FakeDevOps::shared();
        let resource = resource(&fake);
        let mut data = ResourceData::new(folder("\\old"));
        resource.create(&mut data).await.unwrap();

        let prior = data.snapshot().unwrap();
        let mut renamed = ResourceData::new(folder("\\new"))
            .with_id(data.id.clone())
            .with_prior(prior);
        resource.update(&mut renamed).await.unwrap();

        assert!(renamed.has_id());
        assert_eq!(renamed.attributes.path, "\\new");
        let paths: Vec<_> = fake
            .state()
            .folders
            .iter()
            .filter_map(|f| f.path.clone())
            .collect();
        assert_eq!(paths, vec!["\\new".to_string()]);
    }

    #[tokio::test]
    async fn test_read_empty_listing_clears_id() {
        let fake = FakeDevOps::shared();
        let mut data = ResourceData::new(folder("\\gone")).with_id(PROJECT);

        resource(&fake).read(&mut data).await.unwrap();

        assert!(!data.has_id());
    }

    #[tokio::test]
    async fn test_import_by_project_name_and_path() {
        let fake = FakeDevOps::shared();
        let project_id = fake.add_project("webapp");
        let resource = resource(&fake);
        let mut data = ResourceData::new(BuildFolderModel::new(project_id.clone(), "\\infra"));
        resource.create(&mut data).await.unwrap();

        let imported = resource.import("webapp/\\infra").await.unwrap();

        assert_eq!(imported.id, project_id);
        assert_eq!(
            serde_json::to_value(&imported).unwrap(),
            json!({"id": project_id, "project_id": project_id, "path": "\\infra", "description": ""})
        );
    }
}
