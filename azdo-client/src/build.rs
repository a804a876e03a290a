//! Build service endpoints: definitions, folders and resource authorizations

use crate::DevOpsClient;
use crate::error::Result;
use async_trait::async_trait;
use azdo_core::wire::ListResponse;
use azdo_core::wire::build::{BuildDefinition, DefinitionResourceReference, Folder};
use reqwest::Method;

/// Build definition CRUD
#[async_trait]
pub trait BuildDefinitionApi: Send + Sync {
    async fn create_build_definition(&self, project: &str, definition: &BuildDefinition) -> Result<BuildDefinition>;

    /// Fetch a definition by id
    ///
    /// Returns a not-found error (see [`crate::ClientError::is_not_found`])
    /// when the definition does not exist.
    async fn get_build_definition(&self, project: &str, definition_id: i32) -> Result<BuildDefinition>;

    /// Replace a definition; `definition.revision` must match the stored revision
    async fn update_build_definition(
        &self,
        project: &str,
        definition_id: i32,
        definition: &BuildDefinition,
    ) -> Result<BuildDefinition>;

    async fn delete_build_definition(&self, project: &str, definition_id: i32) -> Result<()>;
}

/// Build folder CRUD
///
/// Folders are addressed by their backslash-separated path.
#[async_trait]
pub trait BuildFolderApi: Send + Sync {
    /// List the folder at `path` and its descendants
    async fn list_folders(&self, project: &str, path: &str) -> Result<Vec<Folder>>;

    async fn create_folder(&self, project: &str, folder: &Folder) -> Result<Folder>;

    /// Update the folder currently at `path`; a new `folder.path` moves it
    async fn update_folder(&self, project: &str, path: &str, folder: &Folder) -> Result<Folder>;

    async fn delete_folder(&self, project: &str, path: &str) -> Result<()>;
}

/// Authorization of protected resources for build definitions
#[async_trait]
pub trait ResourceAuthorizationApi: Send + Sync {
    /// Resources authorized for one definition
    async fn get_definition_resources(
        &self,
        project: &str,
        definition_id: i32,
    ) -> Result<Vec<DefinitionResourceReference>>;

    async fn authorize_definition_resources(
        &self,
        project: &str,
        definition_id: i32,
        resources: &[DefinitionResourceReference],
    ) -> Result<Vec<DefinitionResourceReference>>;

    /// Resources authorized for every definition in the project
    async fn get_project_resources(
        &self,
        project: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<DefinitionResourceReference>>;

    async fn authorize_project_resources(
        &self,
        project: &str,
        resources: &[DefinitionResourceReference],
    ) -> Result<Vec<DefinitionResourceReference>>;
}

impl DevOpsClient {
    fn build_endpoint(&self, project: &str, rest: &[&str]) -> Result<url::Url> {
        let mut segments = vec![project, "_apis", "build"];
        segments.extend_from_slice(rest);
        self.endpoint(&self.organization_url, &segments)
    }
}

#[async_trait]
impl BuildDefinitionApi for DevOpsClient {
    async fn create_build_definition(&self, project: &str, definition: &BuildDefinition) -> Result<BuildDefinition> {
        let url = self.build_endpoint(project, &["definitions"])?;
        let response = self.request(Method::POST, url).json(definition).send().await?;

        self.handle_response(response).await
    }

    async fn get_build_definition(&self, project: &str, definition_id: i32) -> Result<BuildDefinition> {
        let id = definition_id.to_string();
        let url = self.build_endpoint(project, &["definitions", &id])?;
        let response = self.request(Method::GET, url).send().await?;

        self.handle_response(response).await
    }

    async fn update_build_definition(
        &self,
        project: &str,
        definition_id: i32,
        definition: &BuildDefinition,
    ) -> Result<BuildDefinition> {
        let id = definition_id.to_string();
        let url = self.build_endpoint(project, &["definitions", &id])?;
        let response = self.request(Method::PUT, url).json(definition).send().await?;

        self.handle_response(response).await
    }

    async fn delete_build_definition(&self, project: &str, definition_id: i32) -> Result<()> {
        let id = definition_id.to_string();
        let url = self.build_endpoint(project, &["definitions", &id])?;
        let response = self.request(Method::DELETE, url).send().await?;

        self.handle_empty_response(response).await
    }
}

// =============================================================================
// Folders
// =============================================================================

#[async_trait]
impl BuildFolderApi for DevOpsClient {
    async fn list_folders(&self, project: &str, path: &str) -> Result<Vec<Folder>> {
        let url = self.build_endpoint(project, &["folders", path])?;
        let response = self
            .request_with_version(Method::GET, url, &self.preview(2))
            .query(&[("queryOrder", "folderAscending")])
            .send()
            .await?;

        let folders: ListResponse<Folder> = self.handle_response(response).await?;
        Ok(folders.value)
    }

    async fn create_folder(&self, project: &str, folder: &Folder) -> Result<Folder> {
        let path = folder.path.clone().unwrap_or_default();
        let url = self.build_endpoint(project, &["folders"])?;
        let response = self
            .request_with_version(Method::PUT, url, &self.preview(2))
            .query(&[("path", path.as_str())])
            .json(folder)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn update_folder(&self, project: &str, path: &str, folder: &Folder) -> Result<Folder> {
        let url = self.build_endpoint(project, &["folders"])?;
        let response = self
            .request_with_version(Method::POST, url, &self.preview(2))
            .query(&[("path", path)])
            .json(folder)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn delete_folder(&self, project: &str, path: &str) -> Result<()> {
        let url = self.build_endpoint(project, &["folders"])?;
        let response = self
            .request_with_version(Method::DELETE, url, &self.preview(2))
            .query(&[("path", path)])
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}

// =============================================================================
// Resource Authorization
// =============================================================================

#[async_trait]
impl ResourceAuthorizationApi for DevOpsClient {
    async fn get_definition_resources(
        &self,
        project: &str,
        definition_id: i32,
    ) -> Result<Vec<DefinitionResourceReference>> {
        let id = definition_id.to_string();
        let url = self.build_endpoint(project, &["definitions", &id, "resources"])?;
        let response = self
            .request_with_version(Method::GET, url, &self.preview(1))
            .send()
            .await?;

        let resources: ListResponse<DefinitionResourceReference> = self.handle_response(response).await?;
        Ok(resources.value)
    }

    async fn authorize_definition_resources(
        &self,
        project: &str,
        definition_id: i32,
        resources: &[DefinitionResourceReference],
    ) -> Result<Vec<DefinitionResourceReference>> {
        let id = definition_id.to_string();
        let url = self.build_endpoint(project, &["definitions", &id, "resources"])?;
        let response = self
            .request_with_version(Method::PATCH, url, &self.preview(1))
            .json(resources)
            .send()
            .await?;

        let resources: ListResponse<DefinitionResourceReference> = self.handle_response(response).await?;
        Ok(resources.value)
    }

    async fn get_project_resources(
        &self,
        project: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<DefinitionResourceReference>> {
        let url = self.build_endpoint(project, &["authorizedresources"])?;
        let response = self
            .request_with_version(Method::GET, url, &self.preview(1))
            .query(&[("type", resource_type), ("id", resource_id)])
            .send()
            .await?;

        let resources: ListResponse<DefinitionResourceReference> = self.handle_response(response).await?;
        Ok(resources.value)
    }

    async fn authorize_project_resources(
        &self,
        project: &str,
        resources: &[DefinitionResourceReference],
    ) -> Result<Vec<DefinitionResourceReference>> {
        let url = self.build_endpoint(project, &["authorizedresources"])?;
        let response = self
            .request_with_version(Method::PATCH, url, &self.preview(1))
            .json(resources)
            .send()
            .await?;

        let resources: ListResponse<DefinitionResourceReference> = self.handle_response(response).await?;
        Ok(resources.value)
    }
}
