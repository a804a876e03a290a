//! Core service endpoints

use crate::DevOpsClient;
use crate::error::Result;
use async_trait::async_trait;
use azdo_core::wire::pipelines::TeamProject;
use reqwest::Method;

#[async_trait]
pub trait CoreApi: Send + Sync {
    /// Look up a project by id or name
    async fn get_project(&self, project: &str) -> Result<TeamProject>;
}

#[async_trait]
impl CoreApi for DevOpsClient {
    async fn get_project(&self, project: &str) -> Result<TeamProject> {
        let url = self.endpoint(&self.organization_url, &["_apis", "projects", project])?;
        let response = self.request(Method::GET, url).send().await?;

        self.handle_response(response).await
    }
}
