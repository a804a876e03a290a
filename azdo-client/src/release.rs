//! Release management endpoints
//!
//! Served from the organization's `vsrm` host.

use crate::DevOpsClient;
use crate::error::Result;
use async_trait::async_trait;
use azdo_core::wire::release::ReleaseDefinition;
use reqwest::Method;

/// Release definition CRUD
#[async_trait]
pub trait ReleaseDefinitionApi: Send + Sync {
    async fn create_release_definition(
        &self,
        project: &str,
        definition: &ReleaseDefinition,
    ) -> Result<ReleaseDefinition>;

    async fn get_release_definition(&self, project: &str, definition_id: i32) -> Result<ReleaseDefinition>;

    /// Replace a definition; `definition.id` and `definition.revision` identify the target
    async fn update_release_definition(
        &self,
        project: &str,
        definition: &ReleaseDefinition,
    ) -> Result<ReleaseDefinition>;

    /// Delete a definition together with its releases
    async fn delete_release_definition(&self, project: &str, definition_id: i32) -> Result<()>;
}

impl DevOpsClient {
    fn release_endpoint(&self, project: &str, rest: &[&str]) -> Result<url::Url> {
        let mut segments = vec![project, "_apis", "release", "definitions"];
        segments.extend_from_slice(rest);
        self.endpoint(&self.release_url, &segments)
    }
}

#[async_trait]
impl ReleaseDefinitionApi for DevOpsClient {
    async fn create_release_definition(
        &self,
        project: &str,
        definition: &ReleaseDefinition,
    ) -> Result<ReleaseDefinition> {
        let url = self.release_endpoint(project, &[])?;
        let response = self.request(Method::POST, url).json(definition).send().await?;

        self.handle_response(response).await
    }

    async fn get_release_definition(&self, project: &str, definition_id: i32) -> Result<ReleaseDefinition> {
        let id = definition_id.to_string();
        let url = self.release_endpoint(project, &[&id])?;
        let response = self.request(Method::GET, url).send().await?;

        self.handle_response(response).await
    }

    async fn update_release_definition(
        &self,
        project: &str,
        definition: &ReleaseDefinition,
    ) -> Result<ReleaseDefinition> {
        let url = self.release_endpoint(project, &[])?;
        let response = self.request(Method::PUT, url).json(definition).send().await?;

        self.handle_response(response).await
    }

    async fn delete_release_definition(&self, project: &str, definition_id: i32) -> Result<()> {
        let id = definition_id.to_string();
        let url = self.release_endpoint(project, &[&id])?;
        let response = self
            .request(Method::DELETE, url)
            .query(&[("forceDelete", "true")])
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_endpoints_use_vsrm_host() {
        let client = DevOpsClient::new("https://dev.azure.com/contoso", None);
        let url = client.release_endpoint("webapp", &["7"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://vsrm.dev.azure.com/contoso/webapp/_apis/release/definitions/7"
        );
    }
}
