//! Pipelines service endpoints: runs and pipeline permissions

use crate::DevOpsClient;
use crate::error::Result;
use async_trait::async_trait;
use azdo_core::wire::pipelines::{PipelineRun, ResourcePipelinePermissions, RunPipelineParameters};
use reqwest::Method;

/// Queue pipeline runs
#[async_trait]
pub trait PipelinesApi: Send + Sync {
    async fn run_pipeline(
        &self,
        project: &str,
        pipeline_id: i32,
        parameters: &RunPipelineParameters,
    ) -> Result<PipelineRun>;
}

/// Pipeline permissions on protected resources
///
/// `resource_type` is the lowercase resource kind (`endpoint`, `queue`,
/// `variablegroup`, `environment`, `repository`).
#[async_trait]
pub trait PipelinePermissionsApi: Send + Sync {
    async fn get_pipeline_permissions(
        &self,
        project: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<ResourcePipelinePermissions>;

    async fn update_pipeline_permissions(
        &self,
        project: &str,
        resource_type: &str,
        resource_id: &str,
        permissions: &ResourcePipelinePermissions,
    ) -> Result<ResourcePipelinePermissions>;
}

impl DevOpsClient {
    fn permissions_endpoint(&self, project: &str, resource_type: &str, resource_id: &str) -> Result<url::Url> {
        self.endpoint(
            &self.organization_url,
            &[project, "_apis", "pipelines", "pipelinepermissions", resource_type, resource_id],
        )
    }
}

#[async_trait]
impl PipelinesApi for DevOpsClient {
    async fn run_pipeline(
        &self,
        project: &str,
        pipeline_id: i32,
        parameters: &RunPipelineParameters,
    ) -> Result<PipelineRun> {
        let id = pipeline_id.to_string();
        let url = self.endpoint(&self.organization_url, &[project, "_apis", "pipelines", &id, "runs"])?;
        let response = self.request(Method::POST, url).json(parameters).send().await?;

        self.handle_response(response).await
    }
}

#[async_trait]
impl PipelinePermissionsApi for DevOpsClient {
    async fn get_pipeline_permissions(
        &self,
        project: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<ResourcePipelinePermissions> {
        let url = self.permissions_endpoint(project, resource_type, resource_id)?;
        let response = self
            .request_with_version(Method::GET, url, &self.preview(1))
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn update_pipeline_permissions(
        &self,
        project: &str,
        resource_type: &str,
        resource_id: &str,
        permissions: &ResourcePipelinePermissions,
    ) -> Result<ResourcePipelinePermissions> {
        let url = self.permissions_endpoint(project, resource_type, resource_id)?;
        let response = self
            .request_with_version(Method::PATCH, url, &self.preview(1))
            .json(permissions)
            .send()
            .await?;

        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azdo_core::wire::pipelines::Permission;

    #[test]
    fn test_permissions_endpoint_keeps_dotted_repository_id() {
        let client = DevOpsClient::new("https://dev.azure.com/contoso", None);
        let url = client
            .permissions_endpoint("webapp", "repository", "5e1c2c8e.a1b2")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://dev.azure.com/contoso/webapp/_apis/pipelines/pipelinepermissions/repository/5e1c2c8e.a1b2"
        );
    }

    #[test]
    fn test_update_request_body() {
        let client = DevOpsClient::new("https://dev.azure.com/contoso", None);
        let permissions = ResourcePipelinePermissions {
            all_pipelines: Some(Permission { authorized: true }),
            ..Default::default()
        };
        let url = client.permissions_endpoint("webapp", "queue", "4").unwrap();
        let request = client
            .request_with_version(Method::PATCH, url, &client.preview(1))
            .json(&permissions)
            .build()
            .unwrap();

        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let body: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(body, serde_json::json!({"allPipelines": {"authorized": true}}));
        assert_eq!(request.url().query(), Some("api-version=7.1-preview.1"));
    }
}
