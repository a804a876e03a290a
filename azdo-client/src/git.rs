//! Git endpoints

use crate::DevOpsClient;
use crate::error::Result;
use async_trait::async_trait;
use azdo_core::wire::ListResponse;
use azdo_core::wire::pipelines::GitRef;
use reqwest::Method;

#[async_trait]
pub trait GitApi: Send + Sync {
    /// Refs of a repository whose names start with `refs/<filter>`, e.g. `heads/main`
    async fn get_refs(&self, project: &str, repository_id: &str, filter: &str) -> Result<Vec<GitRef>>;
}

#[async_trait]
impl GitApi for DevOpsClient {
    async fn get_refs(&self, project: &str, repository_id: &str, filter: &str) -> Result<Vec<GitRef>> {
        let url = self.endpoint(
            &self.organization_url,
            &[project, "_apis", "git", "repositories", repository_id, "refs"],
        )?;
        let response = self
            .request(Method::GET, url)
            .query(&[("filter", filter)])
            .send()
            .await?;

        let refs: ListResponse<GitRef> = self.handle_response(response).await?;
        Ok(refs.value)
    }
}
