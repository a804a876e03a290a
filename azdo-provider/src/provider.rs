//! JSON dispatch over the registered resources
//!
//! The host speaks in untyped state objects. [`Provider`] looks up the
//! resource by type name, decodes the state into its model, runs the callback
//! and encodes the result back.

use crate::error::{ProviderError, Result};
use crate::resource::{Resource, ResourceData};
use crate::resources::{
    BuildDefinitionResource, BuildFolderResource, PipelineAuthorizationResource,
    ReleaseDefinitionResource, ResourceAuthorizationResource,
};
use async_trait::async_trait;
use azdo_client::{
    BuildDefinitionApi, BuildFolderApi, CoreApi, GitApi, PipelinePermissionsApi, PipelinesApi,
    ReleaseDefinitionApi, ResourceAuthorizationApi,
};
use azdo_core::TaskRegistry;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Type-erased view of a [`Resource`]
#[async_trait]
trait DynResource: Send + Sync {
    fn schema_version(&self) -> u32;
    async fn create(&self, config: Value) -> Result<Value>;
    async fn read(&self, state: Value) -> Result<Value>;
    async fn update(&self, prior: Value, config: Value) -> Result<Value>;
    async fn delete(&self, state: Value) -> Result<()>;
    async fn import(&self, import_id: &str) -> Result<Value>;
    fn upgrade_state(&self, state: Value, from_version: u32) -> Result<Value>;
}

fn decode<R: Resource>(value: Value) -> Result<ResourceData<R::Model>> {
    Ok(serde_json::from_value(value)?)
}

fn encode<T: serde::Serialize>(data: &ResourceData<T>) -> Result<Value> {
    Ok(serde_json::to_value(data)?)
}

/// Copy service-assigned attributes from `prior` where `config` has none
fn carry_computed(keys: &[&str], prior: &Value, config: &mut Value) {
    let Value::Object(config) = config else {
        return;
    };
    for key in keys {
        let missing = config.get(*key).is_none_or(Value::is_null);
        if let (true, Some(value)) = (missing, prior.get(*key)) {
            config.insert(key.to_string(), value.clone());
        }
    }
}

#[async_trait]
impl<R: Resource + 'static> DynResource for R {
    fn schema_version(&self) -> u32 {
        R::SCHEMA_VERSION
    }

    async fn create(&self, config: Value) -> Result<Value> {
        let mut data = decode::<R>(config)?;
        data.id.clear();
        Resource::create(self, &mut data).await?;
        encode(&data)
    }

    async fn read(&self, state: Value) -> Result<Value> {
        let mut data = decode::<R>(state.clone())?.with_prior(state);
        if data.has_id() {
            Resource::read(self, &mut data).await?;
        }
        encode(&data)
    }

    async fn update(&self, prior: Value, mut config: Value) -> Result<Value> {
        carry_computed(R::COMPUTED, &prior, &mut config);
        let mut data = decode::<R>(config)?;
        if !data.has_id() {
            data.id = prior
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
        }
        let mut data = data.with_prior(prior);
        Resource::update(self, &mut data).await?;
        encode(&data)
    }

    async fn delete(&self, state: Value) -> Result<()> {
        let mut data = decode::<R>(state)?;
        Resource::delete(self, &mut data).await
    }

    async fn import(&self, import_id: &str) -> Result<Value> {
        let data = Resource::import(self, import_id).await?;
        encode(&data)
    }

    fn upgrade_state(&self, state: Value, from_version: u32) -> Result<Value> {
        Resource::upgrade_state(self, state, from_version)
    }
}

/// Registry of resource types addressable by name
#[derive(Default)]
pub struct Provider {
    resources: BTreeMap<&'static str, Box<dyn DynResource>>,
}

impl Provider {
    /// An empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider with every resource type backed by one client
    ///
    /// # Arguments
    /// * `client` - Shared REST client, typically a `DevOpsClient`
    /// * `registry` - Task names used to encode release workflow tasks
    pub fn with_client<C>(client: Arc<C>, registry: Arc<TaskRegistry>) -> Self
    where
        C: BuildDefinitionApi
            + ReleaseDefinitionApi
            + BuildFolderApi
            + ResourceAuthorizationApi
            + PipelinePermissionsApi
            + PipelinesApi
            + GitApi
            + CoreApi
            + 'static,
    {
        Self::new()
            .register(BuildDefinitionResource::new(
                client.clone(),
                client.clone(),
                client.clone(),
                client.clone(),
            ))
            .register(ReleaseDefinitionResource::new(
                client.clone(),
                client.clone(),
                registry,
            ))
            .register(BuildFolderResource::new(client.clone(), client.clone()))
            .register(PipelineAuthorizationResource::new(client.clone()))
            .register(ResourceAuthorizationResource::new(client))
    }

    pub fn register<R: Resource + 'static>(mut self, resource: R) -> Self {
        self.resources.insert(R::TYPE_NAME, Box::new(resource));
        self
    }

    /// Registered type names, sorted
    pub fn resource_types(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    fn resource(&self, type_name: &str) -> Result<&dyn DynResource> {
        self.resources
            .get(type_name)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResourceType(type_name.to_string()))
    }

    pub async fn create(&self, type_name: &str, config: Value) -> Result<Value> {
        debug!("create {}", type_name);
        self.resource(type_name)?.create(config).await
    }

    /// Refresh persisted state; the returned state has an empty `id` when the
    /// object no longer exists
    pub async fn read(&self, type_name: &str, state: Value) -> Result<Value> {
        debug!("read {}", type_name);
        self.resource(type_name)?.read(state).await
    }

    /// Apply `config` over the object persisted as `prior`
    pub async fn update(&self, type_name: &str, prior: Value, config: Value) -> Result<Value> {
        debug!("update {}", type_name);
        self.resource(type_name)?.update(prior, config).await
    }

    pub async fn delete(&self, type_name: &str, state: Value) -> Result<()> {
        debug!("delete {}", type_name);
        self.resource(type_name)?.delete(state).await
    }

    pub async fn import(&self, type_name: &str, import_id: &str) -> Result<Value> {
        debug!("import {} {}", type_name, import_id);
        self.resource(type_name)?.import(import_id).await
    }

    pub fn schema_version(&self, type_name: &str) -> Result<u32> {
        Ok(self.resource(type_name)?.schema_version())
    }

    /// Bring state written at `from_version` up to the current schema version
    pub fn upgrade_state(&self, type_name: &str, state: Value, from_version: u32) -> Result<Value> {
        self.resource(type_name)?.upgrade_state(state, from_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;
    use crate::testing::FakeDevOps;
    use azdo_core::domain::release::{
        AgentJob, Job, ReleaseDefinitionModel, Stage, WorkflowTaskModel,
    };
    use serde_json::json;

    const PROJECT: &str = "4a3b6f7e-22a4-4a9e-8c1b-5d8e2f1a9b30";

    fn provider(fake: &Arc<FakeDevOps>) -> Provider {
        Provider::with_client(fake.clone(), Arc::new(TaskRegistry::default()))
    }

    fn build_config() -> Value {
        json!({
            "project_id": PROJECT,
            "name": "webapp-ci",
            "repository": {
                "repo_type": "GitHub",
                "repo_id": "contoso/webapp",
                "yml_path": "azure-pipelines.yml"
            },
            "variable": [{"name": "DEPLOY_KEY", "secret_value": "hunter2", "is_secret": true}]
        })
    }

    #[test]
    fn test_every_resource_type_is_registered() {
        let fake = FakeDevOps::shared();
        assert_eq!(
            provider(&fake).resource_types(),
            vec![
                "azuredevops_build_definition",
                "azuredevops_build_folder",
                "azuredevops_pipeline_authorization",
                "azuredevops_release_definition",
                "azuredevops_resource_authorization",
            ]
        );
    }

    #[test]
    fn test_schema_versions() {
        let fake = FakeDevOps::shared();
        let provider = provider(&fake);
        assert_eq!(provider.schema_version("azuredevops_build_definition").unwrap(), 1);
        assert_eq!(provider.schema_version("azuredevops_build_folder").unwrap(), 0);
        assert!(matches!(
            provider.schema_version("azuredevops_widget"),
            Err(ProviderError::UnknownResourceType(_))
        ));
    }

    #[tokio::test]
    async fn test_lifecycle_over_json() {
        let fake = FakeDevOps::shared();
        let provider = provider(&fake);
        let kind = "azuredevops_build_definition";

        let state = provider.create(kind, build_config()).await.unwrap();
        assert_eq!(state["id"], "1");
        assert_eq!(state["path"], "\\");
        assert_eq!(state["variable"][0]["secret_value"], "hunter2");

        let refreshed = provider.read(kind, state.clone()).await.unwrap();
        assert_eq!(refreshed["variable"][0]["secret_value"], "hunter2");

        let mut config = build_config();
        config["name"] = json!("webapp-ci-v2");
        let updated = provider.update(kind, refreshed, config).await.unwrap();
        assert_eq!(updated["id"], "1");
        assert_eq!(updated["name"], "webapp-ci-v2");
        assert_eq!(updated["revision"], 2);

        provider.delete(kind, updated.clone()).await.unwrap();
        let gone = provider.read(kind, updated).await.unwrap();
        assert_eq!(gone["id"], "");
    }

    #[tokio::test]
    async fn test_release_update_keeps_service_fields() {
        let fake = FakeDevOps::shared();
        let provider = provider(&fake);
        let kind = "azuredevops_release_definition";

        let mut job = AgentJob::hosted("Run", 9, "ubuntu-latest");
        job.task = vec![WorkflowTaskModel::new("CmdLine@2.*").with_input("script", "echo deploy")];
        let mut stage = Stage::new("dev");
        stage.job = vec![Job::Agent(job)];
        let mut model = ReleaseDefinitionModel::new(PROJECT, "webapp-release");
        model.stage = vec![stage];
        let config = serde_json::to_value(&model).unwrap();

        let state = provider.create(kind, config.clone()).await.unwrap();
        assert_eq!(state["revision"], 1);
        assert_eq!(state["source"], "restApi");

        let mut config = config;
        config["description"] = json!("deploys the web app");
        let updated = provider.update(kind, state, config).await.unwrap();

        assert_eq!(updated["revision"], 2);
        assert_eq!(updated["source"], "restApi");
        assert_eq!(updated["description"], "deploys the web app");
    }

    #[test]
    fn test_carry_computed_prefers_configured_values() {
        let prior = json!({"id": "4", "revision": 3, "source": "restApi"});
        let mut config = json!({"name": "ci", "revision": null, "source": "userInterface"});

        carry_computed(&["revision", "source", "url"], &prior, &mut config);

        assert_eq!(config["revision"], 3);
        assert_eq!(config["source"], "userInterface");
        assert!(config.get("url").is_none());
    }

    #[tokio::test]
    async fn test_unsupported_import() {
        let fake = FakeDevOps::shared();
        let err = provider(&fake)
            .import("azuredevops_resource_authorization", "p/x")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Import(ImportError::Unsupported(_))));
    }

    #[test]
    fn test_upgrade_state_dispatch() {
        let fake = FakeDevOps::shared();
        let provider = provider(&fake);

        let upgraded = provider
            .upgrade_state("azuredevops_build_definition", json!({"id": "3", "name": "ci"}), 0)
            .unwrap();
        assert_eq!(upgraded, json!({"id": "3", "name": "ci", "skip_first_run": "true"}));

        let kept = provider
            .upgrade_state(
                "azuredevops_build_definition",
                json!({"id": "3", "skip_first_run": "false"}),
                0,
            )
            .unwrap();
        assert_eq!(kept["skip_first_run"], "false");
    }
}
