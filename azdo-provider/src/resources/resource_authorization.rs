//! `azuredevops_resource_authorization`
//!
//! Legacy authorization of an endpoint, queue or variable group for one build
//! definition (`definition_id > 0`) or for the whole project.

use crate::error::{ProviderError, RemoteContext, Result};
use crate::resource::{Resource, ResourceData};
use async_trait::async_trait;
use azdo_client::ResourceAuthorizationApi;
use azdo_core::domain::authorization::{AuthorizedResourceType, ResourceAuthorizationModel};
use azdo_core::wire::build::DefinitionResourceReference;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ResourceAuthorizationResource {
    authorizations: Arc<dyn ResourceAuthorizationApi>,
}

impl ResourceAuthorizationResource {
    pub fn new(authorizations: Arc<dyn ResourceAuthorizationApi>) -> Self {
        Self { authorizations }
    }

    async fn send(&self, model: &ResourceAuthorizationModel, authorized: bool) -> Result<()> {
        let reference = [DefinitionResourceReference {
            id: Some(model.resource_id.clone()),
            name: None,
            resource_type: Some(model.resource_type.as_str().to_string()),
            authorized: Some(authorized),
        }];

        let result = if model.definition_id == 0 {
            self.authorizations
                .authorize_project_resources(&model.project_id, &reference)
                .await
        } else {
            self.authorizations
                .authorize_definition_resources(&model.project_id, model.definition_id, &reference)
                .await
        };
        result.remote(format!("authorizing resource {}", model.resource_id))?;
        Ok(())
    }

    /// Current authorization of the resource, `None` when it is no longer listed
    async fn lookup(&self, model: &ResourceAuthorizationModel) -> Result<Option<DefinitionResourceReference>> {
        let listed = if model.definition_id == 0 {
            self.authorizations
                .get_project_resources(&model.project_id, model.resource_type.as_str(), &model.resource_id)
                .await
        } else {
            self.authorizations
                .get_definition_resources(&model.project_id, model.definition_id)
                .await
        };

        let resources = match listed {
            Ok(resources) => resources,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => {
                return Err(ProviderError::remote(
                    format!("reading authorization of resource {}", model.resource_id),
                    e,
                ));
            }
        };

        Ok(resources
            .into_iter()
            .find(|r| r.id.as_deref() == Some(model.resource_id.as_str())))
    }
}

fn validate(model: &ResourceAuthorizationModel) -> Result<()> {
    if model.resource_type.is_definition_resource() {
        Ok(())
    } else {
        Err(ProviderError::InvalidAttribute {
            field: "type".to_string(),
            message: format!(
                "{} resources cannot be authorized for definitions",
                model.resource_type
            ),
        })
    }
}

#[async_trait]
impl Resource for ResourceAuthorizationResource {
    type Model = ResourceAuthorizationModel;

    const TYPE_NAME: &'static str = "azuredevops_resource_authorization";

    async fn create(&self, data: &mut ResourceData<ResourceAuthorizationModel>) -> Result<()> {
        validate(&data.attributes)?;
        self.send(&data.attributes, data.attributes.authorized).await?;

        data.id = data.attributes.resource_id.clone();
        info!(
            "Resource authorization created: {} {}",
            data.attributes.resource_type, data.id
        );

        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData<ResourceAuthorizationModel>) -> Result<()> {
        // an explicit denial at project level is not listed by the service
        if data.attributes.definition_id == 0 && !data.attributes.authorized {
            return Ok(());
        }

        match self.lookup(&data.attributes).await? {
            Some(reference) => {
                if let Some(resource_type) = reference
                    .resource_type
                    .as_deref()
                    .and_then(|t| t.parse::<AuthorizedResourceType>().ok())
                {
                    data.attributes.resource_type = resource_type;
                }
                data.attributes.authorized = reference.authorized.unwrap_or(data.attributes.authorized);
                data.id = data.attributes.resource_id.clone();
            }
            None if data.attributes.authorized => {
                warn!(
                    "Authorization of resource {} no longer exists, removing from state",
                    data.attributes.resource_id
                );
                data.clear_id();
            }
            None => {}
        }
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData<ResourceAuthorizationModel>) -> Result<()> {
        validate(&data.attributes)?;
        self.send(&data.attributes, data.attributes.authorized).await?;
        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData<ResourceAuthorizationModel>) -> Result<()> {
        if !data.has_id() {
            return Ok(());
        }
        self.send(&data.attributes, false).await?;

        info!("Resource authorization deleted: {}", data.id);
        data.clear_id();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;
    use crate::testing::FakeDevOps;
    use azdo_core::build::project_reference;
    use azdo_core::wire::build::BuildDefinition;

    const PROJECT: &str = "4a3b6f7e-22a4-4a9e-8c1b-5d8e2f1a9b30";

    fn resource(fake: &Arc<FakeDevOps>) -> ResourceAuthorizationResource {
        ResourceAuthorizationResource::new(fake.clone())
    }

    fn authorization(definition_id: i32) -> ResourceAuthorizationModel {
        ResourceAuthorizationModel {
            project_id: PROJECT.to_string(),
            resource_id: "svc-42".to_string(),
            definition_id,
            resource_type: AuthorizedResourceType::Endpoint,
            authorized: true,
        }
    }

    #[tokio::test]
    async fn test_project_level_authorization() {
        let fake = FakeDevOps::shared();
        let resource = resource(&fake);
        let mut data = ResourceData::new(authorization(0));

        resource.create(&mut data).await.unwrap();
        assert_eq!(data.id, "svc-42");
        assert_eq!(fake.state().project_resources.len(), 1);

        resource.delete(&mut data).await.unwrap();
        assert!(fake.state().project_resources.is_empty());
    }

    #[tokio::test]
    async fn test_definition_level_authorization() {
        let fake = FakeDevOps::shared();
        fake.state().build_definitions.insert(
            5,
            BuildDefinition {
                id: Some(5),
                project: Some(project_reference(PROJECT)),
                ..Default::default()
            },
        );
        let resource = resource(&fake);
        let mut data = ResourceData::new(authorization(5));

        resource.create(&mut data).await.unwrap();

        assert!(data.has_id());
        assert!(data.attributes.authorized);
        assert_eq!(fake.state().definition_resources[&5].len(), 1);
    }

    #[tokio::test]
    async fn test_read_of_deleted_definition_clears_id() {
        let fake = FakeDevOps::shared();
        let mut data = ResourceData::new(authorization(9)).with_id("svc-42");

        resource(&fake).read(&mut data).await.unwrap();

        assert!(!data.has_id());
    }

    #[tokio::test]
    async fn test_environment_is_not_a_definition_resource() {
        let fake = FakeDevOps::shared();
        let mut model = authorization(0);
        model.resource_type = AuthorizedResourceType::Environment;
        let mut data = ResourceData::new(model);

        let err = resource(&fake).create(&mut data).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidAttribute { .. }));
        assert_eq!(fake.state().requests, 0);
    }

    #[tokio::test]
    async fn test_import_is_unsupported() {
        let fake = FakeDevOps::shared();
        let err = resource(&fake).import("proj/svc-42").await.unwrap_err();
        assert!(matches!(err, ProviderError::Import(ImportError::Unsupported(_))));
    }
}
