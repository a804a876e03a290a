//! `azuredevops_pipeline_authorization`
//!
//! Grants a protected resource (service connection, agent queue, variable
//! group, environment or repository) to one pipeline, or to every pipeline
//! when no pipeline id is given.

use crate::error::{ImportError, ProviderError, RemoteContext, Result};
use crate::resource::{Resource, ResourceData};
use async_trait::async_trait;
use azdo_client::PipelinePermissionsApi;
use azdo_core::domain::authorization::{AuthorizedResourceType, PipelineAuthorizationModel};
use azdo_core::wire::pipelines::{Permission, PipelinePermission, ResourcePipelinePermissions};
use std::sync::Arc;
use tracing::{info, warn};

const IMPORT_FORMAT: &str = "<project>/<type>/<resource id>[/<pipeline id>]";

pub struct PipelineAuthorizationResource {
    permissions: Arc<dyn PipelinePermissionsApi>,
}

impl PipelineAuthorizationResource {
    pub fn new(permissions: Arc<dyn PipelinePermissionsApi>) -> Self {
        Self { permissions }
    }

    async fn set_authorized(&self, model: &PipelineAuthorizationModel, authorized: bool) -> Result<()> {
        let request = match model.pipeline_id {
            Some(id) => ResourcePipelinePermissions {
                pipelines: Some(vec![PipelinePermission { id, authorized }]),
                ..Default::default()
            },
            None => ResourcePipelinePermissions {
                all_pipelines: Some(Permission { authorized }),
                ..Default::default()
            },
        };

        self.permissions
            .update_pipeline_permissions(
                model.pipeline_project(),
                model.resource_type.as_str(),
                &model.api_resource_id(),
                &request,
            )
            .await
            .remote(format!(
                "updating pipeline permissions of {} {}",
                model.resource_type, model.resource_id
            ))?;
        Ok(())
    }
}

/// Whether the permissions still carry the grant described by `model`
fn is_granted(model: &PipelineAuthorizationModel, permissions: &ResourcePipelinePermissions) -> bool {
    match model.pipeline_id {
        Some(id) => permissions
            .pipelines
            .iter()
            .flatten()
            .any(|p| p.id == id && p.authorized),
        None => permissions.all_pipelines.is_some_and(|p| p.authorized),
    }
}

#[async_trait]
impl Resource for PipelineAuthorizationResource {
    type Model = PipelineAuthorizationModel;

    const TYPE_NAME: &'static str = "azuredevops_pipeline_authorization";

    async fn create(&self, data: &mut ResourceData<PipelineAuthorizationModel>) -> Result<()> {
        self.set_authorized(&data.attributes, true).await?;

        data.id = data.attributes.composite_id();
        info!("Pipeline authorization created: {}", data.id);

        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData<PipelineAuthorizationModel>) -> Result<()> {
        let model = &data.attributes;
        let permissions = match self
            .permissions
            .get_pipeline_permissions(
                model.pipeline_project(),
                model.resource_type.as_str(),
                &model.api_resource_id(),
            )
            .await
        {
            Ok(permissions) => permissions,
            Err(e) if e.is_not_found() => ResourcePipelinePermissions::default(),
            Err(e) => {
                return Err(ProviderError::remote(
                    format!("reading pipeline permissions of {}", data.id),
                    e,
                ));
            }
        };

        if !is_granted(model, &permissions) {
            warn!("Pipeline authorization {} no longer exists, removing from state", data.id);
            data.clear_id();
            return Ok(());
        }

        if let Some(resource) = &permissions.resource {
            if let Some(resource_type) = resource
                .resource_type
                .as_deref()
                .and_then(|t| t.parse::<AuthorizedResourceType>().ok())
            {
                data.attributes.resource_type = resource_type;
            }
            if let Some(id) = &resource.id {
                // repositories come back as <project>.<repository>
                data.attributes.resource_id = match data.attributes.resource_type {
                    AuthorizedResourceType::Repository => match id.split_once('.') {
                        Some((_, repository)) => repository.to_string(),
                        None => id.clone(),
                    },
                    _ => id.clone(),
                };
            }
        }
        data.id = data.attributes.composite_id();
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData<PipelineAuthorizationModel>) -> Result<()> {
        self.set_authorized(&data.attributes, true).await?;
        data.id = data.attributes.composite_id();
        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData<PipelineAuthorizationModel>) -> Result<()> {
        if !data.has_id() {
            return Ok(());
        }
        self.set_authorized(&data.attributes, false).await?;

        info!("Pipeline authorization deleted: {}", data.id);
        data.clear_id();
        Ok(())
    }

    async fn import(&self, import_id: &str) -> Result<ResourceData<PipelineAuthorizationModel>> {
        let model = parse_import_id(import_id)?;
        let mut data = ResourceData::new(model).with_id(import_id);
        self.read(&mut data).await?;
        if !data.has_id() {
            return Err(ProviderError::NotFound(format!("pipeline authorization {}", import_id)));
        }
        Ok(data)
    }
}

/// `project/type/resource[/pipeline]`
fn parse_import_id(import_id: &str) -> Result<PipelineAuthorizationModel> {
    if import_id.trim().is_empty() {
        return Err(ImportError::ImportIdMissing {
            expected: IMPORT_FORMAT,
        }
        .into());
    }
    let invalid = || {
        ProviderError::from(ImportError::ImportIdInvalidFormat {
            id: import_id.to_string(),
            expected: IMPORT_FORMAT,
        })
    };

    let parts: Vec<&str> = import_id.split('/').collect();
    if !(3..=4).contains(&parts.len()) || parts.iter().any(|p| p.is_empty()) {
        return Err(invalid());
    }

    let resource_type: AuthorizedResourceType = parts[1].parse().map_err(|_| invalid())?;
    let pipeline_id = match parts.get(3) {
        Some(part) => match part.parse::<i32>() {
            Ok(id) if id >= 1 => Some(id),
            _ => return Err(invalid()),
        },
        None => None,
    };

    Ok(PipelineAuthorizationModel {
        project_id: parts[0].to_string(),
        pipeline_project_id: None,
        resource_id: parts[2].to_string(),
        resource_type,
        pipeline_id,
    })
}
