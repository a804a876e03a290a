//! `azuredevops_release_definition`
//!
//! Classic release pipelines, served from the organization's release host.

use crate::error::{ProviderError, RemoteContext, Result};
use crate::resource::{
    Resource, ResourceData, definition_id, parse_import_number, resolve_project, split_import_id,
};
use async_trait::async_trait;
use azdo_client::{CoreApi, ReleaseDefinitionApi};
use azdo_core::DefinitionError;
use azdo_core::TaskRegistry;
use azdo_core::domain::release::ReleaseDefinitionModel;
use azdo_core::release::{
    expand_release_definition, flatten_release_definition, validate_release_definition,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const IMPORT_FORMAT: &str = "<project>/<definition id>";

pub struct ReleaseDefinitionResource {
    definitions: Arc<dyn ReleaseDefinitionApi>,
    projects: Arc<dyn CoreApi>,
    registry: Arc<TaskRegistry>,
}

impl ReleaseDefinitionResource {
    pub fn new(
        definitions: Arc<dyn ReleaseDefinitionApi>,
        projects: Arc<dyn CoreApi>,
        registry: Arc<TaskRegistry>,
    ) -> Self {
        Self {
            definitions,
            projects,
            registry,
        }
    }

    fn validate(&self, model: &ReleaseDefinitionModel) -> Result<()> {
        let errors = validate_release_definition(model, &self.registry);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::Validation(errors))
        }
    }
}

#[async_trait]
impl Resource for ReleaseDefinitionResource {
    type Model = ReleaseDefinitionModel;

    const TYPE_NAME: &'static str = "azuredevops_release_definition";
    const COMPUTED: &'static [&'static str] = &["revision", "source", "url", "created_on", "modified_on"];

    async fn create(&self, data: &mut ResourceData<ReleaseDefinitionModel>) -> Result<()> {
        self.validate(&data.attributes)?;
        let definition = expand_release_definition(&data.attributes, None, &self.registry)?;
        debug!(
            "Expanded release definition {} with {} stage(s)",
            data.attributes.name,
            definition.environments.as_ref().map_or(0, Vec::len)
        );

        let project = data.attributes.project_id.clone();
        let created = self
            .definitions
            .create_release_definition(&project, &definition)
            .await
            .remote("creating release definition")?;
        let id = created.id.ok_or_else(|| {
            DefinitionError::unexpected("release definition", "service returned no id")
        })?;

        data.id = id.to_string();
        info!("Release definition created: {} ({})", data.attributes.name, id);

        data.prior = Some(data.snapshot()?);
        data.attributes =
            flatten_release_definition(&project, &created, &data.prior_state()?, &self.registry)?;

        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData<ReleaseDefinitionModel>) -> Result<()> {
        let id = definition_id(&data.id)?;
        let project = data.attributes.project_id.clone();

        let definition = match self.definitions.get_release_definition(&project, id).await {
            Ok(definition) => definition,
            Err(e) if e.is_not_found() => {
                warn!("Release definition {} no longer exists, removing from state", id);
                data.clear_id();
                return Ok(());
            }
            Err(e) => {
                return Err(ProviderError::remote(
                    format!("reading release definition {}", id),
                    e,
                ));
            }
        };

        data.attributes =
            flatten_release_definition(&project, &definition, &data.prior_state()?, &self.registry)?;
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData<ReleaseDefinitionModel>) -> Result<()> {
        self.validate(&data.attributes)?;
        let id = definition_id(&data.id)?;
        let definition = expand_release_definition(&data.attributes, Some(id), &self.registry)?;

        self.definitions
            .update_release_definition(&data.attributes.project_id, &definition)
            .await
            .remote(format!("updating release definition {}", id))?;
        debug!("Release definition updated: {}", id);

        data.prior = Some(data.snapshot()?);
        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData<ReleaseDefinitionModel>) -> Result<()> {
        if !data.has_id() {
            return Ok(());
        }
        let id = definition_id(&data.id)?;

        self.definitions
            .delete_release_definition(&data.attributes.project_id, id)
            .await
            .remote(format!("deleting release definition {}", id))?;

        info!("Release definition deleted: {}", id);
        data.clear_id();
        Ok(())
    }

    async fn import(&self, import_id: &str) -> Result<ResourceData<ReleaseDefinitionModel>> {
        let (project, id) = split_import_id(import_id, IMPORT_FORMAT)?;
        let id = parse_import_number(import_id, id, IMPORT_FORMAT)?;
        let project_id = resolve_project(self.projects.as_ref(), project).await?;

        let mut data =
            ResourceData::new(ReleaseDefinitionModel::new(project_id, "")).with_id(id.to_string());
        self.read(&mut data).await?;
        if !data.has_id() {
            return Err(ProviderError::NotFound(format!("release definition {}", import_id)));
        }
        Ok(data)
    }
}
