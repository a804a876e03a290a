//! `azuredevops_build_definition`
//!
//! YAML build pipelines. Create optionally queues a first run on the
//! configured branch.

use crate::error::{ProviderError, RemoteContext, Result};
use crate::resource::{
    Resource, ResourceData, definition_id, parse_import_number, resolve_project, split_import_id,
};
use async_trait::async_trait;
use azdo_client::{BuildDefinitionApi, CoreApi, GitApi, PipelinesApi};
use azdo_core::DefinitionError;
use azdo_core::build::{
    expand_build_definition, first_run_ref, flatten_build_definition, short_branch_name,
    validate_build_definition,
};
use azdo_core::domain::build::{BuildDefinitionModel, RepositoryBlock};
use azdo_core::migration::{BUILD_DEFINITION_SCHEMA_VERSION, upgrade_build_definition};
use azdo_core::repository::RepoType;
use azdo_core::wire::pipelines::RunPipelineParameters;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

const IMPORT_FORMAT: &str = "<project>/<definition id>";

pub struct BuildDefinitionResource {
    definitions: Arc<dyn BuildDefinitionApi>,
    pipelines: Arc<dyn PipelinesApi>,
    git: Arc<dyn GitApi>,
    projects: Arc<dyn CoreApi>,
}

impl BuildDefinitionResource {
    pub fn new(
        definitions: Arc<dyn BuildDefinitionApi>,
        pipelines: Arc<dyn PipelinesApi>,
        git: Arc<dyn GitApi>,
        projects: Arc<dyn CoreApi>,
    ) -> Self {
        Self {
            definitions,
            pipelines,
            git,
            projects,
        }
    }

    /// Run the new pipeline on its configured branch
    ///
    /// Azure Repos branches are pinned to their current head commit; other
    /// repository kinds run at whatever the ref points to when the run starts.
    async fn queue_first_run(
        &self,
        project: &str,
        definition_id: i32,
        repository: &RepositoryBlock,
    ) -> Result<()> {
        let ref_name = first_run_ref(&repository.branch_name);

        let version = if repository.repo_type == RepoType::TfsGit {
            let filter = format!("heads/{}", short_branch_name(&repository.branch_name));
            let refs = self
                .git
                .get_refs(project, &repository.repo_id, &filter)
                .await
                .remote(format!("resolving head of {}", ref_name))?;
            refs.into_iter()
                .find(|r| r.name.as_deref() == Some(ref_name.as_str()))
                .and_then(|r| r.object_id)
        } else {
            None
        };

        let parameters = RunPipelineParameters::for_self_ref(ref_name.clone(), version);
        let run = self
            .pipelines
            .run_pipeline(project, definition_id, &parameters)
            .await
            .remote(format!("queuing first run of build definition {}", definition_id))?;

        info!(
            "Queued first run {} of build definition {} on {}",
            run.id.unwrap_or_default(),
            definition_id,
            ref_name
        );
        Ok(())
    }
}

fn validate(model: &BuildDefinitionModel) -> Result<()> {
    let errors = validate_build_definition(model);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ProviderError::Validation(errors))
    }
}

#[async_trait]
impl Resource for BuildDefinitionResource {
    type Model = BuildDefinitionModel;

    const TYPE_NAME: &'static str = "azuredevops_build_definition";
    const SCHEMA_VERSION: u32 = BUILD_DEFINITION_SCHEMA_VERSION;
    const COMPUTED: &'static [&'static str] = &["revision"];

    async fn create(&self, data: &mut ResourceData<BuildDefinitionModel>) -> Result<()> {
        validate(&data.attributes)?;
        let definition = expand_build_definition(&data.attributes, None)?;
        debug!(
            "Expanded build definition {} with {} trigger(s)",
            data.attributes.name,
            definition.triggers.as_ref().map_or(0, Vec::len)
        );

        let project = data.attributes.project_id.clone();
        let created = self
            .definitions
            .create_build_definition(&project, &definition)
            .await
            .remote("creating build definition")?;
        let id = created.id.ok_or_else(|| {
            DefinitionError::unexpected("build definition", "service returned no id")
        })?;

        data.id = id.to_string();
        info!("Build definition created: {} ({})", data.attributes.name, id);

        let configured = data.attributes.clone();
        data.prior = Some(data.snapshot()?);
        let mut flattened = flatten_build_definition(&created, &data.prior_state()?)?;
        flattened.features = configured.features.clone();
        data.attributes = flattened;

        if !configured.skip_first_run() {
            if let Some(repository) = &configured.repository {
                self.queue_first_run(&project, id, repository).await?;
            }
        }

        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData<BuildDefinitionModel>) -> Result<()> {
        let id = definition_id(&data.id)?;
        let project = data.attributes.project_id.clone();

        let definition = match self.definitions.get_build_definition(&project, id).await {
            Ok(definition) => definition,
            Err(e) if e.is_not_found() => {
                warn!("Build definition {} no longer exists, removing from state", id);
                data.clear_id();
                return Ok(());
            }
            Err(e) => {
                return Err(ProviderError::remote(
                    format!("reading build definition {}", id),
                    e,
                ));
            }
        };

        let mut model = flatten_build_definition(&definition, &data.prior_state()?)?;
        model.features = data.attributes.features.clone();
        if model.project_id.is_empty() {
            model.project_id = project;
        }
        data.attributes = model;
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData<BuildDefinitionModel>) -> Result<()> {
        validate(&data.attributes)?;
        let id = definition_id(&data.id)?;
        let definition = expand_build_definition(&data.attributes, Some(id))?;

        self.definitions
            .update_build_definition(&data.attributes.project_id, id, &definition)
            .await
            .remote(format!("updating build definition {}", id))?;
        debug!("Build definition updated: {}", id);

        data.prior = Some(data.snapshot()?);
        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData<BuildDefinitionModel>) -> Result<()> {
        if !data.has_id() {
            return Ok(());
        }
        let id = definition_id(&data.id)?;

        self.definitions
            .delete_build_definition(&data.attributes.project_id, id)
            .await
            .remote(format!("deleting build definition {}", id))?;

        info!("Build definition deleted: {}", id);
        data.clear_id();
        Ok(())
    }

    async fn import(&self, import_id: &str) -> Result<ResourceData<BuildDefinitionModel>> {
        let (project, id) = split_import_id(import_id, IMPORT_FORMAT)?;
        let id = parse_import_number(import_id, id, IMPORT_FORMAT)?;
        let project_id = resolve_project(self.projects.as_ref(), project).await?;

        let mut data = ResourceData::new(BuildDefinitionModel::new(project_id, "")).with_id(id.to_string());
        self.read(&mut data).await?;
        if !data.has_id() {
            return Err(ProviderError::NotFound(format!("build definition {}", import_id)));
        }
        Ok(data)
    }

    fn upgrade_state(&self, state: Value, from_version: u32) -> Result<Value> {
        Ok(upgrade_build_definition(state, from_version)?)
    }
}
