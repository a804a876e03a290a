//! In-memory stand-in for the Azure DevOps service

use async_trait::async_trait;
use azdo_client::{
    BuildDefinitionApi, BuildFolderApi, ClientError, CoreApi, GitApi, PipelinePermissionsApi,
    PipelinesApi, ReleaseDefinitionApi, ResourceAuthorizationApi, Result,
};
use azdo_core::wire::{TeamProjectReference, VariableValue};
use azdo_core::wire::build::{BuildDefinition, DefinitionResourceReference, Folder};
use azdo_core::wire::pipelines::{
    GitRef, PermissionResource, PipelineRun, ResourcePipelinePermissions, RunPipelineParameters,
    TeamProject,
};
use azdo_core::wire::release::ReleaseDefinition;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct FakeState {
    pub next_id: i32,
    pub build_definitions: BTreeMap<i32, BuildDefinition>,
    pub release_definitions: BTreeMap<i32, ReleaseDefinition>,
    pub folders: Vec<Folder>,
    pub definition_resources: BTreeMap<i32, Vec<DefinitionResourceReference>>,
    pub project_resources: Vec<DefinitionResourceReference>,
    /// Keyed by (project, resource type, resource id)
    pub permissions: BTreeMap<(String, String, String), ResourcePipelinePermissions>,
    pub runs: Vec<(String, i32, RunPipelineParameters)>,
    pub refs: Vec<GitRef>,
    pub projects: Vec<TeamProject>,
    pub requests: usize,
    pub fail_runs: bool,
}

#[derive(Default)]
pub struct FakeDevOps {
    state: Mutex<FakeState>,
}

impl FakeDevOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn add_project(&self, name: &str) -> String {
        let id = Uuid::new_v4();
        self.state().projects.push(TeamProject {
            id: Some(id),
            name: Some(name.to_string()),
            ..Default::default()
        });
        id.to_string()
    }

    pub fn add_ref(&self, name: &str, object_id: &str) {
        self.state().refs.push(GitRef {
            name: Some(name.to_string()),
            object_id: Some(object_id.to_string()),
        });
    }

    fn record(&self) -> MutexGuard<'_, FakeState> {
        let mut state = self.state();
        state.requests += 1;
        state
    }
}

/// The service never returns secret variable values
fn redact(variables: &mut Option<BTreeMap<String, VariableValue>>) {
    for value in variables.iter_mut().flat_map(|v| v.values_mut()) {
        if value.is_secret == Some(true) {
            value.value = None;
        }
    }
}

fn redact_release(definition: &mut ReleaseDefinition) {
    redact(&mut definition.variables);
    for environment in definition.environments.iter_mut().flatten() {
        redact(&mut environment.variables);
    }
}

fn not_found(what: &str) -> ClientError {
    ClientError::api_error(404, format!("{} does not exist", what))
}

#[async_trait]
impl BuildDefinitionApi for FakeDevOps {
    async fn create_build_definition(&self, _project: &str, definition: &BuildDefinition) -> Result<BuildDefinition> {
        let mut state = self.record();
        state.next_id += 1;
        let id = state.next_id;
        let mut created = definition.clone();
        created.id = Some(id);
        created.revision = Some(1);
        redact(&mut created.variables);
        state.build_definitions.insert(id, created.clone());
        Ok(created)
    }

    async fn get_build_definition(&self, _project: &str, definition_id: i32) -> Result<BuildDefinition> {
        self.record()
            .build_definitions
            .get(&definition_id)
            .cloned()
            .ok_or_else(|| not_found("build definition"))
    }

    async fn update_build_definition(
        &self,
        _project: &str,
        definition_id: i32,
        definition: &BuildDefinition,
    ) -> Result<BuildDefinition> {
        let mut state = self.record();
        let stored = state
            .build_definitions
            .get_mut(&definition_id)
            .ok_or_else(|| not_found("build definition"))?;
        if definition.revision != stored.revision {
            return Err(ClientError::api_error(409, "revision mismatch"));
        }
        let revision = stored.revision.unwrap_or(0) + 1;
        *stored = definition.clone();
        stored.id = Some(definition_id);
        stored.revision = Some(revision);
        redact(&mut stored.variables);
        Ok(stored.clone())
    }

    async fn delete_build_definition(&self, _project: &str, definition_id: i32) -> Result<()> {
        self.record()
            .build_definitions
            .remove(&definition_id)
            .map(|_| ())
            .ok_or_else(|| not_found("build definition"))
    }
}

#[async_trait]
impl ReleaseDefinitionApi for FakeDevOps {
    async fn create_release_definition(&self, _project: &str, definition: &ReleaseDefinition) -> Result<ReleaseDefinition> {
        let mut state = self.record();
        state.next_id += 1;
        let id = state.next_id;
        let mut created = definition.clone();
        created.id = Some(id);
        created.revision = Some(1);
        created.source = Some("restApi".to_string());
        redact_release(&mut created);
        state.release_definitions.insert(id, created.clone());
        Ok(created)
    }

    async fn get_release_definition(&self, _project: &str, definition_id: i32) -> Result<ReleaseDefinition> {
        self.record()
            .release_definitions
            .get(&definition_id)
            .cloned()
            .ok_or_else(|| {
                ClientError::api_error(
                    400,
                    "ReleaseDefinitionNotFoundException: definition does not exist",
                )
            })
    }

    async fn update_release_definition(&self, _project: &str, definition: &ReleaseDefinition) -> Result<ReleaseDefinition> {
        let mut state = self.record();
        let id = definition.id.unwrap_or_default();
        let stored = state
            .release_definitions
            .get_mut(&id)
            .ok_or_else(|| not_found("release definition"))?;
        if definition.revision != stored.revision {
            return Err(ClientError::api_error(409, "revision mismatch"));
        }
        let revision = stored.revision.unwrap_or(0) + 1;
        let source = stored.source.clone();
        *stored = definition.clone();
        stored.revision = Some(revision);
        stored.source = source;
        redact_release(stored);
        Ok(stored.clone())
    }

    async fn delete_release_definition(&self, _project: &str, definition_id: i32) -> Result<()> {
        self.record()
            .release_definitions
            .remove(&definition_id)
            .map(|_| ())
            .ok_or_else(|| not_found("release definition"))
    }
}

#[async_trait]
impl BuildFolderApi for FakeDevOps {
    async fn list_folders(&self, _project: &str, path: &str) -> Result<Vec<Folder>> {
        Ok(self
            .record()
            .folders
            .iter()
            .filter(|f| f.path.as_deref() == Some(path))
            .cloned()
            .collect())
    }

    async fn create_folder(&self, project: &str, folder: &Folder) -> Result<Folder> {
        let mut created = folder.clone();
        created.project = Some(TeamProjectReference {
            id: Uuid::parse_str(project).ok(),
            name: None,
        });
        self.record().folders.push(created.clone());
        Ok(created)
    }

    async fn update_folder(&self, _project: &str, path: &str, folder: &Folder) -> Result<Folder> {
        let mut state = self.record();
        let stored = state
            .folders
            .iter_mut()
            .find(|f| f.path.as_deref() == Some(path))
            .ok_or_else(|| not_found("folder"))?;
        stored.path = folder.path.clone();
        stored.description = folder.description.clone();
        Ok(stored.clone())
    }

    async fn delete_folder(&self, _project: &str, path: &str) -> Result<()> {
        let mut state = self.record();
        let before = state.folders.len();
        state.folders.retain(|f| f.path.as_deref() != Some(path));
        if state.folders.len() == before {
            return Err(not_found("folder"));
        }
        Ok(())
    }
}

fn upsert_resources(
    stored: &mut Vec<DefinitionResourceReference>,
    resources: &[DefinitionResourceReference],
) {
    for resource in resources {
        stored.retain(|r| r.id != resource.id);
        if resource.authorized == Some(true) {
            stored.push(resource.clone());
        }
    }
}

#[async_trait]
impl ResourceAuthorizationApi for FakeDevOps {
    async fn get_definition_resources(
        &self,
        _project: &str,
        definition_id: i32,
    ) -> Result<Vec<DefinitionResourceReference>> {
        let state = self.record();
        if !state.build_definitions.contains_key(&definition_id) {
            return Err(not_found("build definition"));
        }
        Ok(state
            .definition_resources
            .get(&definition_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn authorize_definition_resources(
        &self,
        _project: &str,
        definition_id: i32,
        resources: &[DefinitionResourceReference],
    ) -> Result<Vec<DefinitionResourceReference>> {
        let mut state = self.record();
        let stored = state.definition_resources.entry(definition_id).or_default();
        upsert_resources(stored, resources);
        Ok(resources.to_vec())
    }

    async fn get_project_resources(
        &self,
        _project: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<DefinitionResourceReference>> {
        Ok(self
            .record()
            .project_resources
            .iter()
            .filter(|r| {
                r.id.as_deref() == Some(resource_id)
                    && r.resource_type.as_deref() == Some(resource_type)
            })
            .cloned()
            .collect())
    }

    async fn authorize_project_resources(
        &self,
        _project: &str,
        resources: &[DefinitionResourceReference],
    ) -> Result<Vec<DefinitionResourceReference>> {
        let mut state = self.record();
        upsert_resources(&mut state.project_resources, resources);
        Ok(resources.to_vec())
    }
}

#[async_trait]
impl PipelinePermissionsApi for FakeDevOps {
    async fn get_pipeline_permissions(
        &self,
        project: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<ResourcePipelinePermissions> {
        let key = (project.to_string(), resource_type.to_string(), resource_id.to_string());
        Ok(self.record().permissions.get(&key).cloned().unwrap_or_else(|| {
            ResourcePipelinePermissions {
                resource: Some(PermissionResource {
                    id: Some(resource_id.to_string()),
                    resource_type: Some(resource_type.to_string()),
                    name: None,
                }),
                ..Default::default()
            }
        }))
    }

    async fn update_pipeline_permissions(
        &self,
        project: &str,
        resource_type: &str,
        resource_id: &str,
        permissions: &ResourcePipelinePermissions,
    ) -> Result<ResourcePipelinePermissions> {
        let key = (project.to_string(), resource_type.to_string(), resource_id.to_string());
        let mut state = self.record();
        let stored = state.permissions.entry(key).or_insert_with(|| ResourcePipelinePermissions {
            resource: Some(PermissionResource {
                id: Some(resource_id.to_string()),
                resource_type: Some(resource_type.to_string()),
                name: None,
            }),
            ..Default::default()
        });

        if let Some(all) = permissions.all_pipelines {
            stored.all_pipelines = all.authorized.then_some(all);
        }
        for pipeline in permissions.pipelines.iter().flatten() {
            let list = stored.pipelines.get_or_insert_with(Vec::new);
            list.retain(|p| p.id != pipeline.id);
            if pipeline.authorized {
                list.push(*pipeline);
            }
        }
        Ok(stored.clone())
    }
}

#[async_trait]
impl PipelinesApi for FakeDevOps {
    async fn run_pipeline(
        &self,
        project: &str,
        pipeline_id: i32,
        parameters: &RunPipelineParameters,
    ) -> Result<PipelineRun> {
        let mut state = self.record();
        if state.fail_runs {
            return Err(ClientError::api_error(400, "no YAML file at the requested ref"));
        }
        state
            .runs
            .push((project.to_string(), pipeline_id, parameters.clone()));
        Ok(PipelineRun {
            id: Some(state.runs.len() as i32),
            name: Some("20260101.1".to_string()),
            state: Some("inProgress".to_string()),
        })
    }
}

#[async_trait]
impl GitApi for FakeDevOps {
    async fn get_refs(&self, _project: &str, _repository_id: &str, filter: &str) -> Result<Vec<GitRef>> {
        let prefix = format!("refs/{}", filter);
        Ok(self
            .record()
            .refs
            .iter()
            .filter(|r| r.name.as_deref().is_some_and(|n| n.starts_with(&prefix)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CoreApi for FakeDevOps {
    async fn get_project(&self, project: &str) -> Result<TeamProject> {
        self.record()
            .projects
            .iter()
            .find(|p| {
                p.name.as_deref() == Some(project)
                    || p.id.map(|id| id.to_string()).as_deref() == Some(project)
            })
            .cloned()
            .ok_or_else(|| not_found("project"))
    }
}
