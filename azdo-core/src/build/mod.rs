//! Build definition codec
//!
//! - [`validate_build_definition`] runs every inter-field rule in one pass
//! - [`expand_build_definition`] turns the resource model into the service's
//!   `BuildDefinition`
//! - [`flatten_build_definition`] reads a `BuildDefinition` back into the model

pub mod triggers;

use crate::convert::parse_bool;
use crate::domain::build::{
    BuildDefinitionModel, DEFAULT_AGENT_POOL, DEFAULT_BRANCH, JobAuthorizationScope,
    RepositoryBlock,
};
use crate::error::{DefinitionError, Result, ValidationError, ValidationKind};
use crate::prior::PriorState;
use crate::repository::{RepoType, enterprise_url_from_clone, synthesize_urls};
use crate::validate::{validate_path, validate_url};
use crate::variables::{expand_variables, flatten_variables, normalize_group_ids, validate_variables};
use crate::wire::TeamProjectReference;
use crate::wire::build::{
    AgentPoolQueue, BuildDefinition, BuildRepository, TaskAgentPoolReference, VariableGroupRef,
    YamlProcess,
};
use std::collections::BTreeMap;
use triggers::BuildTrigger;
use uuid::Uuid;

pub const PROPERTY_CONNECTED_SERVICE_ID: &str = "connectedServiceId";
pub const PROPERTY_API_URL: &str = "apiUrl";
pub const PROPERTY_REPORT_BUILD_STATUS: &str = "reportBuildStatus";

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Check every rule that spans more than one field
///
/// Returns all failures, in field order.
pub fn validate_build_definition(model: &BuildDefinitionModel) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Err(e) = validate_path("path", &model.path) {
        errors.push(e);
    }

    match &model.repository {
        None => errors.push(ValidationError::new(
            ValidationKind::RepositoryBlockMissing,
            "repository",
            "a repository block is required",
        )),
        Some(repository) => errors.extend(validate_repository(repository)),
    }

    if let Some(ci) = &model.ci_trigger {
        if let Err(e) = check_yaml_or_override("ci_trigger", ci.use_yaml, ci.override_.is_some()) {
            errors.push(e);
        }
    }
    if let Some(pr) = &model.pull_request_trigger {
        if let Err(e) = check_yaml_or_override(
            "pull_request_trigger",
            pr.use_yaml,
            pr.override_.is_some(),
        ) {
            errors.push(e);
        }
    }

    if let Err(e) = validate_variables("variable", &model.variable) {
        errors.push(e);
    }

    errors
}

fn validate_repository(repository: &RepositoryBlock) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if repository.repo_type.requires_service_connection()
        && repository.service_connection_id.is_empty()
    {
        let message = match repository.repo_type {
            RepoType::Bitbucket => "bitbucket repositories need a referenced service connection ID",
            _ => "GitHub Enterprise repositories need a referenced service connection ID",
        };
        errors.push(ValidationError::new(
            ValidationKind::ServiceConnectionRequired,
            "repository.service_connection_id",
            message,
        ));
    }

    if repository.repo_type == RepoType::GitHubEnterprise {
        if let Err(e) = validate_url(
            "repository.github_enterprise_url",
            &repository.github_enterprise_url,
        ) {
            errors.push(e);
        }
    }

    errors
}

fn check_yaml_or_override(
    field: &str,
    use_yaml: bool,
    has_override: bool,
) -> std::result::Result<(), ValidationError> {
    match (use_yaml, has_override) {
        (true, true) => Err(ValidationError::new(
            ValidationKind::ConflictingBlocks,
            field,
            "use_yaml and override can not both be set",
        )),
        (false, false) => Err(ValidationError::new(
            ValidationKind::ConflictingBlocks,
            field,
            "override is required when use_yaml is false",
        )),
        _ => Ok(()),
    }
}

/// Build the service object for a model
///
/// `id` is the existing definition id on update, `None` on create.
pub fn expand_build_definition(
    model: &BuildDefinitionModel,
    id: Option<i32>,
) -> Result<BuildDefinition> {
    if let Some(error) = validate_build_definition(model).into_iter().next() {
        return Err(error.into());
    }
    let Some(repository) = &model.repository else {
        return Err(ValidationError::new(
            ValidationKind::RepositoryBlockMissing,
            "repository",
            "a repository block is required",
        )
        .into());
    };

    let variables = expand_variables("variable", &model.variable)?;
    let variable_groups = normalize_group_ids(&model.variable_groups)
        .into_iter()
        .map(|id| VariableGroupRef { id })
        .collect();

    Ok(BuildDefinition {
        id,
        name: Some(model.name.clone()),
        path: Some(model.path.clone()),
        revision: model.revision,
        project: Some(project_reference(&model.project_id)),
        repository: Some(expand_repository(repository)),
        process: Some(YamlProcess::new(repository.yml_path.clone())),
        queue: Some(AgentPoolQueue {
            id: None,
            name: Some(model.agent_pool_name.clone()),
            pool: Some(TaskAgentPoolReference {
                id: None,
                name: Some(model.agent_pool_name.clone()),
                is_hosted: None,
            }),
        }),
        queue_status: Some(model.queue_status),
        job_authorization_scope: Some(model.job_authorization_scope.as_str().to_string()),
        triggers: Some(
            model_triggers(model)
                .iter()
                .map(BuildTrigger::encode)
                .collect(),
        ),
        variables: Some(variables),
        variable_groups: Some(variable_groups),
        definition_type: Some("build".to_string()),
        quality: Some("definition".to_string()),
    })
}

fn model_triggers(model: &BuildDefinitionModel) -> Vec<BuildTrigger> {
    let mut triggers = Vec::new();
    if let Some(ci) = &model.ci_trigger {
        triggers.push(BuildTrigger::ContinuousIntegration(ci.clone()));
    }
    if let Some(pr) = &model.pull_request_trigger {
        triggers.push(BuildTrigger::PullRequest(pr.clone()));
    }
    if !model.schedules.is_empty() {
        triggers.push(BuildTrigger::Schedule(model.schedules.clone()));
    }
    triggers.extend(
        model
            .build_completion_trigger
            .iter()
            .cloned()
            .map(BuildTrigger::BuildCompletion),
    );
    triggers
}

/// Project reference from an id that may be a UUID or a project name
pub fn project_reference(project: &str) -> TeamProjectReference {
    match Uuid::parse_str(project) {
        Ok(id) => TeamProjectReference {
            id: Some(id),
            name: None,
        },
        Err(_) => TeamProjectReference {
            id: None,
            name: Some(project.to_string()),
        },
    }
}

fn expand_repository(repository: &RepositoryBlock) -> BuildRepository {
    let urls = synthesize_urls(
        repository.repo_type,
        &repository.repo_id,
        Some(repository.github_enterprise_url.as_str()),
    );

    let mut properties = BTreeMap::new();
    if !repository.service_connection_id.is_empty() {
        properties.insert(
            PROPERTY_CONNECTED_SERVICE_ID.to_string(),
            repository.service_connection_id.clone(),
        );
    }
    if let Some(urls) = &urls {
        properties.insert(PROPERTY_API_URL.to_string(), urls.api_url.clone());
    }
    properties.insert(
        PROPERTY_REPORT_BUILD_STATUS.to_string(),
        repository.report_build_status.to_string(),
    );

    let url = match urls {
        Some(urls) => Some(urls.clone_url),
        None => Some(repository.url.clone()).filter(|u| !u.is_empty()),
    };

    BuildRepository {
        id: Some(repository.repo_id.clone()),
        name: Some(repository.repo_id.clone()),
        url,
        default_branch: Some(repository.branch_name.clone()),
        repo_type: Some(repository.repo_type.as_str().to_string()),
        properties: Some(properties),
    }
}

/// Read a service object back into the model
///
/// Secret variables are recovered through `prior`. Fields the service does not
/// store (`features`) are left unset for the caller to carry over.
pub fn flatten_build_definition(
    definition: &BuildDefinition,
    prior: &dyn PriorState,
) -> Result<BuildDefinitionModel> {
    let project_id = definition
        .project
        .as_ref()
        .and_then(|p| p.id.map(|id| id.to_string()).or_else(|| p.name.clone()))
        .unwrap_or_default();

    let mut model = BuildDefinitionModel::new(project_id, definition.name.clone().unwrap_or_default());
    model.path = definition.path.clone().unwrap_or_else(|| "\\".to_string());
    model.revision = definition.revision;

    if let Some(repository) = &definition.repository {
        let yml_path = definition
            .process
            .as_ref()
            .and_then(|p| p.yaml_filename.clone())
            .unwrap_or_default();
        model.repository = Some(flatten_repository(repository, yml_path)?);
    }

    for value in definition.triggers.iter().flatten() {
        match BuildTrigger::decode(value)? {
            Some(BuildTrigger::ContinuousIntegration(ci)) => model.ci_trigger = Some(ci),
            Some(BuildTrigger::PullRequest(pr)) => model.pull_request_trigger = Some(pr),
            Some(BuildTrigger::Schedule(schedules)) => model.schedules.extend(schedules),
            Some(BuildTrigger::BuildCompletion(trigger)) => {
                model.build_completion_trigger.push(trigger)
            }
            None => {}
        }
    }

    model.variable = flatten_variables("variable", definition.variables.as_ref(), prior);
    model.variable_groups = normalize_group_ids(
        &definition
            .variable_groups
            .iter()
            .flatten()
            .map(|g| g.id)
            .collect::<Vec<_>>(),
    );

    model.agent_pool_name = definition
        .queue
        .as_ref()
        .and_then(|q| {
            q.pool
                .as_ref()
                .and_then(|p| p.name.clone())
                .or_else(|| q.name.clone())
        })
        .unwrap_or_else(|| DEFAULT_AGENT_POOL.to_string());
    model.queue_status = definition.queue_status.unwrap_or_default();
    model.job_authorization_scope = definition
        .job_authorization_scope
        .as_deref()
        .map(JobAuthorizationScope::parse)
        .unwrap_or_default();

    Ok(model)
}

fn flatten_repository(repository: &BuildRepository, yml_path: String) -> Result<RepositoryBlock> {
    let repo_type_name = repository.repo_type.clone().unwrap_or_default();
    let repo_type: RepoType = repo_type_name
        .parse()
        .map_err(|e: String| DefinitionError::unexpected("repository", e))?;

    let properties = repository.properties.clone().unwrap_or_default();
    let url = repository.url.clone().unwrap_or_default();
    let github_enterprise_url = if repo_type == RepoType::GitHubEnterprise {
        enterprise_url_from_clone(&url).unwrap_or_default()
    } else {
        String::new()
    };

    Ok(RepositoryBlock {
        repo_type,
        repo_id: repository
            .id
            .clone()
            .or_else(|| repository.name.clone())
            .unwrap_or_default(),
        branch_name: repository
            .default_branch
            .clone()
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
        yml_path,
        service_connection_id: properties
            .get(PROPERTY_CONNECTED_SERVICE_ID)
            .cloned()
            .unwrap_or_default(),
        github_enterprise_url,
        report_build_status: properties
            .get(PROPERTY_REPORT_BUILD_STATUS)
            .and_then(|v| parse_bool(v))
            .unwrap_or(true),
        url,
    })
}

/// Ref the first run is queued on, e.g. `refs/heads/main` for `main` or `refs/heads/main`
pub fn first_run_ref(branch_name: &str) -> String {
    format!(
        "{}{}",
        BRANCH_REF_PREFIX,
        branch_name.trim_start_matches(BRANCH_REF_PREFIX)
    )
}

/// Branch name without the `refs/heads/` prefix
pub fn short_branch_name(branch_name: &str) -> &str {
    branch_name.trim_start_matches(BRANCH_REF_PREFIX)
}
