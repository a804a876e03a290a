//! Build definition resource model

use crate::days::DayOfWeek;
use crate::filters::FilterBlock;
use crate::repository::RepoType;
use crate::variables::Variable;
use crate::wire::build::QueueStatus;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PATH: &str = "\\";
pub const DEFAULT_AGENT_POOL: &str = "Azure Pipelines";
pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_INITIAL_BRANCH: &str = "Managed by Terraform";
pub const DEFAULT_TIME_ZONE: &str = "(UTC) Coordinated Universal Time";

/// A YAML build pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildDefinitionModel {
    pub project_id: String,
    pub name: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Assigned by the service
    #[serde(default)]
    pub revision: Option<i32>,
    #[serde(default)]
    pub repository: Option<RepositoryBlock>,
    #[serde(default)]
    pub ci_trigger: Option<CiTrigger>,
    #[serde(default)]
    pub pull_request_trigger: Option<PullRequestTrigger>,
    #[serde(default)]
    pub schedules: Vec<BuildSchedule>,
    #[serde(default)]
    pub build_completion_trigger: Vec<BuildCompletionTrigger>,
    #[serde(default)]
    pub variable: Vec<Variable>,
    #[serde(default)]
    pub variable_groups: Vec<i32>,
    #[serde(default = "default_agent_pool")]
    pub agent_pool_name: String,
    #[serde(default)]
    pub features: Option<Features>,
    #[serde(default)]
    pub queue_status: QueueStatus,
    #[serde(default)]
    pub job_authorization_scope: JobAuthorizationScope,
}

impl BuildDefinitionModel {
    pub fn new(project_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            path: default_path(),
            revision: None,
            repository: None,
            ci_trigger: None,
            pull_request_trigger: None,
            schedules: Vec::new(),
            build_completion_trigger: Vec::new(),
            variable: Vec::new(),
            variable_groups: Vec::new(),
            agent_pool_name: default_agent_pool(),
            features: None,
            queue_status: QueueStatus::default(),
            job_authorization_scope: JobAuthorizationScope::default(),
        }
    }

    pub fn with_repository(mut self, repository: RepositoryBlock) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Whether Create should skip queuing the first run
    pub fn skip_first_run(&self) -> bool {
        self.features.as_ref().is_none_or(|f| f.skip_first_run)
    }
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

fn default_agent_pool() -> String {
    DEFAULT_AGENT_POOL.to_string()
}

fn default_true() -> bool {
    true
}

/// Source repository of a build definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryBlock {
    pub repo_type: RepoType,
    pub repo_id: String,
    #[serde(default = "default_branch")]
    pub branch_name: String,
    pub yml_path: String,
    #[serde(default)]
    pub service_connection_id: String,
    #[serde(default)]
    pub github_enterprise_url: String,
    #[serde(default = "default_true")]
    pub report_build_status: bool,
    /// Clone URL, computed
    #[serde(default)]
    pub url: String,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

impl RepositoryBlock {
    pub fn new(repo_type: RepoType, repo_id: impl Into<String>, yml_path: impl Into<String>) -> Self {
        Self {
            repo_type,
            repo_id: repo_id.into(),
            branch_name: default_branch(),
            yml_path: yml_path.into(),
            service_connection_id: String::new(),
            github_enterprise_url: String::new(),
            report_build_status: true,
            url: String::new(),
        }
    }
}

/// Continuous integration trigger
///
/// Either `use_yaml` defers to the pipeline file, or `override` carries the
/// settings inline. Exactly one of the two applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CiTrigger {
    #[serde(default)]
    pub use_yaml: bool,
    #[serde(default, rename = "override")]
    pub override_: Option<CiOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiOverride {
    #[serde(default = "default_true")]
    pub batch: bool,
    #[serde(default)]
    pub branch_filter: FilterBlock,
    #[serde(default)]
    pub path_filter: FilterBlock,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_builds_per_branch: i32,
    #[serde(default)]
    pub polling_interval: i32,
    /// Assigned by the service
    #[serde(default)]
    pub polling_job_id: String,
}

fn default_max_concurrent() -> i32 {
    1
}

impl Default for CiOverride {
    fn default() -> Self {
        Self {
            batch: true,
            branch_filter: FilterBlock::default(),
            path_filter: FilterBlock::default(),
            max_concurrent_builds_per_branch: default_max_concurrent(),
            polling_interval: 0,
            polling_job_id: String::new(),
        }
    }
}

/// Who must comment before a pull request build runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentRequired {
    #[default]
    #[serde(rename = "")]
    Off,
    All,
    NonTeamMembers,
}

impl CommentRequired {
    /// `(isCommentRequiredForPullRequest, requireCommentsForNonTeamMembersOnly)`
    pub fn to_flags(self) -> (bool, Option<bool>) {
        match self {
            CommentRequired::Off => (false, None),
            CommentRequired::All => (true, Some(false)),
            CommentRequired::NonTeamMembers => (true, Some(true)),
        }
    }

    pub fn from_flags(required: bool, non_team_only: bool) -> Self {
        match (required, non_team_only) {
            (false, _) => CommentRequired::Off,
            (true, false) => CommentRequired::All,
            (true, true) => CommentRequired::NonTeamMembers,
        }
    }
}

/// Pull request validation trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestTrigger {
    #[serde(default)]
    pub use_yaml: bool,
    #[serde(default = "default_initial_branch")]
    pub initial_branch: String,
    pub forks: Forks,
    #[serde(default)]
    pub comment_required: CommentRequired,
    #[serde(default, rename = "override")]
    pub override_: Option<PullRequestOverride>,
}

fn default_initial_branch() -> String {
    DEFAULT_INITIAL_BRANCH.to_string()
}

impl PullRequestTrigger {
    pub fn yaml(forks: Forks) -> Self {
        Self {
            use_yaml: true,
            initial_branch: default_initial_branch(),
            forks,
            comment_required: CommentRequired::Off,
            override_: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forks {
    pub enabled: bool,
    pub share_secrets: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestOverride {
    #[serde(default = "default_true")]
    pub auto_cancel: bool,
    #[serde(default)]
    pub branch_filter: FilterBlock,
    #[serde(default)]
    pub path_filter: FilterBlock,
}

impl Default for PullRequestOverride {
    fn default() -> Self {
        Self {
            auto_cancel: true,
            branch_filter: FilterBlock::default(),
            path_filter: FilterBlock::default(),
        }
    }
}

/// Scheduled build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSchedule {
    #[serde(default)]
    pub branch_filter: FilterBlock,
    #[serde(default)]
    pub days_to_build: Vec<DayOfWeek>,
    #[serde(default = "default_true")]
    pub schedule_only_with_changes: bool,
    #[serde(default)]
    pub start_hours: i32,
    #[serde(default)]
    pub start_minutes: i32,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// Assigned by the service
    #[serde(default)]
    pub schedule_job_id: String,
}

fn default_time_zone() -> String {
    DEFAULT_TIME_ZONE.to_string()
}

impl Default for BuildSchedule {
    fn default() -> Self {
        Self {
            branch_filter: FilterBlock::default(),
            days_to_build: Vec::new(),
            schedule_only_with_changes: true,
            start_hours: 0,
            start_minutes: 0,
            time_zone: default_time_zone(),
            schedule_job_id: String::new(),
        }
    }
}

/// Run after another definition's build completes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildCompletionTrigger {
    pub build_definition_id: i32,
    #[serde(default)]
    pub branch_filter: FilterBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    #[serde(default = "default_true")]
    pub skip_first_run: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            skip_first_run: true,
        }
    }
}

/// Scope of the job access token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobAuthorizationScope {
    #[default]
    ProjectCollection,
    Project,
}

impl JobAuthorizationScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobAuthorizationScope::ProjectCollection => "projectCollection",
            JobAuthorizationScope::Project => "project",
        }
    }

    /// Lenient parse; unrecognized values fall back to the default
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("project") {
            JobAuthorizationScope::Project
        } else {
            JobAuthorizationScope::ProjectCollection
        }
    }
}
