//! Task reference codec
//!
//! Workflow tasks are referenced as `<name>@<version>` in configuration, and by
//! UUID plus version on the wire. The [`TaskRegistry`] maps between the two.

use crate::error::{ValidationError, ValidationKind};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use uuid::Uuid;

/// Task id and version pair as the service stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReference {
    pub task_id: Uuid,
    pub version: String,
}

/// Built-in task names and their well-known ids
const BUILTIN_TASKS: &[(&str, &str)] = &[
    ("AzureCLI", "46e4be58-730b-4389-8a2f-ea10b3e5e815"),
    ("Bash", "6c731c3c-3c68-459a-a5c9-bde6e6595b5b"),
    ("CmdLine", "d9bafed4-0b18-4f58-968d-86655b4d2ce9"),
    ("CopyFiles", "5bfb729a-a7c8-4a78-a7c3-8d717bb7c13c"),
    ("Delay", "28782b92-5e8e-4458-9751-a71cd1492bae"),
    ("DotNetCoreCLI", "5541a522-603c-47ad-91fc-a4b1d163081b"),
    ("DownloadBuildArtifacts", "a433f589-fce1-4460-9ee6-44a624aeb1fb"),
    ("ExtractFiles", "5e1e3830-fbfb-11e5-aab1-090c92bc4988"),
    ("InvokeRESTAPI", "9c3e8943-130d-4c78-ac63-8af81df62dfb"),
    ("ManualIntervention", "bcb64569-d51a-4af0-9c01-ea5d05b3b622"),
    ("PowerShell", "e213ff0f-5d5c-4791-802d-52ea3e7be1f1"),
    ("PublishBuildArtifacts", "2ff763a7-ce83-4e1f-bc89-0ae63477cebe"),
];

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d+(\.[\d*]+)*$").unwrap_or_else(|e| panic!("invalid version regex: {e}"))
    })
}

/// Name to task id lookup table
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    by_name: HashMap<String, Uuid>,
    by_id: HashMap<Uuid, String>,
}

impl TaskRegistry {
    /// An empty registry
    pub fn empty() -> Self {
        Self {
            by_name: HashMap::new(),
            by_id: HashMap::new(),
        }
    }

    /// Register (or replace) a task
    pub fn with_task(mut self, name: impl Into<String>, task_id: Uuid) -> Self {
        let name = name.into();
        if let Some(previous) = self.by_name.insert(name.clone(), task_id) {
            self.by_id.remove(&previous);
        }
        self.by_id.insert(task_id, name);
        self
    }

    pub fn id_of(&self, name: &str) -> Option<Uuid> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, task_id: &Uuid) -> Option<&str> {
        self.by_id.get(task_id).map(String::as_str)
    }

    /// Registered tasks sorted by name
    pub fn entries(&self) -> Vec<(&str, Uuid)> {
        let mut entries: Vec<_> = self
            .by_name
            .iter()
            .map(|(name, id)| (name.as_str(), *id))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Parse `name@version` into a task reference
    pub fn parse_task(&self, reference: &str) -> Result<TaskReference, ValidationError> {
        let Some((name, version)) = reference.split_once('@') else {
            return Err(ValidationError::new(
                ValidationKind::TaskFormatInvalid,
                "task",
                format!("task {:?} must have the form name@version", reference),
            ));
        };

        if name.is_empty() || !version_pattern().is_match(version) {
            return Err(ValidationError::new(
                ValidationKind::TaskFormatInvalid,
                "task",
                format!(
                    "task {:?} has an invalid version, expected digits separated by dots, e.g. 2.*",
                    reference
                ),
            ));
        }

        // tasks outside the registry read back as `<uuid>@<version>`
        let task_id = self
            .id_of(name)
            .or_else(|| Uuid::parse_str(name).ok())
            .ok_or_else(|| {
                ValidationError::new(
                    ValidationKind::UnknownTask,
                    "task",
                    format!("unknown task {:?}", name),
                )
            })?;

        Ok(TaskReference {
            task_id,
            version: version.to_string(),
        })
    }

    /// Render a task id and version back into `name@version`
    ///
    /// Unregistered ids render as `<uuid>@<version>`, which [`Self::parse_task`]
    /// accepts.
    pub fn render_task(&self, task_id: &Uuid, version: &str) -> String {
        match self.name_of(task_id) {
            Some(name) => format!("{}@{}", name, version),
            None => format!("{}@{}", task_id, version),
        }
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        BUILTIN_TASKS
            .iter()
            .filter_map(|(name, id)| Uuid::parse_str(id).ok().map(|id| (*name, id)))
            .fold(Self::empty(), |registry, (name, id)| registry.with_task(name, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CMD_LINE: &str = "d9bafed4-0b18-4f58-968d-86655b4d2ce9";

    #[test]
    fn test_default_registry_contains_builtin_tasks() {
        let registry = TaskRegistry::default();
        assert_eq!(registry.entries().len(), BUILTIN_TASKS.len());
        assert_eq!(
            registry.id_of("CmdLine"),
            Some(Uuid::parse_str(CMD_LINE).unwrap())
        );
    }

    #[test]
    fn test_parse_task() {
        let registry = TaskRegistry::default();
        let task = registry.parse_task("CmdLine@2.*").unwrap();
        assert_eq!(task.task_id, Uuid::parse_str(CMD_LINE).unwrap());
        assert_eq!(task.version, "2.*");

        assert_eq!(registry.parse_task("Bash@3.1.2").unwrap().version, "3.1.2");
    }

    #[test]
    fn test_parse_task_rejects_bad_versions() {
        let registry = TaskRegistry::default();
        for reference in ["CmdLine", "CmdLine@", "CmdLine@v2", "CmdLine@*", "@2", "CmdLine@2."] {
            let err = registry.parse_task(reference).unwrap_err();
            assert_eq!(err.kind, ValidationKind::TaskFormatInvalid, "{}", reference);
        }
    }

    #[test]
    fn test_parse_task_is_case_sensitive() {
        let registry = TaskRegistry::default();
        let err = registry.parse_task("cmdline@2.*").unwrap_err();
        assert_eq!(err.kind, ValidationKind::UnknownTask);
    }

    #[test]
    fn test_render_round_trips_every_registered_task() {
        let registry = TaskRegistry::default();
        for (name, id) in registry.entries() {
            let rendered = registry.render_task(&id, "1.*");
            assert_eq!(rendered, format!("{}@1.*", name));
            let parsed = registry.parse_task(&rendered).unwrap();
            assert_eq!(parsed.task_id, id);
            assert_eq!(parsed.version, "1.*");
        }
    }

    #[test]
    fn test_with_task_replaces_previous_id() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let registry = TaskRegistry::empty()
            .with_task("Custom", first)
            .with_task("Custom", second);
        assert_eq!(registry.id_of("Custom"), Some(second));
        assert!(registry.name_of(&first).is_none());
        assert_eq!(registry.render_task(&first, "1"), format!("{}@1", first));
    }

    #[test]
    fn test_unregistered_task_id_round_trips() {
        let registry = TaskRegistry::default();
        let id = Uuid::parse_str("e28912f1-0114-4464-802a-a3a35437fd16").unwrap();

        let rendered = registry.render_task(&id, "0.*");
        assert_eq!(rendered, "e28912f1-0114-4464-802a-a3a35437fd16@0.*");

        let parsed = registry.parse_task(&rendered).unwrap();
        assert_eq!(parsed.task_id, id);
        assert_eq!(parsed.version, "0.*");
    }
}
