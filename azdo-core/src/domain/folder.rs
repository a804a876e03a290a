//! Build folder resource model

use serde::{Deserialize, Serialize};

/// A folder that groups build definitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFolderModel {
    pub project_id: String,
    pub path: String,
    #[serde(default)]
    pub description: String,
}

impl BuildFolderModel {
    pub fn new(project_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            path: path.into(),
            description: String::new(),
        }
    }
}
