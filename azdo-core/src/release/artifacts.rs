//! Build artifact codec

use crate::domain::release::{BuildArtifact, LatestVersion, SpecificVersion};
use crate::wire::release::{Artifact, ArtifactSourceReference};
use std::collections::BTreeMap;

const ARTIFACT_TYPE_BUILD: &str = "Build";

const REF_DEFAULT_VERSION_BRANCH: &str = "defaultVersionBranch";
const REF_DEFAULT_VERSION_SPECIFIC: &str = "defaultVersionSpecific";
const REF_DEFAULT_VERSION_TAGS: &str = "defaultVersionTags";
const REF_DEFAULT_VERSION_TYPE: &str = "defaultVersionType";
const REF_DEFINITION: &str = "definition";
const REF_DEFINITIONS: &str = "definitions";
const REF_IS_MULTI_DEFINITION_TYPE: &str = "IsMultiDefinitionType";
const REF_PROJECT: &str = "project";

/// Which build a release picks up by default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultVersionType {
    Latest,
    LatestWithBranchAndTags,
    LatestWithBuildDefinitionBranchAndTags,
    SpecificVersion,
    SelectDuringReleaseCreation,
}

impl DefaultVersionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latest => "latestType",
            Self::LatestWithBranchAndTags => "latestWithBranchAndTagsType",
            Self::LatestWithBuildDefinitionBranchAndTags => {
                "latestWithBuildDefinitionBranchAndTagsType"
            }
            Self::SpecificVersion => "specificVersionType",
            Self::SelectDuringReleaseCreation => "selectDuringReleaseCreationType",
        }
    }

    /// Unknown values fall back to select-during-release-creation
    pub fn parse(s: &str) -> Self {
        [
            Self::Latest,
            Self::LatestWithBranchAndTags,
            Self::LatestWithBuildDefinitionBranchAndTags,
            Self::SpecificVersion,
        ]
        .into_iter()
        .find(|t| t.as_str().eq_ignore_ascii_case(s))
        .unwrap_or(Self::SelectDuringReleaseCreation)
    }

    /// Derive the type from the artifact's version blocks
    ///
    /// A `specify` block takes precedence over `latest`. With neither block
    /// carrying a value the release asks for the build at creation time.
    pub fn of(artifact: &BuildArtifact) -> Self {
        match (&artifact.latest, &artifact.specify) {
            (_, Some(specify)) if !specify.version.is_empty() => Self::SpecificVersion,
            (_, Some(_)) => Self::SelectDuringReleaseCreation,
            (Some(latest), None) => match (latest.branch.is_empty(), latest.tags.is_empty()) {
                (false, false) => Self::LatestWithBranchAndTags,
                (true, false) => Self::LatestWithBuildDefinitionBranchAndTags,
                _ => Self::Latest,
            },
            (None, None) => Self::SelectDuringReleaseCreation,
        }
    }
}

fn reference(id: impl Into<String>) -> ArtifactSourceReference {
    ArtifactSourceReference::with_id(id)
}

pub fn expand_artifact(artifact: &BuildArtifact) -> Artifact {
    let (branch, tags) = artifact
        .latest
        .as_ref()
        .map(|l| (l.branch.clone(), l.tags.clone()))
        .unwrap_or_default();
    let version = artifact
        .specify
        .as_ref()
        .map(|s| s.version.clone())
        .unwrap_or_default();

    let mut definition_reference = BTreeMap::new();
    definition_reference.insert(REF_DEFAULT_VERSION_BRANCH.to_string(), reference(branch));
    definition_reference.insert(REF_DEFAULT_VERSION_SPECIFIC.to_string(), reference(version));
    definition_reference.insert(REF_DEFAULT_VERSION_TAGS.to_string(), reference(tags));
    definition_reference.insert(
        REF_DEFAULT_VERSION_TYPE.to_string(),
        reference(DefaultVersionType::of(artifact).as_str()),
    );
    definition_reference.insert(REF_DEFINITION.to_string(), reference(artifact.build_pipeline_id.clone()));
    definition_reference.insert(REF_DEFINITIONS.to_string(), reference(""));
    definition_reference.insert(REF_IS_MULTI_DEFINITION_TYPE.to_string(), reference("False"));
    definition_reference.insert(REF_PROJECT.to_string(), reference(artifact.project_id.clone()));

    Artifact {
        alias: Some(artifact.alias.clone()),
        definition_reference: Some(definition_reference),
        is_primary: Some(artifact.is_primary),
        is_retained: Some(artifact.is_retained),
        artifact_type: Some(ARTIFACT_TYPE_BUILD.to_string()),
    }
}

/// Flatten a build artifact; artifacts of other types yield `None`
pub fn flatten_artifact(artifact: &Artifact) -> Option<BuildArtifact> {
    if !artifact
        .artifact_type
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case(ARTIFACT_TYPE_BUILD))
    {
        return None;
    }

    let empty = BTreeMap::new();
    let refs = artifact.definition_reference.as_ref().unwrap_or(&empty);
    let read = |key: &str| {
        refs.get(key)
            .and_then(|r| r.id.clone())
            .unwrap_or_default()
    };

    let version_type = DefaultVersionType::parse(&read(REF_DEFAULT_VERSION_TYPE));
    let (latest, specify) = match version_type {
        DefaultVersionType::Latest
        | DefaultVersionType::LatestWithBranchAndTags
        | DefaultVersionType::LatestWithBuildDefinitionBranchAndTags => (
            Some(LatestVersion {
                branch: read(REF_DEFAULT_VERSION_BRANCH),
                tags: read(REF_DEFAULT_VERSION_TAGS),
            }),
            None,
        ),
        DefaultVersionType::SpecificVersion => (
            None,
            Some(SpecificVersion {
                version: read(REF_DEFAULT_VERSION_SPECIFIC),
            }),
        ),
        DefaultVersionType::SelectDuringReleaseCreation => (None, None),
    };

    Some(BuildArtifact {
        project_id: read(REF_PROJECT),
        build_pipeline_id: read(REF_DEFINITION),
        alias: artifact.alias.clone().unwrap_or_default(),
        is_primary: artifact.is_primary.unwrap_or(false),
        is_retained: artifact.is_retained.unwrap_or(false),
        latest,
        specify,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(latest: Option<LatestVersion>, specify: Option<SpecificVersion>) -> BuildArtifact {
        BuildArtifact {
            project_id: "proj".to_string(),
            build_pipeline_id: "12".to_string(),
            alias: "app".to_string(),
            is_primary: true,
            is_retained: false,
            latest,
            specify,
        }
    }

    fn latest(branch: &str, tags: &str) -> Option<LatestVersion> {
        Some(LatestVersion {
            branch: branch.to_string(),
            tags: tags.to_string(),
        })
    }

    fn specify(version: &str) -> Option<SpecificVersion> {
        Some(SpecificVersion {
            version: version.to_string(),
        })
    }

    #[test]
    fn test_default_version_type_table() {
        let cases = [
            (artifact(latest("", ""), None), DefaultVersionType::Latest),
            (artifact(latest("main", ""), None), DefaultVersionType::Latest),
            (artifact(latest("main", "prod"), None), DefaultVersionType::LatestWithBranchAndTags),
            (
                artifact(latest("", "prod"), None),
                DefaultVersionType::LatestWithBuildDefinitionBranchAndTags,
            ),
            (artifact(None, specify("20240101.1")), DefaultVersionType::SpecificVersion),
            (artifact(None, specify("")), DefaultVersionType::SelectDuringReleaseCreation),
            (artifact(None, None), DefaultVersionType::SelectDuringReleaseCreation),
            (artifact(latest("", ""), specify("")), DefaultVersionType::SelectDuringReleaseCreation),
            (artifact(latest("main", "prod"), specify("7")), DefaultVersionType::SpecificVersion),
        ];
        for (artifact, expected) in cases {
            assert_eq!(DefaultVersionType::of(&artifact), expected, "{:?}", artifact);
        }
    }

    #[test]
    fn test_wire_shape() {
        let wire = expand_artifact(&artifact(latest("main", "prod"), None));
        let refs = wire.definition_reference.unwrap();
        assert_eq!(refs["defaultVersionType"].id.as_deref(), Some("latestWithBranchAndTagsType"));
        assert_eq!(refs["definition"].id.as_deref(), Some("12"));
        assert_eq!(refs["IsMultiDefinitionType"].id.as_deref(), Some("False"));
        assert_eq!(refs["definitions"].id.as_deref(), Some(""));
        assert_eq!(wire.artifact_type.as_deref(), Some("Build"));
    }

    #[test]
    fn test_round_trips() {
        for model in [
            artifact(latest("", ""), None),
            artifact(latest("main", "prod"), None),
            artifact(latest("", "prod"), None),
            artifact(None, specify("20240101.1")),
            artifact(None, None),
        ] {
            assert_eq!(flatten_artifact(&expand_artifact(&model)), Some(model));
        }
    }

    #[test]
    fn test_empty_specify_reads_back_as_select() {
        let flattened = flatten_artifact(&expand_artifact(&artifact(None, specify("")))).unwrap();
        assert_eq!(flattened.specify, None);
        assert_eq!(flattened.latest, None);
    }

    #[test]
    fn test_empty_latest_and_specify_selects_at_release_creation() {
        let wire = expand_artifact(&artifact(latest("", ""), specify("")));
        let refs = wire.definition_reference.as_ref().unwrap();
        assert_eq!(
            refs["defaultVersionType"].id.as_deref(),
            Some("selectDuringReleaseCreationType")
        );
        let flattened = flatten_artifact(&wire).unwrap();
        assert_eq!((flattened.latest, flattened.specify), (None, None));
    }

    #[test]
    fn test_non_build_artifact_is_skipped() {
        let mut wire = expand_artifact(&artifact(None, None));
        wire.artifact_type = Some("Git".to_string());
        assert_eq!(flatten_artifact(&wire), None);
    }
}
