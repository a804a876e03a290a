//! Resource implementations

pub mod build_definition;
pub mod build_folder;
pub mod pipeline_authorization;
pub mod release_definition;
pub mod resource_authorization;

pub use build_definition::BuildDefinitionResource;
pub use build_folder::BuildFolderResource;
pub use pipeline_authorization::PipelineAuthorizationResource;
pub use release_definition::ReleaseDefinitionResource;
pub use resource_authorization::ResourceAuthorizationResource;
