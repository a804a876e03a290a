//! Azure DevOps Provider
//!
//! Resource lifecycle callbacks (create, read, update, delete, import and
//! state upgrade) for build definitions, release definitions, build folders
//! and pipeline resource authorizations.
//!
//! Each resource validates and expands its model with `azdo-core`, talks to
//! the service through the `azdo-client` API traits, and flattens the response
//! back into the model. [`Provider`] exposes them to a host over JSON state.

pub mod error;
pub mod provider;
pub mod resource;
pub mod resources;

#[cfg(test)]
mod testing;

pub use error::{ImportError, ProviderError, Result};
pub use provider::Provider;
pub use resource::{Resource, ResourceData};
