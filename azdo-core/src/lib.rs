//! Azure DevOps Core
//!
//! Resource models, wire objects and the pure codecs that translate between them.
//!
//! This crate contains:
//! - Domain types: the declarative resource models persisted by the host
//! - Wire types: the service's Build/Release definition objects
//! - Codecs: expand (model → wire) and flatten (wire → model) for build and
//!   release definitions, plus the primitive filter, day, task and URL codecs
//! - Validation and state migration
//!
//! Nothing in here performs I/O. REST access lives in `azdo-client`, lifecycle
//! orchestration in `azdo-provider`.

pub mod build;
pub mod convert;
pub mod days;
pub mod domain;
pub mod error;
pub mod filters;
pub mod migration;
pub mod prior;
pub mod release;
pub mod repository;
pub mod task;
pub mod validate;
pub mod variables;
pub mod wire;

pub use error::{DefinitionError, Result, ValidationError, ValidationKind};
pub use prior::{NoPriorState, PriorState};
pub use task::TaskRegistry;
