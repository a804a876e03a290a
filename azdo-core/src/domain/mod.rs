//! Resource models
//!
//! The declarative shapes the host persists for each resource type. Codecs in
//! [`crate::build`] and [`crate::release`] translate these to and from wire
//! objects; the thin resources (folders, authorizations) map almost field for
//! field and are handled directly by the provider.

pub mod authorization;
pub mod build;
pub mod folder;
pub mod release;
