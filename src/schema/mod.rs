//! Static SCIM schema documents: the core User/Group/ServiceProviderConfig
//! schema meta-documents served from `GET /Schemas`.

pub mod embedded;
pub mod types;

pub use types::{AttributeDefinition, AttributeType, Mutability, Schema, Uniqueness};
