//! The HTTP surface: request/response shaping shared by every SCIM route,
//! plus the router assembly that wires tenant-scoped resource routes,
//! discovery, admin, and health together under the API prefix.

pub(crate) mod envelope;
mod resources;
mod router;

pub use router::build_router;
