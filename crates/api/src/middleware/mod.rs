//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the caller identified by a JWT Bearer token.
//! - [`rbac`] -- extractors that additionally require a capability.

pub mod auth;
pub mod rbac;
