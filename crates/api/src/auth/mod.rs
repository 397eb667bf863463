//! Authentication primitives.
//!
//! - [`jwt`] -- validation of access tokens issued by the hosted auth provider.

pub mod jwt;
