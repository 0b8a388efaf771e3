//! Principals
//!
//! Models for the externally owned principal directory and the traits the
//! auth engine consumes to reach it.

mod directory;
mod models;

pub use directory::*;
pub use models::*;
