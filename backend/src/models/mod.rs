//! Database models for the Pharmacy Stock Management Platform
//!
//! Re-exports models from the shared crate

pub use shared::models::*;
