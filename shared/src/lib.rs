//! Shared types and models for the Pharmacy Stock Management Platform
//!
//! This crate contains the domain models and the pure stock arithmetic
//! (batch diffing, discard planning, expiry aggregation) used by the backend.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
