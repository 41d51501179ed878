//! Middleware for the Pharmacy Stock Management Platform

pub mod auth;

pub use auth::{auth_middleware, AuthUser, CurrentUser};
