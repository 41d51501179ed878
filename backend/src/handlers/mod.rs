//! HTTP handlers for the Pharmacy Stock Management Platform

pub mod activity;
pub mod batch;
pub mod discard;
pub mod health;
pub mod medicine;
pub mod reporting;

pub use activity::*;
pub use batch::*;
pub use discard::*;
pub use health::*;
pub use medicine::*;
pub use reporting::*;
