//! Domain models for the Pharmacy Stock Management Platform

mod activity;
mod batch;
mod discard;
mod medicine;
mod reporting;

pub use activity::*;
pub use batch::*;
pub use discard::*;
pub use medicine::*;
pub use reporting::*;
