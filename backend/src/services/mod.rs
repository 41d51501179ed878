//! Business logic services for the Pharmacy Stock Management Platform

pub mod activity;
pub mod batch;
pub mod discard;
pub mod medicine;
pub mod reporting;

pub use activity::ActivityService;
pub use batch::BatchService;
pub use discard::DiscardService;
pub use medicine::MedicineService;
pub use reporting::ReportingService;
