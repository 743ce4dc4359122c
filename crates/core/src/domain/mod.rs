pub mod actor;
pub mod branch;
pub mod review;
pub mod waste;
