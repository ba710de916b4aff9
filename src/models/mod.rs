//! Data transfer objects served as JSON.
//!
//! - `report`: RepoResult, CollectReport (one whole snapshot per cycle)
//! - `status`: ServiceStatus for the collection scheduler

pub mod report;
pub mod status;

pub use report::*;
pub use status::*;
