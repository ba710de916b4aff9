use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health of the periodic collection, served next to the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub cycles: u64,
    pub failures: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
