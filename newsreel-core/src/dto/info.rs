//! System information DTO

use serde::{Deserialize, Serialize};

/// Response of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub name: String,
    pub version: String,
    pub status: String,
    pub features: Vec<String>,
    pub run_interval_hours: u64,
    pub upload_enabled: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
}
