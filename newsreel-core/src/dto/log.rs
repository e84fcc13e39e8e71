//! Log DTOs

use serde::{Deserialize, Serialize};

use crate::domain::log::LogEntry;

/// Most recent captured log lines, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogTail {
    pub lines: Vec<LogEntry>,
    /// Maximum number of lines the service retains
    pub capacity: usize,
}
