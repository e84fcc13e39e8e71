//! Log Service
//!
//! Read access to the captured log lines.

use newsreel_core::dto::log::LogTail;

use crate::logs::LogBuffer;

/// Lines returned when the request does not say
pub const DEFAULT_LINES: usize = 100;

/// Service error type
#[derive(Debug)]
pub enum LogError {
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, LogError>;

/// The last `lines` captured lines, at most the buffer capacity
pub fn tail(buffer: &LogBuffer, lines: Option<usize>) -> Result<LogTail> {
    let capacity = buffer.capacity();
    let lines = lines.unwrap_or(DEFAULT_LINES.min(capacity));

    if lines > capacity {
        return Err(LogError::ValidationError(format!(
            "Requested {} lines, the service keeps at most {}",
            lines, capacity
        )));
    }

    Ok(LogTail {
        lines: buffer.tail(lines),
        capacity,
    })
}
