//! Service Module
//!
//! Business logic layer of the orchestrator, between the HTTP handlers and
//! the run history, pipeline and log buffer.

pub mod health;
pub mod log;
pub mod run;

pub use health as health_service;
pub use log as log_service;
pub use run as run_service;
