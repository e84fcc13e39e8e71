//! Data Transfer Objects for the orchestrator HTTP API
//!
//! Shared by the orchestrator (which produces them) and the client crate
//! (which decodes them).

pub mod info;
pub mod log;
pub mod run;
