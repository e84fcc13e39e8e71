//! Core domain types
//!
//! These types are shared between the agents crate (which builds and mutates
//! them while a run executes) and the orchestrator (which stores and reports
//! them).

pub mod article;
pub mod health;
pub mod log;
pub mod run;
pub mod segment;
