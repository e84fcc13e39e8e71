//! Repository Module
//!
//! Run history storage. Postgres when a database is configured, a bounded
//! in-memory history otherwise.

pub mod run;

pub use run as run_repository;
