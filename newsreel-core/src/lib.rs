//! Newsreel Core
//!
//! Core types shared by the newsreel services.
//!
//! This crate contains:
//! - Domain types: articles, processed segments, pipeline runs, logs, health
//! - DTOs: request/response bodies of the orchestrator HTTP API

pub mod domain;
pub mod dto;
