//! Newsreel agents
//!
//! Adapters for every external service a run talks to (news feeds, the
//! language model, text-to-speech, stock media, ffmpeg and the video
//! platform) and the pipeline that drives them through one run.
//!
//! Each adapter sits behind a trait so the pipeline can be exercised with
//! the in-memory doubles in [`mock`] (enabled for tests or with the `mock`
//! feature).

pub mod config;
pub mod error;
pub mod http;
pub mod llm;
pub mod media;
pub mod news;
pub mod pipeline;
pub mod retry;
pub mod speech;
pub mod upload;
pub mod video;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::AgentsConfig;
pub use error::{AdapterError, Result};
pub use pipeline::{Adapters, Pipeline, RunObserver, RunSettings};
pub use retry::RetryPolicy;
