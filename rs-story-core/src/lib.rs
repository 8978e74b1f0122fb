//! Procedural story pages from a trained token transition model.
//!
//! This crate provides:
//! - A word-level transition model trained from raw text, with stochastic
//!   and seeded sampling
//! - Reproducible page composition from a single integer seed
//! - A single-slot cache for the active model over a blob store
//! - A paced, incremental page renderer
//! - Storage for user-written posts
//!
//! HTTP routing and process configuration live in the server crate.

/// Generation limits and stream timings.
pub mod config;

/// Error taxonomy (`StoryError`, `GenerationError`).
pub mod error;

/// Token transition model and the seeded generator.
pub mod model;

/// Seeded page composition.
pub mod story;

/// Model and post storage boundaries and their implementations.
pub mod store;

/// Single-slot active model cache.
pub mod cache;

/// Paced streaming of generated pages.
pub mod render;

/// Train / update / generate entry points for request handlers.
pub mod service;

pub use config::{GenerationConfig, StreamTiming};
pub use error::{GenerationError, Result, StoryError};
pub use model::token::Token;
pub use model::transition_model::TransitionModel;
pub use service::StoryService;
pub use story::page::{GeneratedPage, PageLink};
