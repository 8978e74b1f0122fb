//! Token transition model.
//!
//! This module provides:
//! - The token alphabet (`Token`)
//! - Per-context transition counts (`State`)
//! - The trainable, serializable model with stochastic and seeded sampling
//!   (`TransitionModel`)
//! - The seeded generator every reproducible code path threads through

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Words plus the START / END sentinels.
pub mod token;

/// Trainable first-order (or higher) transition model.
///
/// Handles sentence splitting, transition counting, weighted sampling,
/// sentence generation and byte round-trips.
pub mod transition_model;

/// Outgoing transitions of a single context.
///
/// Not exposed publicly.
mod state;

/// Seeded generator used for reproducible generation.
///
/// ChaCha8 output is fixed for a given seed across platforms and releases,
/// which keeps published page URLs stable.
pub type PageRng = ChaCha8Rng;

/// Builds the generator for an integer seed.
pub fn seeded_rng(seed: i64) -> PageRng {
	ChaCha8Rng::seed_from_u64(seed as u64)
}
