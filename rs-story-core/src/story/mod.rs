//! Seeded page composition.
//!
//! A page (title, body, related links, author, timestamp) is derived from
//! one integer seed and a trained model.

/// Page composition from a seed, and the daily home page selection.
pub mod generator;

/// `PageLink` and `GeneratedPage`.
pub mod page;

/// URL slugs derived from titles.
pub mod slug;
