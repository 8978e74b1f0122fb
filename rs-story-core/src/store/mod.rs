//! Model blob and post storage.
//!
//! Models are stored as opaque byte blobs keyed by a numeric id. Posts are
//! small user-written records kept next to them. The core only depends on
//! the `ModelStore` and `PostStore` traits; two implementations are provided.

use std::cmp::Ordering;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Directory-backed store, one file per model and per post.
pub mod file;

/// Process-local store.
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Identity of a stored model.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelRecord {
	pub id: u64,
	pub created_at: DateTime<Utc>,
}

/// A stored model blob with its identity.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredModel {
	pub id: u64,
	pub bytes: Vec<u8>,
	pub created_at: DateTime<Utc>,
}

impl StoredModel {
	pub fn record(&self) -> ModelRecord {
		ModelRecord { id: self.id, created_at: self.created_at }
	}
}

/// A user-written post.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Post {
	pub id: u64,
	pub title: String,
	pub content: String,
	pub created_at: DateTime<Utc>,
}

/// Storage boundary for serialized models.
///
/// Implementations must be safe to share across request workers. A write is
/// considered durable once the call returns `Ok`.
pub trait ModelStore: Send + Sync {
	/// Stores a new blob and returns its identity.
	fn save_model(&self, bytes: Vec<u8>) -> Result<ModelRecord>;

	/// Returns the blob for `id`.
	///
	/// # Errors
	/// `StoryError::ModelNotFound` if `id` is absent.
	fn get_model(&self, id: u64) -> Result<Vec<u8>>;

	/// Returns up to `limit` models, newest first.
	fn list_recent_models(&self, limit: usize) -> Result<Vec<StoredModel>>;

	/// Replaces the blob for `id` and refreshes its timestamp.
	///
	/// # Errors
	/// `StoryError::ModelNotFound` if `id` is absent.
	fn update_model(&self, id: u64, bytes: Vec<u8>) -> Result<ModelRecord>;
}

/// Storage boundary for posts.
///
/// Stores do not validate titles or content; that is the caller's job.
pub trait PostStore: Send + Sync {
	/// Stores a new post and returns it with its id and timestamp.
	fn save_post(&self, title: &str, content: &str) -> Result<Post>;

	/// # Errors
	/// `StoryError::PostNotFound` if `id` is absent.
	fn get_post(&self, id: u64) -> Result<Post>;

	/// Every post, newest first.
	fn all_posts(&self) -> Result<Vec<Post>>;
}

/// Newest first; ties broken by the larger id.
pub(crate) fn newest_first(a: (DateTime<Utc>, u64), b: (DateTime<Utc>, u64)) -> Ordering {
	b.cmp(&a)
}

/// Current time, pushed past `latest` if the clock has not moved since.
///
/// Keeps "most recently written" unambiguous when writes land within the
/// clock's resolution.
pub(crate) fn timestamp_after(latest: Option<DateTime<Utc>>) -> DateTime<Utc> {
	let now = Utc::now();
	match latest {
		Some(latest) if now <= latest => latest + TimeDelta::microseconds(1),
		_ => now,
	}
}
