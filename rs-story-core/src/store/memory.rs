use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use super::{ModelRecord, ModelStore, Post, PostStore, StoredModel, newest_first, timestamp_after};
use crate::error::{Result, StoryError};

/// In-memory model and post store.
///
/// Ids start at 1 and are never reused. Models and posts count ids
/// independently.
#[derive(Debug, Default)]
pub struct MemoryStore {
	models: RwLock<BTreeMap<u64, StoredModel>>,
	posts: RwLock<BTreeMap<u64, Post>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl ModelStore for MemoryStore {
	fn save_model(&self, bytes: Vec<u8>) -> Result<ModelRecord> {
		let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
		let id = models.keys().next_back().map_or(1, |last| last + 1);
		let created_at = timestamp_after(models.values().map(|m| m.created_at).max());
		let model = StoredModel { id, bytes, created_at };
		let record = model.record();
		models.insert(id, model);
		Ok(record)
	}

	fn get_model(&self, id: u64) -> Result<Vec<u8>> {
		let models = self.models.read().unwrap_or_else(PoisonError::into_inner);
		models
			.get(&id)
			.map(|model| model.bytes.clone())
			.ok_or_else(|| StoryError::ModelNotFound(format!("no model with id {id}")))
	}

	fn list_recent_models(&self, limit: usize) -> Result<Vec<StoredModel>> {
		let models = self.models.read().unwrap_or_else(PoisonError::into_inner);
		let mut records: Vec<ModelRecord> = models.values().map(StoredModel::record).collect();
		records.sort_by(|a, b| newest_first((a.created_at, a.id), (b.created_at, b.id)));
		Ok(records
			.into_iter()
			.take(limit)
			.filter_map(|record| models.get(&record.id).cloned())
			.collect())
	}

	fn update_model(&self, id: u64, bytes: Vec<u8>) -> Result<ModelRecord> {
		let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
		let created_at = timestamp_after(models.values().map(|m| m.created_at).max());
		let model = models
			.get_mut(&id)
			.ok_or_else(|| StoryError::ModelNotFound(format!("no model with id {id}")))?;
		model.bytes = bytes;
		model.created_at = created_at;
		Ok(model.record())
	}
}

impl PostStore for MemoryStore {
	fn save_post(&self, title: &str, content: &str) -> Result<Post> {
		let mut posts = self.posts.write().unwrap_or_else(PoisonError::into_inner);
		let id = posts.keys().next_back().map_or(1, |last| last + 1);
		let post = Post {
			id,
			title: title.to_owned(),
			content: content.to_owned(),
			created_at: timestamp_after(posts.values().map(|p| p.created_at).max()),
		};
		posts.insert(id, post.clone());
		Ok(post)
	}

	fn get_post(&self, id: u64) -> Result<Post> {
		let posts = self.posts.read().unwrap_or_else(PoisonError::into_inner);
		posts
			.get(&id)
			.cloned()
			.ok_or_else(|| StoryError::PostNotFound(format!("no post with id {id}")))
	}

	fn all_posts(&self) -> Result<Vec<Post>> {
		let posts = self.posts.read().unwrap_or_else(PoisonError::into_inner);
		let mut all: Vec<Post> = posts.values().cloned().collect();
		all.sort_by(|a, b| newest_first((a.created_at, a.id), (b.created_at, b.id)));
		Ok(all)
	}
}
