use std::sync::Arc;

use log::info;

use crate::cache::{ActiveModel, ModelCache};
use crate::config::GenerationConfig;
use crate::error::{Result, StoryError};
use crate::model::transition_model::TransitionModel;
use crate::story::generator::StoryGenerator;
use crate::story::page::GeneratedPage;
use crate::store::{ModelRecord, ModelStore, Post, PostStore};

/// Entry point for request handlers.
///
/// Owns the store handles, the active-model cache and the generation limits.
/// Shared by reference across workers: the cache is the only mutable state.
///
/// # Responsibilities
/// - Train new models and extend stored ones, invalidating the cache only
///   after the store acknowledged the write
/// - Generate single pages and the daily home page from the active model
/// - Validate and store user-written posts
pub struct StoryService {
	store: Arc<dyn ModelStore>,
	posts: Arc<dyn PostStore>,
	cache: ModelCache,
	generation: GenerationConfig,
}

impl StoryService {
	pub fn new(store: Arc<dyn ModelStore>, posts: Arc<dyn PostStore>, generation: GenerationConfig) -> Self {
		Self { store, posts, cache: ModelCache::new(), generation }
	}

	/// Builds a service whose models and posts live in the same store.
	pub fn from_store<S: ModelStore + PostStore + 'static>(store: S, generation: GenerationConfig) -> Self {
		let store = Arc::new(store);
		Self::new(Arc::clone(&store) as Arc<dyn ModelStore>, store, generation)
	}

	pub fn generation(&self) -> &GenerationConfig {
		&self.generation
	}

	pub fn cache(&self) -> &ModelCache {
		&self.cache
	}

	/// Trains a fresh model on `text` and stores it.
	///
	/// # Errors
	/// Returns an input error for blank text.
	pub fn train(&self, text: &str) -> Result<ModelRecord> {
		ensure_text(text)?;

		let mut model = TransitionModel::default();
		model.add_text_parallel(text)?;
		let record = self.store.save_model(model.to_bytes()?)?;
		self.cache.invalidate();

		info!("trained model {} ({} contexts)", record.id, model.context_count());
		Ok(record)
	}

	/// Adds `text` to the stored model `id`.
	///
	/// # Errors
	/// - Input error for blank text
	/// - `ModelNotFound` for an unknown id (the cache is left untouched)
	pub fn update(&self, id: u64, text: &str) -> Result<ModelRecord> {
		ensure_text(text)?;

		let mut model = TransitionModel::from_bytes(&self.store.get_model(id)?)?;
		model.add_text_parallel(text)?;
		let record = self.store.update_model(id, model.to_bytes()?)?;
		self.cache.invalidate();

		info!("updated model {} ({} contexts)", record.id, model.context_count());
		Ok(record)
	}

	/// The model generation currently reads from.
	pub fn active(&self) -> Result<Arc<ActiveModel>> {
		self.cache.get_active(self.store.as_ref())
	}

	/// Generates the page for `seed` from the active model.
	pub fn page(&self, seed: i64) -> Result<GeneratedPage> {
		let active = self.active()?;
		StoryGenerator::new(&active.model, &self.generation).generate_page(seed)
	}

	/// Generates today's `count` home page posts from the active model.
	pub fn home_page(&self, count: usize) -> Result<Vec<GeneratedPage>> {
		let active = self.active()?;
		StoryGenerator::new(&active.model, &self.generation).home_page_posts(count)
	}

	/// Stores a user-written post.
	///
	/// # Errors
	/// Returns an input error if the title or the content is blank.
	pub fn create_post(&self, title: &str, content: &str) -> Result<Post> {
		let (title, content) = (title.trim(), content.trim());
		if title.is_empty() || content.is_empty() {
			return Err(StoryError::Input("title and content are required".to_owned()));
		}
		let post = self.posts.save_post(title, content)?;
		info!("saved post {}", post.id);
		Ok(post)
	}

	pub fn post(&self, id: u64) -> Result<Post> {
		self.posts.get_post(id)
	}

	/// Every stored post, newest first.
	pub fn posts(&self) -> Result<Vec<Post>> {
		self.posts.all_posts()
	}
}

fn ensure_text(text: &str) -> Result<()> {
	if text.trim().is_empty() {
		return Err(StoryError::Input("training text is empty".to_owned()));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::MemoryStore;

	fn service() -> StoryService {
		StoryService::from_store(MemoryStore::new(), GenerationConfig::default())
	}

	#[test]
	fn blank_text_is_rejected() {
		let service = service();
		assert!(matches!(service.train(" \n "), Err(StoryError::Input(_))));
		assert!(matches!(service.update(1, ""), Err(StoryError::Input(_))));
	}

	#[test]
	fn no_model_yet() {
		let service = service();
		assert!(matches!(service.page(1), Err(StoryError::ModelNotFound(_))));
		assert!(matches!(service.home_page(3), Err(StoryError::ModelNotFound(_))));
	}

	#[test]
	fn unknown_update_leaves_cache_untouched() {
		let service = service();
		service.train("The cat sat.").unwrap();
		let cached = service.active().unwrap();

		assert!(matches!(service.update(42, "more."), Err(StoryError::ModelNotFound(_))));
		assert!(Arc::ptr_eq(&cached, &service.cache().cached().unwrap()));
	}

	#[test]
	fn train_invalidates_and_newest_wins() {
		let service = service();
		let first = service.train("The cat sat.").unwrap();
		assert_eq!(service.active().unwrap().record.id, first.id);

		let second = service.train("A dog ran.").unwrap();
		assert!(service.cache().cached().is_none());
		let active = service.active().unwrap();
		assert_eq!(active.record.id, second.id);
		assert_eq!(service.page(5).unwrap().link.title, "A dog ran.");
	}

	#[test]
	fn update_is_visible_on_next_read() {
		let service = service();
		let record = service.train("The cat sat.").unwrap();
		let before = service.active().unwrap();

		service.update(record.id, "The dog ran.").unwrap();
		let after = service.active().unwrap();
		assert_eq!(after.record.id, record.id);
		assert_ne!(before.model, after.model);
		assert_eq!(
			after.model.count(&[crate::model::token::Token::Start], &crate::model::token::Token::word("The")),
			2
		);
	}

	#[test]
	fn posts_need_a_title_and_content() {
		let service = service();
		assert!(matches!(service.create_post("", "body"), Err(StoryError::Input(_))));
		assert!(matches!(service.create_post("Title", " \n"), Err(StoryError::Input(_))));
		assert!(service.posts().unwrap().is_empty());

		let post = service.create_post("  Title ", "Body.").unwrap();
		assert_eq!(post.title, "Title");
		assert_eq!(service.post(post.id).unwrap(), post);
		assert!(matches!(service.post(post.id + 1), Err(StoryError::PostNotFound(_))));
	}

	#[test]
	fn posts_do_not_touch_the_model_cache() {
		let service = service();
		service.train("The cat sat.").unwrap();
		let cached = service.active().unwrap();

		service.create_post("Title", "Body.").unwrap();
		assert!(Arc::ptr_eq(&cached, &service.cache().cached().unwrap()));
	}
}
