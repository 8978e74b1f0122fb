use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use crate::error::{Result, StoryError};
use crate::model::transition_model::TransitionModel;
use crate::store::{ModelRecord, ModelStore};

/// The model currently used for generation, with the record it came from.
///
/// Immutable once loaded: readers share it through an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveModel {
	pub record: ModelRecord,
	pub model: TransitionModel,
}

/// Single-slot cache for the active model.
///
/// The slot is only replaced as a whole, under the lock, so a reader never
/// sees a partially constructed model. Concurrent misses may each load from
/// the store; they decode the same bytes and either result may stay cached.
///
/// There is no expiry: every write path must call [`invalidate`](Self::invalidate)
/// after the store acknowledged the write. Each invalidation bumps a
/// generation counter, and a load that started under an older generation is
/// returned to its caller but never written into the slot.
#[derive(Debug, Default)]
pub struct ModelCache {
	slot: RwLock<Slot>,
}

#[derive(Debug, Default)]
struct Slot {
	generation: u64,
	active: Option<Arc<ActiveModel>>,
}

impl ModelCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the cached model, loading the newest model from `store` on a miss.
	///
	/// # Errors
	/// - `StoryError::ModelNotFound` if the store holds no model
	/// - `StoryError::Serialization` if the newest blob does not decode
	pub fn get_active(&self, store: &dyn ModelStore) -> Result<Arc<ActiveModel>> {
		let generation = {
			let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
			if let Some(active) = &slot.active {
				return Ok(Arc::clone(active));
			}
			slot.generation
		};

		let stored = store
			.list_recent_models(1)?
			.into_iter()
			.next()
			.ok_or_else(|| StoryError::ModelNotFound("the store holds no model".to_owned()))?;
		let active = Arc::new(ActiveModel {
			record: stored.record(),
			model: TransitionModel::from_bytes(&stored.bytes)?,
		});

		let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
		if slot.generation == generation {
			debug!("loaded model {} into the cache", active.record.id);
			slot.active = Some(Arc::clone(&active));
		} else {
			debug!("model {} was loaded before an invalidation, not caching it", active.record.id);
		}
		Ok(active)
	}

	/// Returns the cached model without touching the store.
	pub fn cached(&self) -> Option<Arc<ActiveModel>> {
		self.slot.read().unwrap_or_else(PoisonError::into_inner).active.clone()
	}

	/// Empties the slot so the next read reloads from the store.
	///
	/// Loads already in flight are not cached.
	pub fn invalidate(&self) {
		let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
		slot.generation = slot.generation.wrapping_add(1);
		slot.active = None;
	}
}
