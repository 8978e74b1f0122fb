use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc;
use std::thread;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::State;
use super::token::Token;
use crate::config::GenerationConfig;
use crate::error::{GenerationError, Result, StoryError};

/// Characters that close a sentence when they end a word.
const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Chunks handed to each CPU when training in parallel.
const CHUNKS_PER_CPU: usize = 8;

/// Largest context length a model may use.
pub const MAX_ORDER: usize = 16;

/// Weighted token transition model.
///
/// Maps a context (the last `order` tokens) to the tokens observed right
/// after it, with their occurrence counts.
///
/// # Responsibilities
/// - Train incrementally from raw text (strictly additive)
/// - Sample the next token stochastically or from a seeded generator
/// - Generate whole sentences from `START` until `END`
/// - Round-trip losslessly through a byte blob
///
/// # Invariants
/// - `1 <= order <= MAX_ORDER`
/// - Every trained sentence begins with `order` START tokens and ends with
///   END, so every reachable context has at least one outgoing transition
/// - Sampling never mutates the model
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransitionModel {
	/// Number of tokens in a context.
	order: usize,

	/// Mapping from a context to its outgoing transitions.
	states: BTreeMap<Vec<Token>, State>,
}

impl Default for TransitionModel {
	fn default() -> Self {
		Self { order: 1, states: BTreeMap::new() }
	}
}

/// Splits text into sentences of whitespace-delimited words.
///
/// A sentence ends at a word whose last character is `.`, `!` or `?`.
/// A trailing run without a terminator is kept as a final sentence.
pub fn sentences(text: &str) -> Vec<Vec<&str>> {
	let mut sentences = Vec::new();
	let mut current = Vec::new();

	for word in text.split_whitespace() {
		current.push(word);
		if word.ends_with(TERMINATORS) {
			sentences.push(std::mem::take(&mut current));
		}
	}
	if !current.is_empty() {
		sentences.push(current);
	}

	sentences
}

/// Trains `existing` (or a fresh order-1 model) on `text` and returns it.
pub fn train(existing: Option<TransitionModel>, text: &str) -> TransitionModel {
	let mut model = existing.unwrap_or_default();
	model.add_text(text);
	model
}

impl TransitionModel {
	/// Creates an empty model whose contexts hold `order` tokens.
	///
	/// # Errors
	/// Returns an input error if `order` is outside `1..=MAX_ORDER`.
	pub fn new(order: usize) -> Result<Self> {
		if !(1..=MAX_ORDER).contains(&order) {
			return Err(StoryError::Input(format!("order must be between 1 and {MAX_ORDER}, got {order}")));
		}
		Ok(Self { order, states: BTreeMap::new() })
	}

	pub fn order(&self) -> usize {
		self.order
	}

	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	/// Number of distinct contexts observed.
	pub fn context_count(&self) -> usize {
		self.states.len()
	}

	/// Occurrence count of `next` after `context` (0 if never seen).
	pub fn count(&self, context: &[Token], next: &Token) -> u64 {
		self.states.get(context).map_or(0, |state| state.count(next))
	}

	/// Iterates over every (context, next, count) triple in sorted order.
	pub fn triples(&self) -> impl Iterator<Item = (&[Token], &Token, u64)> {
		self.states
			.iter()
			.flat_map(|(context, state)| state.transitions().map(move |(next, count)| (context.as_slice(), next, count)))
	}

	/// Every token that can follow some context, sorted.
	///
	/// This is the set sampled from when a context was never observed.
	pub fn alphabet(&self) -> BTreeSet<&Token> {
		self.states
			.values()
			.flat_map(|state| state.transitions().map(|(next, _)| next))
			.collect()
	}

	/// Adds every sentence of `text` to the model.
	///
	/// Empty or whitespace-only text is a no-op. Existing counts are never
	/// reset, so this supports incremental retraining.
	pub fn add_text(&mut self, text: &str) {
		for sentence in sentences(text) {
			self.add_sentence(&sentence);
		}
	}

	/// Adds one sentence, padded with START tokens and terminated by END.
	pub fn add_sentence(&mut self, words: &[&str]) {
		if words.is_empty() {
			return;
		}

		let mut tokens: Vec<Token> = vec![Token::Start; self.order];
		tokens.extend(words.iter().map(|w| Token::word(w)));
		tokens.push(Token::End);

		for window in tokens.windows(self.order + 1) {
			let (context, next) = window.split_at(self.order);
			self.states
				.entry(context.to_vec())
				.or_default()
				.add_transition(next[0].clone());
		}
	}

	/// Same result as [`add_text`](Self::add_text), built on all CPUs.
	///
	/// Sentences are split into chunks, each chunk is trained into a partial
	/// model on its own thread, and the partial models are merged.
	pub fn add_text_parallel(&mut self, text: &str) -> Result<()> {
		let sentences = sentences(text);
		if sentences.is_empty() {
			return Ok(());
		}

		let chunks = num_cpus::get() * CHUNKS_PER_CPU;
		let chunk_size = sentences.len().div_ceil(chunks);
		let order = self.order;

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for chunk in sentences.chunks(chunk_size) {
				let tx = tx.clone();
				scope.spawn(move || {
					let mut partial = TransitionModel { order, states: BTreeMap::new() };
					for sentence in chunk {
						partial.add_sentence(sentence);
					}
					// The receiver outlives the scope
					let _ = tx.send(partial);
				});
			}
		});
		drop(tx);

		let mut partials = 0;
		for partial in rx.iter() {
			self.merge(&partial)?;
			partials += 1;
		}
		debug!("trained {} sentences in {} partial models", sentences.len(), partials);

		Ok(())
	}

	/// Merges another model of the same order into this one.
	///
	/// # Errors
	/// Returns an input error if the orders differ.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.order != other.order {
			return Err(StoryError::Input(format!(
				"order mismatch: {} vs {}",
				self.order, other.order
			)));
		}

		for (context, state) in &other.states {
			match self.states.get_mut(context) {
				Some(existing) => existing.merge(state),
				None => {
					self.states.insert(context.clone(), state.clone());
				}
			}
		}

		Ok(())
	}

	/// Samples the next token after `context` using the thread-local generator.
	pub fn sample(&self, context: &[Token]) -> Result<Token> {
		self.sample_deterministic(context, &mut rand::rng())
	}

	/// Samples the next token after `context` from a caller-owned generator.
	///
	/// Selection is proportional to occurrence count. For a context that was
	/// never observed, falls back to a uniform choice over the alphabet.
	/// With the same generator state and the same model the result is always
	/// the same.
	pub fn sample_deterministic<R: Rng>(&self, context: &[Token], rng: &mut R) -> Result<Token> {
		if self.states.is_empty() {
			return Err(GenerationError::EmptyModel.into());
		}

		if let Some(next) = self.states.get(context).and_then(|state| state.pick(rng)) {
			return Ok(next.clone());
		}

		let alphabet = self.alphabet();
		if alphabet.is_empty() {
			return Err(GenerationError::NoAlphabet.into());
		}
		let index = rng.random_range(0..alphabet.len());
		alphabet
			.into_iter()
			.nth(index)
			.cloned()
			.ok_or_else(|| GenerationError::NoAlphabet.into())
	}

	/// Generates one sentence from the START context until END is sampled.
	///
	/// Sentinels are stripped and words are joined with single spaces.
	///
	/// # Errors
	/// Fails with [`GenerationError::TooLong`] after `config.max_tokens`
	/// samples without reaching END, and propagates sampling failures.
	pub fn generate_sequence<R: Rng>(&self, rng: &mut R, config: &GenerationConfig) -> Result<String> {
		if self.states.is_empty() {
			return Err(GenerationError::EmptyModel.into());
		}

		let mut context: Vec<Token> = vec![Token::Start; self.order];
		let mut words: Vec<String> = Vec::new();
		let mut steps = 0;

		loop {
			if steps >= config.max_tokens {
				return Err(GenerationError::TooLong { limit: config.max_tokens }.into());
			}
			steps += 1;

			let next = self.sample_deterministic(&context, rng)?;
			if next == Token::End {
				break;
			}
			if let Some(word) = next.as_word() {
				words.push(word.to_owned());
			}
			context.remove(0);
			context.push(next);
		}

		Ok(words.join(" "))
	}

	/// Generates one sentence using the thread-local generator.
	pub fn generate_sequence_random(&self, config: &GenerationConfig) -> Result<String> {
		self.generate_sequence(&mut rand::rng(), config)
	}

	/// Encodes the full context → next → count structure.
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		Ok(postcard::to_stdvec(self)?)
	}

	/// Decodes a model produced by [`to_bytes`](Self::to_bytes).
	///
	/// # Errors
	/// Returns a serialization error on corrupt blobs, including an order
	/// outside `1..=MAX_ORDER`.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		let model: Self = postcard::from_bytes(bytes)?;
		if !(1..=MAX_ORDER).contains(&model.order) {
			return Err(StoryError::Serialization(format!("decoded model has order {}", model.order)));
		}
		if model.states.keys().any(|context| context.len() != model.order) {
			return Err(StoryError::Serialization("decoded context length does not match order".to_owned()));
		}
		Ok(model)
	}
}
