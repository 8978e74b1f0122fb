use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::token::Token;

/// Outgoing transitions observed after one context.
///
/// Conceptually, this is a node in a Markov chain where outgoing edges
/// are weighted by their number of observations.
///
/// ## Responsibilities:
/// - Accumulate transition occurrences during training
/// - Pick the next token by weighted sampling from a caller-supplied generator
/// - Merge with the state of the same context from another model
///
/// ## Invariants
/// - Each transition occurrence count is strictly positive
/// - Transitions are kept sorted so that the same generator state always
///   selects the same token
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct State {
	/// Outgoing transitions indexed by the next token.
	/// Example: { Word("cat") => 42, End => 3 }
	transitions: BTreeMap<Token, u64>,
}

impl State {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one more occurrence of a transition toward `next`.
	pub fn add_transition(&mut self, next: Token) {
		*self.transitions.entry(next).or_insert(0) += 1;
	}

	/// Occurrence count of the transition toward `next` (0 if never seen).
	pub fn count(&self, next: &Token) -> u64 {
		self.transitions.get(next).copied().unwrap_or(0)
	}

	/// Sum of all outgoing occurrence counts.
	pub fn total(&self) -> u64 {
		self.transitions.values().sum()
	}

	pub fn transitions(&self) -> impl Iterator<Item = (&Token, u64)> {
		self.transitions.iter().map(|(t, c)| (t, *c))
	}

	/// Picks the next token with probability proportional to its count.
	///
	/// Draws exactly one value from `rng`, then walks the sorted transitions
	/// subtracting counts until the draw falls inside a bucket.
	///
	/// Returns `None` if the state has no transitions.
	pub fn pick<R: Rng>(&self, rng: &mut R) -> Option<&Token> {
		let total = self.total();
		if total == 0 {
			return None;
		}

		let mut r = rng.random_range(0..total);
		for (next, occurrence) in &self.transitions {
			if r < *occurrence {
				return Some(next);
			}
			r -= occurrence;
		}

		// Unreachable while counts sum to `total`
		self.transitions.keys().next_back()
	}

	/// Merges another state observed for the same context.
	///
	/// Transition occurrence counts are summed.
	pub fn merge(&mut self, other: &Self) {
		for (next, occurrence) in &other.transitions {
			*self.transitions.entry(next.clone()).or_insert(0) += *occurrence;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand_chacha::ChaCha8Rng;

	#[test]
	fn pick_respects_counts() {
		let mut state = State::new();
		state.add_transition(Token::word("only"));
		state.add_transition(Token::word("only"));

		let mut rng = ChaCha8Rng::seed_from_u64(7);
		for _ in 0..20 {
			assert_eq!(state.pick(&mut rng), Some(&Token::word("only")));
		}
		assert_eq!(state.count(&Token::word("only")), 2);
		assert_eq!(state.total(), 2);
	}

	#[test]
	fn pick_on_empty_state_is_none() {
		let state = State::new();
		let mut rng = ChaCha8Rng::seed_from_u64(1);
		assert!(state.pick(&mut rng).is_none());
	}

	#[test]
	fn pick_is_reproducible_for_same_generator_state() {
		let mut state = State::new();
		for word in ["a", "b", "c", "d", "a", "b", "a"] {
			state.add_transition(Token::word(word));
		}
		state.add_transition(Token::End);

		let mut first = ChaCha8Rng::seed_from_u64(99);
		let mut second = ChaCha8Rng::seed_from_u64(99);
		let a: Vec<_> = (0..50).map(|_| state.pick(&mut first).cloned()).collect();
		let b: Vec<_> = (0..50).map(|_| state.pick(&mut second).cloned()).collect();
		assert_eq!(a, b);
	}

	#[test]
	fn merge_sums_counts() {
		let mut left = State::new();
		left.add_transition(Token::word("x"));
		let mut right = State::new();
		right.add_transition(Token::word("x"));
		right.add_transition(Token::End);

		left.merge(&right);
		assert_eq!(left.count(&Token::word("x")), 2);
		assert_eq!(left.count(&Token::End), 1);
		assert_eq!(left.total(), 3);
	}
}
