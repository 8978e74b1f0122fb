use std::fmt;

use serde::{Deserialize, Serialize};

/// Atomic unit of text handled by the transition model.
///
/// Words are whitespace-delimited runs taken verbatim from the training
/// text (punctuation stays attached). `Start` and `End` are sentinels that
/// never appear in the text itself and mark sentence boundaries.
///
/// The derived ordering (`Start < End < Word`) is what makes deterministic
/// sampling stable: transitions are always walked in this order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Token {
	Start,
	End,
	Word(String),
}

impl Token {
	pub fn word(value: &str) -> Self {
		Token::Word(value.to_owned())
	}

	/// Returns the word text, or `None` for a sentinel.
	pub fn as_word(&self) -> Option<&str> {
		match self {
			Token::Word(w) => Some(w),
			_ => None,
		}
	}

	pub fn is_sentinel(&self) -> bool {
		!matches!(self, Token::Word(_))
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Token::Start => f.write_str("^START^"),
			Token::End => f.write_str("^END^"),
			Token::Word(w) => f.write_str(w),
		}
	}
}
