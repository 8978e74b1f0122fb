use thiserror::Error;

/// Failures raised while sampling from a transition model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
	/// The model holds no transitions at all.
	#[error("model has no transitions")]
	EmptyModel,

	/// A context was never observed and there is no alphabet to fall back on.
	#[error("no token alphabet to fall back on for an unseen context")]
	NoAlphabet,

	/// The sequence did not reach END within the configured bound.
	#[error("sequence exceeded {limit} tokens without reaching END")]
	TooLong { limit: usize },
}

/// Error taxonomy shared by every component of the crate.
///
/// Nothing retries internally: callers decide what a failure means to the user.
#[derive(Debug, Error)]
pub enum StoryError {
	/// Rejected request input (blank text or title, malformed seed or id).
	#[error("invalid input: {0}")]
	Input(String),

	/// No model in the store, or an unknown model id.
	#[error("model not found: {0}")]
	ModelNotFound(String),

	#[error("post not found: {0}")]
	PostNotFound(String),

	/// A stored blob could not be encoded or decoded.
	#[error("serialization error: {0}")]
	Serialization(String),

	#[error("generation failed: {0}")]
	Generation(#[from] GenerationError),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// The output sink rejected a write or flush (client went away).
	#[error("stream aborted: {0}")]
	StreamAborted(#[source] std::io::Error),
}

impl From<postcard::Error> for StoryError {
	fn from(e: postcard::Error) -> Self {
		StoryError::Serialization(e.to_string())
	}
}

pub type Result<T> = std::result::Result<T, StoryError>;
