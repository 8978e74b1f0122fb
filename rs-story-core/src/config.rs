use std::time::Duration;

/// Limits applied while generating text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationConfig {
	/// Maximum number of tokens sampled for one sentence before giving up.
	///
	/// A model without a path to END from some reachable context would
	/// otherwise loop forever.
	pub max_tokens: usize,
}

impl Default for GenerationConfig {
	fn default() -> Self {
		Self { max_tokens: 1000 }
	}
}

/// Target durations for the streamed regions of a page.
///
/// Each target is spread evenly over the region's units and every pause is
/// varied by up to `jitter` (a fraction of the base delay) either way.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamTiming {
	/// Whole title, one unit per character.
	pub title: Duration,
	/// Whole body, one unit per word.
	pub body: Duration,
	/// Each related-link title, one unit per character.
	pub link: Duration,
	pub jitter: f64,
}

impl Default for StreamTiming {
	fn default() -> Self {
		Self {
			title: Duration::from_secs(2),
			body: Duration::from_secs(8),
			link: Duration::from_secs(1),
			jitter: 0.3,
		}
	}
}

impl StreamTiming {
	/// Timing with every pause set to zero.
	pub fn instant() -> Self {
		Self {
			title: Duration::ZERO,
			body: Duration::ZERO,
			link: Duration::ZERO,
			jitter: 0.0,
		}
	}

	/// Soft total duration of a stream with `links` related links.
	pub fn target_total(&self, links: usize) -> Duration {
		self.title + self.body + self.link * links as u32
	}
}
