use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoryError};

/// A link to a generated page.
///
/// The seed alone reproduces the page; the title and URL are derived from it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PageLink {
	pub url: String,
	pub title: String,
	pub seed: i64,
}

impl PageLink {
	/// Prefix of every page URL.
	pub const PATH_PREFIX: &'static str = "/post/";

	/// Extracts the seed from `{seed}-{slug}`, `{seed}` or a full
	/// `/post/{seed}-{slug}` path.
	///
	/// # Errors
	/// Returns an input error if no integer seed leads the path. Negative
	/// seeds keep their sign: `-12-slug` is seed -12.
	pub fn seed_from_path(path: &str) -> Result<i64> {
		let path = path.strip_prefix(Self::PATH_PREFIX).unwrap_or(path);
		// A leading '-' is the sign, the next one separates the slug
		let unsigned = path.strip_prefix('-').unwrap_or(path);
		let digits = unsigned.split('-').next().unwrap_or_default();
		path[..path.len() - unsigned.len() + digits.len()]
			.parse::<i64>()
			.map_err(|_| StoryError::Input(format!("no seed in page path {path:?}")))
	}
}

/// A complete generated page.
///
/// Fully determined by its seed, the model it was generated from and the
/// reference instant its timestamp is drawn relative to.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GeneratedPage {
	pub link: PageLink,
	pub content: String,
	pub links: Vec<PageLink>,
	pub last_updated: DateTime<Utc>,
	pub author: String,
}
