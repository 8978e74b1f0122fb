use chrono::{DateTime, Months, NaiveTime, TimeDelta, Utc};
use log::debug;
use rand::{Rng, RngCore};

use super::page::{GeneratedPage, PageLink};
use super::slug::slugify;
use crate::config::GenerationConfig;
use crate::error::Result;
use crate::model::transition_model::TransitionModel;
use crate::model::{PageRng, seeded_rng};

/// Bylines a page can be attributed to.
pub const AUTHORS: [&str; 7] = [
	"Harriet Vane",
	"Oswin Talbot",
	"Maren Quist",
	"Desmond Aylward",
	"Ines Carrow",
	"Felix Ambrose",
	"Tamsin Rook",
];

/// Seconds in one day-bucket of the home page.
pub const DAY_SECONDS: i64 = 86_400;

/// Distance between the seeds of consecutive home page posts.
pub const HOME_SEED_STRIDE: i64 = 1000;

/// Inclusive range of sentences in a page body.
const BODY_SENTENCES: std::ops::RangeInclusive<usize> = 1..=10;

/// Inclusive range of related links on a page.
const RELATED_LINKS: std::ops::RangeInclusive<usize> = 1..=3;

/// Composes whole pages from a single integer seed.
///
/// # Responsibilities
/// - Derive the page link (title, slug, URL) from the seed
/// - Generate the body, related links, timestamp and author in a fixed order
/// - Build the daily home page selection
///
/// Every step draws from one generator built from the seed, so the order
/// of the steps is part of the output format: reordering them changes
/// every published page.
#[derive(Debug, Clone, Copy)]
pub struct StoryGenerator<'a> {
	model: &'a TransitionModel,
	config: &'a GenerationConfig,
}

/// Start of the UTC day containing `instant`.
pub fn day_start(instant: DateTime<Utc>) -> DateTime<Utc> {
	instant.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Base seed shared by every home page post generated during `now`'s day.
pub fn day_bucket_seed(now: DateTime<Utc>) -> i64 {
	now.timestamp().div_euclid(DAY_SECONDS)
}

impl<'a> StoryGenerator<'a> {
	pub fn new(model: &'a TransitionModel, config: &'a GenerationConfig) -> Self {
		Self { model, config }
	}

	/// Generates the page for `seed`, timestamped relative to today.
	///
	/// The reference instant is the start of the current UTC day, so the
	/// same seed yields the same page for the whole day.
	pub fn generate_page(&self, seed: i64) -> Result<GeneratedPage> {
		self.generate_page_at(seed, day_start(Utc::now()))
	}

	/// Generates the page for `seed` with its timestamp drawn from the two
	/// years before `reference`.
	///
	/// # Errors
	/// Propagates any sampling failure of the model.
	pub fn generate_page_at(&self, seed: i64, reference: DateTime<Utc>) -> Result<GeneratedPage> {
		let mut prng = seeded_rng(seed);

		let link = self.link_from_seed(seed, &mut prng)?;
		let content = self.paragraph(&mut prng)?;
		let links = self.related_links(&mut prng)?;
		let last_updated = random_date(&mut prng, reference);
		let author = AUTHORS[prng.random_range(0..AUTHORS.len())].to_owned();

		debug!("generated page {} with {} related links", link.url, links.len());

		Ok(GeneratedPage { link, content, links, last_updated, author })
	}

	/// Generates `count` home page posts for the current day.
	pub fn home_page_posts(&self, count: usize) -> Result<Vec<GeneratedPage>> {
		self.home_page_posts_at(count, Utc::now())
	}

	/// Generates `count` home page posts for the day containing `now`.
	///
	/// Post `i` uses seed `day_bucket_seed(now) + i * 1000`, so the selection
	/// is identical for every call within a day and changes at midnight UTC.
	pub fn home_page_posts_at(&self, count: usize, now: DateTime<Utc>) -> Result<Vec<GeneratedPage>> {
		let base = day_bucket_seed(now);
		let reference = day_start(now);

		(0..count as i64)
			.map(|i| self.generate_page_at(base + i * HOME_SEED_STRIDE, reference))
			.collect()
	}

	/// Builds the title, slug and URL for `seed` from `prng`.
	fn link_from_seed(&self, seed: i64, prng: &mut PageRng) -> Result<PageLink> {
		let title = self.model.generate_sequence(prng, self.config)?;
		let url = format!("{}{}-{}", PageLink::PATH_PREFIX, seed, slugify(&title));
		Ok(PageLink { url, title, seed })
	}

	fn paragraph(&self, prng: &mut PageRng) -> Result<String> {
		let count = prng.random_range(BODY_SENTENCES);
		let mut sentences = Vec::with_capacity(count);
		for _ in 0..count {
			sentences.push(self.model.generate_sequence(prng, self.config)?);
		}
		Ok(sentences.join(" "))
	}

	/// Each related link gets its own seed drawn from the page generator and
	/// its own generator built from that seed, so it is the same link as the
	/// page it points to.
	fn related_links(&self, prng: &mut PageRng) -> Result<Vec<PageLink>> {
		let count = prng.random_range(RELATED_LINKS);
		let mut links = Vec::with_capacity(count);
		for _ in 0..count {
			let seed = (prng.next_u64() >> 1) as i64;
			let mut link_prng = seeded_rng(seed);
			links.push(self.link_from_seed(seed, &mut link_prng)?);
		}
		Ok(links)
	}
}

/// Uniform instant in the two years before `reference`.
fn random_date(prng: &mut PageRng, reference: DateTime<Utc>) -> DateTime<Utc> {
	let two_years_ago = reference
		.checked_sub_months(Months::new(24))
		.unwrap_or(reference - TimeDelta::days(730));
	let range = (reference - two_years_ago).num_seconds().max(1);
	two_years_ago + TimeDelta::seconds(prng.random_range(0..range))
}
