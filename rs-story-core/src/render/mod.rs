//! Timed, incremental page emission.
//!
//! A page is written to any `std::io::Write` sink region by region: title,
//! body, then each related-link title, with structural markup in between.
//! Inside a region every unit (a character, or a word for the body) is
//! written, flushed, then followed by a jittered pause, so the reader sees
//! the page being composed.

use std::io::Write;
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;

use crate::config::StreamTiming;
use crate::error::{Result, StoryError};
use crate::story::page::GeneratedPage;

/// Suspends the stream between two units.
pub trait Pacer {
	fn pause(&mut self, delay: Duration);
}

/// Pacer that blocks the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
	fn pause(&mut self, delay: Duration) {
		if !delay.is_zero() {
			thread::sleep(delay);
		}
	}
}

/// Writes generated pages as a paced stream.
///
/// # Notes
/// - The total duration is a soft target (sum of the region targets);
///   jitter makes every run slightly different.
/// - The first failed write or flush aborts the stream: nothing after it is
///   emitted and `StoryError::StreamAborted` is returned. This is how a
///   client disconnect stops the playback.
#[derive(Debug)]
pub struct StreamRenderer<P: Pacer = ThreadPacer> {
	timing: StreamTiming,
	pacer: P,
}

impl StreamRenderer<ThreadPacer> {
	pub fn new(timing: StreamTiming) -> Self {
		Self::with_pacer(timing, ThreadPacer)
	}
}

impl<P: Pacer> StreamRenderer<P> {
	pub fn with_pacer(timing: StreamTiming, pacer: P) -> Self {
		Self { timing, pacer }
	}

	pub fn timing(&self) -> &StreamTiming {
		&self.timing
	}

	/// Streams `page` to `sink`: header and title, body, related links, footer.
	pub fn stream_page<W: Write>(&mut self, page: &GeneratedPage, sink: &mut W) -> Result<()> {
		let result = self.emit_page(page, sink);
		match &result {
			Ok(()) => debug!("streamed {}", page.link.url),
			Err(e) => warn!("stream of {} stopped: {}", page.link.url, e),
		}
		result
	}

	fn emit_page<W: Write>(&mut self, page: &GeneratedPage, sink: &mut W) -> Result<()> {
		let title = escape(&page.link.title);
		write_markup(
			sink,
			&format!(
				"<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<article>\n<h1>"
			),
		)?;
		self.stream_units(sink, &char_units(&page.link.title), self.timing.title)?;
		write_markup(
			sink,
			&format!(
				"</h1>\n<p class=\"byline\">By {} &middot; {}</p>\n<p>",
				escape(&page.author),
				page.last_updated.format("%B %-d, %Y")
			),
		)?;

		self.stream_units(sink, &word_units(&page.content), self.timing.body)?;
		write_markup(sink, "</p>\n</article>\n<nav>\n<h2>Related</h2>\n<ul>\n")?;

		for link in &page.links {
			write_markup(sink, &format!("<li><a href=\"{}\">", escape(&link.url)))?;
			self.stream_units(sink, &char_units(&link.title), self.timing.link)?;
			write_markup(sink, "</a></li>\n")?;
		}

		write_markup(sink, "</ul>\n</nav>\n</body>\n</html>\n")
	}

	/// Emits one region: every unit is escaped, written, flushed and
	/// followed by a pause of `target / units` varied by the jitter.
	pub fn stream_units<W: Write>(&mut self, sink: &mut W, units: &[String], target: Duration) -> Result<()> {
		if units.is_empty() {
			return Ok(());
		}

		let delay = target / units.len() as u32;
		let mut rng = rand::rng();
		for unit in units {
			sink.write_all(escape(unit).as_bytes()).map_err(StoryError::StreamAborted)?;
			sink.flush().map_err(StoryError::StreamAborted)?;
			self.pacer.pause(jittered(delay, self.timing.jitter, &mut rng));
		}

		Ok(())
	}
}

/// `base` varied uniformly by up to `jitter * base` either way.
pub fn jittered<R: Rng>(base: Duration, jitter: f64, rng: &mut R) -> Duration {
	if jitter <= 0.0 || base.is_zero() {
		return base;
	}
	let jitter = jitter.min(1.0);
	base.mul_f64(1.0 + rng.random_range(-jitter..=jitter))
}

/// One unit per character.
pub fn char_units(text: &str) -> Vec<String> {
	text.chars().map(String::from).collect()
}

/// One unit per word; every word but the last carries its trailing space.
pub fn word_units(text: &str) -> Vec<String> {
	let words: Vec<&str> = text.split_whitespace().collect();
	let last = words.len().saturating_sub(1);
	words
		.iter()
		.enumerate()
		.map(|(i, w)| if i < last { format!("{w} ") } else { (*w).to_owned() })
		.collect()
}

fn write_markup<W: Write>(sink: &mut W, markup: &str) -> Result<()> {
	sink.write_all(markup.as_bytes()).map_err(StoryError::StreamAborted)?;
	sink.flush().map_err(StoryError::StreamAborted)
}

/// Escapes text for HTML element content and attribute values.
pub fn escape(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			c => out.push(c),
		}
	}
	out
}
