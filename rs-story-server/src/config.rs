use std::time::Duration;

use clap::Parser;

use rs_story_core::{GenerationConfig, StreamTiming};

/// Value of `--data-dir` that selects the in-memory store.
pub const MEMORY_STORE: &str = "memory";

/// Command-line / environment configuration of the server.
#[derive(Parser, Debug, Clone)]
#[command(name = "rs-story-server", version, about = "Serves generated story pages")]
pub struct ServerConfig {
	/// Address to bind
	#[arg(long, env = "STORY_HOST", default_value = "127.0.0.1")]
	pub host: String,

	/// Port to bind
	#[arg(long, env = "STORY_PORT", default_value_t = 5000)]
	pub port: u16,

	/// Directory holding trained models and posts, or "memory" for a process-local store
	#[arg(long, env = "STORY_DATA_DIR", default_value = "./data")]
	pub data_dir: String,

	/// Number of posts listed on the home page
	#[arg(long, env = "STORY_HOME_POSTS", default_value_t = 12)]
	pub home_posts: usize,

	/// Maximum tokens sampled for one sentence
	#[arg(long, env = "STORY_MAX_TOKENS", default_value_t = 1000)]
	pub max_tokens: usize,

	/// Target time to stream a page title, in milliseconds
	#[arg(long, env = "STORY_TITLE_MS", default_value_t = 2000)]
	pub title_ms: u64,

	/// Target time to stream a page body, in milliseconds
	#[arg(long, env = "STORY_BODY_MS", default_value_t = 8000)]
	pub body_ms: u64,

	/// Target time to stream each related-link title, in milliseconds
	#[arg(long, env = "STORY_LINK_MS", default_value_t = 1000)]
	pub link_ms: u64,
}

impl ServerConfig {
	pub fn generation(&self) -> GenerationConfig {
		GenerationConfig { max_tokens: self.max_tokens }
	}

	pub fn timing(&self) -> StreamTiming {
		StreamTiming {
			title: Duration::from_millis(self.title_ms),
			body: Duration::from_millis(self.body_ms),
			link: Duration::from_millis(self.link_ms),
			..StreamTiming::default()
		}
	}

	pub fn uses_memory_store(&self) -> bool {
		self.data_dir == MEMORY_STORE
	}
}
