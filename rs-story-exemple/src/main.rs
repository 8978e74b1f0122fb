use std::env;
use std::fs;
use std::time::Duration;

use rs_story_core::render::StreamRenderer;
use rs_story_core::store::MemoryStore;
use rs_story_core::{GenerationConfig, StoryService, StreamTiming};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Usage: rs-story-exemple [corpus.txt] [seed]
    let mut args = env::args().skip(1);
    let corpus_path = args.next().unwrap_or_else(|| "./data/corpus.txt".to_owned());
    let seed: i64 = match args.next() {
        Some(s) => s.parse()?,
        None => 42,
    };

    // Keep everything in memory; the server uses a directory-backed store instead
    let service = StoryService::from_store(MemoryStore::new(), GenerationConfig::default());

    // Train a first model on the whole corpus
    let text = fs::read_to_string(&corpus_path)?;
    let record = service.train(&text)?;
    log::info!("model {} trained from {}", record.id, corpus_path);

    // The same seed always gives the same page with the same model
    let page = service.page(seed)?;
    println!("{} ({})", page.link.title, page.link.url);
    println!("by {} on {}", page.author, page.last_updated.format("%Y-%m-%d"));
    for link in &page.links {
        println!("  -> {} ({})", link.title, link.url);
    }

    // Today's home page selection
    for (i, post) in service.home_page(5)?.iter().enumerate() {
        println!("Home post {}: {}", i + 1, post.link.title);
    }

    // Stream the page to stdout, a bit faster than the server does
    let timing = StreamTiming {
        title: Duration::from_millis(500),
        body: Duration::from_secs(3),
        link: Duration::from_millis(300),
        ..StreamTiming::default()
    };
    let mut stdout = std::io::stdout().lock();
    StreamRenderer::new(timing).stream_page(&page, &mut stdout)?;

    Ok(())
}
