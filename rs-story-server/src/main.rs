use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use clap::Parser;
use log::info;

use rs_story_core::StoryService;
use rs_story_core::store::{FileStore, MemoryStore};

mod config;
mod error;
mod routes;
mod sink;

use config::ServerConfig;
use routes::AppState;

/// Largest accepted training body.
const MAX_TRAINING_BYTES: usize = 16 * 1024 * 1024;

/// Request log line: client IP (proxy aware), request line, status, size,
/// duration and user agent.
const ACCESS_LOG_FORMAT: &str = "%{r}a \"%r\" %s %b %Dms \"%{User-Agent}i\"";

/// Main entry point for the server.
///
/// Reads the configuration, opens the store, and starts an Actix-web
/// HTTP server sharing one `StoryService` across workers.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config = ServerConfig::parse();
	let service = if config.uses_memory_store() {
		info!("using the in-memory store");
		StoryService::from_store(MemoryStore::new(), config.generation())
	} else {
		info!("using the store at {}", config.data_dir);
		let store = FileStore::open(&config.data_dir).map_err(std::io::Error::other)?;
		StoryService::from_store(store, config.generation())
	};

	let state = web::Data::new(AppState {
		service,
		timing: config.timing(),
		home_posts: config.home_posts,
	});

	info!("listening on {}:{}", config.host, config.port);
	HttpServer::new(move || {
		App::new()
			.wrap(middleware::Logger::new(ACCESS_LOG_FORMAT))
			.wrap(
				Cors::default()
					.allow_any_origin()
					.allowed_methods(vec!["GET", "POST", "PUT"])
					.max_age(3600),
			)
			.app_data(state.clone())
			.app_data(web::PayloadConfig::new(MAX_TRAINING_BYTES))
			.configure(routes::configure)
	})
		.bind((config.host.as_str(), config.port))?
		.run()
		.await
}
