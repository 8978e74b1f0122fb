use actix_web::http::header;
use actix_web::{HttpResponse, Responder, get, post, put, web};
use log::info;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use rs_story_core::render::{StreamRenderer, escape};
use rs_story_core::{GeneratedPage, PageLink, StoryError, StoryService, StreamTiming};

use crate::error::ApiError;
use crate::sink::{CHANNEL_CAPACITY, ChannelSink};

/// Upper bound for `?posts=` on the home page.
const MAX_HOME_POSTS: usize = 50;

/// Query parameters of the home page.
#[derive(Deserialize)]
struct HomeQuery {
	posts: Option<usize>,
}

/// Body of `POST /api/posts`.
#[derive(Deserialize)]
struct NewPost {
	title: String,
	content: String,
}

/// State shared by every worker.
pub struct AppState {
	pub service: StoryService,
	pub timing: StreamTiming,
	pub home_posts: usize,
}

/// Registers every route on an app.
pub fn configure(cfg: &mut web::ServiceConfig) {
	cfg.service(home)
		.service(stream_post)
		.service(get_post)
		.service(train_model)
		.service(update_model)
		.service(active_model)
		.service(list_posts)
		.service(create_post)
		.service(get_stored_post);
}

/// HTTP GET `/`
///
/// Lists today's generated posts; `?posts=` overrides the configured count.
/// Falls back to a placeholder page while no model has been trained.
#[get("/")]
async fn home(data: web::Data<AppState>, query: web::Query<HomeQuery>) -> Result<HttpResponse, ApiError> {
	let count = query.posts.unwrap_or(data.home_posts).min(MAX_HOME_POSTS);
	let state = data.clone();
	let posts = web::block(move || state.service.home_page(count)).await?;

	match posts {
		Ok(posts) => Ok(html(home_html(&posts))),
		Err(StoryError::ModelNotFound(_)) => Ok(html(placeholder_html())),
		Err(e) => Err(e.into()),
	}
}

/// HTTP GET `/post/{seed}-{slug}`
///
/// Streams the page while it is "being written". The renderer runs on a
/// blocking thread and feeds the response through a channel; a client
/// disconnect closes the channel and stops the renderer.
#[get("/post/{slug}")]
async fn stream_post(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
	let seed = PageLink::seed_from_path(&path)?;
	let state = data.clone();
	let page = web::block(move || state.service.page(seed)).await??;

	let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
	let timing = data.timing.clone();
	actix_web::rt::task::spawn_blocking(move || {
		let mut sink = ChannelSink::new(tx);
		// Failures are logged by the renderer; the response just ends
		let _ = StreamRenderer::new(timing).stream_page(&page, &mut sink);
	});

	Ok(HttpResponse::Ok()
		.content_type("text/html; charset=utf-8")
		.insert_header((header::CACHE_CONTROL, "no-cache"))
		.streaming(ReceiverStream::new(rx)))
}

/// HTTP GET `/api/post/{seed}`
#[get("/api/post/{seed}")]
async fn get_post(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
	let seed = PageLink::seed_from_path(&path)?;
	let state = data.clone();
	let page = web::block(move || state.service.page(seed)).await??;
	Ok(HttpResponse::Ok().json(page))
}

/// HTTP POST `/api/models`
///
/// Trains a new model from the plain-text body.
#[post("/api/models")]
async fn train_model(data: web::Data<AppState>, body: String) -> Result<HttpResponse, ApiError> {
	let state = data.clone();
	let record = web::block(move || state.service.train(&body)).await??;
	info!("model {} is now active", record.id);
	Ok(HttpResponse::Created().json(record))
}

/// HTTP PUT `/api/models/{id}`
///
/// Adds the plain-text body to an existing model.
#[put("/api/models/{id}")]
async fn update_model(data: web::Data<AppState>, path: web::Path<String>, body: String) -> Result<HttpResponse, ApiError> {
	let id = path
		.parse::<u64>()
		.map_err(|_| StoryError::Input(format!("model id must be an integer, got {:?}", path.as_str())))?;
	let state = data.clone();
	let record = web::block(move || state.service.update(id, &body)).await??;
	Ok(HttpResponse::Ok().json(record))
}

/// HTTP GET `/api/models/active`
#[get("/api/models/active")]
async fn active_model(data: web::Data<AppState>) -> Result<impl Responder, ApiError> {
	let state = data.clone();
	let active = web::block(move || state.service.active()).await??;
	Ok(web::Json(active.record))
}

/// HTTP GET `/api/posts`
///
/// Every stored post, newest first.
#[get("/api/posts")]
async fn list_posts(data: web::Data<AppState>) -> Result<impl Responder, ApiError> {
	let state = data.clone();
	let posts = web::block(move || state.service.posts()).await??;
	Ok(web::Json(posts))
}

/// HTTP POST `/api/posts`
///
/// Stores a JSON `{ "title", "content" }` post; both fields must be non-blank.
#[post("/api/posts")]
async fn create_post(data: web::Data<AppState>, body: web::Json<NewPost>) -> Result<HttpResponse, ApiError> {
	let NewPost { title, content } = body.into_inner();
	let state = data.clone();
	let post = web::block(move || state.service.create_post(&title, &content)).await??;
	Ok(HttpResponse::Created().json(post))
}

/// HTTP GET `/api/posts/{id}`
#[get("/api/posts/{id}")]
async fn get_stored_post(data: web::Data<AppState>, path: web::Path<String>) -> Result<impl Responder, ApiError> {
	let id = path
		.parse::<u64>()
		.map_err(|_| StoryError::Input(format!("post id must be an integer, got {:?}", path.as_str())))?;
	let state = data.clone();
	let post = web::block(move || state.service.post(id)).await??;
	Ok(web::Json(post))
}

fn html(body: String) -> HttpResponse {
	HttpResponse::Ok().content_type("text/html; charset=utf-8").body(body)
}

fn home_html(posts: &[GeneratedPage]) -> String {
	let mut out = String::from(
		"<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Latest stories</title>\n</head>\n<body>\n<h1>Latest stories</h1>\n<ul class=\"posts\">\n",
	);
	for post in posts {
		out.push_str(&format!(
			"<li><a href=\"{}\">{}</a> <span class=\"byline\">{} &middot; {}</span></li>\n",
			escape(&post.link.url),
			escape(&post.link.title),
			escape(&post.author),
			post.last_updated.format("%B %-d, %Y"),
		));
	}
	out.push_str("</ul>\n</body>\n</html>\n");
	out
}

fn placeholder_html() -> String {
	"<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Nothing here yet</title>\n</head>\n<body>\n<h1>Nothing here yet</h1>\n<p>No stories have been written yet. Check back soon.</p>\n</body>\n</html>\n".to_owned()
}
