use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use rs_story_core::StoryError;

/// HTTP view of a core error.
#[derive(Debug)]
pub struct ApiError(pub StoryError);

impl std::fmt::Display for ApiError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<StoryError> for ApiError {
	fn from(e: StoryError) -> Self {
		ApiError(e)
	}
}

impl From<actix_web::error::BlockingError> for ApiError {
	fn from(e: actix_web::error::BlockingError) -> Self {
		ApiError(StoryError::Io(std::io::Error::other(e.to_string())))
	}
}

impl ResponseError for ApiError {
	fn status_code(&self) -> StatusCode {
		match self.0 {
			StoryError::Input(_) => StatusCode::BAD_REQUEST,
			StoryError::ModelNotFound(_) | StoryError::PostNotFound(_) => StatusCode::NOT_FOUND,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn error_response(&self) -> HttpResponse {
		if self.status_code().is_server_error() {
			log::error!("{}", self.0);
		}
		HttpResponse::build(self.status_code()).body(self.0.to_string())
	}
}
