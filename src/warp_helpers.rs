use std::convert::Infallible;

use serde::Serialize;
use warp::{reject, Filter, Rejection, Reply};

use crate::album::{AlbumCoordinator, AlbumError};
use crate::db::PhotoStore;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub timestamp: String,
}

#[derive(Debug)]
pub struct DatabaseError {
    pub message: String,
}

impl reject::Reject for DatabaseError {}

#[derive(Debug)]
pub struct NotFoundError;
impl reject::Reject for NotFoundError {}

#[derive(Debug)]
pub struct ValidationError {
    pub message: String,
}

impl reject::Reject for ValidationError {}

/// The remote search or content API failed; surfaced as one user-visible
/// message per the retry-the-whole-action recovery model.
#[derive(Debug)]
pub struct UpstreamError {
    pub message: String,
}

impl reject::Reject for UpstreamError {}

#[derive(Debug)]
pub struct NoPhotosError {
    pub message: String,
}

impl reject::Reject for NoPhotosError {}

pub fn with_store(
    store: PhotoStore,
) -> impl Filter<Extract = (PhotoStore,), Error = Infallible> + Clone {
    warp::any().map(move || store.clone())
}

pub fn with_coordinator(
    coordinator: AlbumCoordinator,
) -> impl Filter<Extract = (AlbumCoordinator,), Error = Infallible> + Clone {
    warp::any().map(move || coordinator.clone())
}

pub fn album_error_rejection(err: AlbumError) -> Rejection {
    match err {
        AlbumError::LocationMissing(_) => reject::custom(NotFoundError),
        AlbumError::NoPhotos(e) => reject::custom(NoPhotosError {
            message: e.to_string(),
        }),
        AlbumError::Api(e) => reject::custom(UpstreamError {
            message: e.to_string(),
        }),
        AlbumError::Download(e) => reject::custom(UpstreamError {
            message: e.to_string(),
        }),
        AlbumError::Store(e) => {
            log::error!("database error: {}", e);
            reject::custom(DatabaseError {
                message: format!("Database error: {}", e),
            })
        }
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;
    let timestamp = chrono::Utc::now().to_rfc3339();

    if err.is_not_found() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(database_error) = err.find::<DatabaseError>() {
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = database_error.message.clone();
    } else if err.find::<NotFoundError>().is_some() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Not found".to_string();
    } else if let Some(validation_error) = err.find::<ValidationError>() {
        code = warp::http::StatusCode::BAD_REQUEST;
        message = validation_error.message.clone();
    } else if let Some(no_photos) = err.find::<NoPhotosError>() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = no_photos.message.clone();
    } else if let Some(upstream_error) = err.find::<UpstreamError>() {
        code = warp::http::StatusCode::BAD_GATEWAY;
        message = upstream_error.message.clone();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = warp::http::StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed".to_string();
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error".to_string();
    }

    let error_response = ErrorResponse {
        error: message,
        code: code.as_u16(),
        timestamp,
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&error_response),
        code,
    ))
}

pub fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
}
