use serde::{Deserialize, Serialize};
use serde_json::json;

use std::convert::Infallible;
use warp::{reject, Rejection, Reply};

use crate::album::AlbumCoordinator;
use crate::bounding_box::{LAT_RANGE, LON_RANGE};
use crate::db::{AlbumState, Location, PhotoRecord, PhotoStore};
use crate::warp_helpers::{album_error_rejection, DatabaseError, NotFoundError, ValidationError};

#[derive(Debug, Deserialize)]
pub struct CreateLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct AlbumQuery {
    pub populate: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveSelectedRequest {
    pub photo_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct AlbumResponse {
    pub location: Location,
    pub state: AlbumState,
    pub total: i64,
    pub resolved: i64,
    pub photos: Vec<PhotoRecord>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub inserted: usize,
    pub photo_ids: Vec<i64>,
}

pub async fn health_check() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

pub async fn ready_check(store: PhotoStore) -> Result<impl Reply, Rejection> {
    // Test database connection
    match store.pool().get() {
        Ok(_) => Ok(warp::reply::json(&json!({
            "status": "ready",
            "database": "connected",
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))),
        Err(e) => {
            log::error!("Database connection failed: {}", e);
            Err(reject::custom(DatabaseError {
                message: "Database connection failed".to_string(),
            }))
        }
    }
}

pub async fn create_location(
    request: CreateLocationRequest,
    store: PhotoStore,
) -> Result<impl Reply, Rejection> {
    if !(LAT_RANGE.0..=LAT_RANGE.1).contains(&request.latitude) {
        return Err(reject::custom(ValidationError {
            message: format!("latitude {} is out of range [-90, 90]", request.latitude),
        }));
    }
    if !(LON_RANGE.0..=LON_RANGE.1).contains(&request.longitude) {
        return Err(reject::custom(ValidationError {
            message: format!("longitude {} is out of range [-180, 180]", request.longitude),
        }));
    }

    match store.create_location(request.latitude, request.longitude) {
        Ok(location) => Ok(warp::reply::with_status(
            warp::reply::json(&location),
            warp::http::StatusCode::CREATED,
        )),
        Err(e) => {
            log::error!("Database error: {}", e);
            Err(reject::custom(DatabaseError {
                message: format!("Database error: {}", e),
            }))
        }
    }
}

pub async fn list_locations(store: PhotoStore) -> Result<impl Reply, Rejection> {
    match store.list_locations() {
        Ok(locations) => Ok(warp::reply::json(&locations)),
        Err(e) => {
            log::error!("Database error: {}", e);
            Err(reject::custom(DatabaseError {
                message: format!("Database error: {}", e),
            }))
        }
    }
}

pub async fn delete_location(location_id: i64, store: PhotoStore) -> Result<impl Reply, Rejection> {
    match store.delete_location(location_id) {
        Ok(true) => Ok(warp::reply::with_status(
            warp::reply(),
            warp::http::StatusCode::NO_CONTENT,
        )),
        Ok(false) => Err(reject::custom(NotFoundError)),
        Err(e) => {
            log::error!("Database error: {}", e);
            Err(reject::custom(DatabaseError {
                message: format!("Database error: {}", e),
            }))
        }
    }
}

pub async fn get_album(
    location_id: i64,
    query: AlbumQuery,
    coordinator: AlbumCoordinator,
) -> Result<impl Reply, Rejection> {
    let store = coordinator.store().clone();
    let location = store
        .location(location_id)
        .map_err(|e| {
            reject::custom(DatabaseError {
                message: format!("Database error: {}", e),
            })
        })?
        .ok_or_else(|| reject::custom(NotFoundError))?;

    // An empty album populates itself on first view when asked to, the way
    // the album screen loads a fresh set for a pin that has none saved.
    let counts = coordinator
        .album_counts(location_id)
        .map_err(album_error_rejection)?;
    if counts.total == 0 && query.populate.unwrap_or(false) {
        coordinator
            .refresh_album(location_id)
            .await
            .map_err(album_error_rejection)?;
    }

    let photos = store
        .list_for_location(location_id)
        .map_err(|e| {
            reject::custom(DatabaseError {
                message: format!("Database error: {}", e),
            })
        })?;
    let counts = coordinator
        .album_counts(location_id)
        .map_err(album_error_rejection)?;

    Ok(warp::reply::json(&AlbumResponse {
        location,
        state: counts.state(),
        total: counts.total,
        resolved: counts.resolved,
        photos,
    }))
}

pub async fn refresh_album(
    location_id: i64,
    coordinator: AlbumCoordinator,
) -> Result<impl Reply, Rejection> {
    let photo_ids = coordinator
        .refresh_album(location_id)
        .await
        .map_err(album_error_rejection)?;
    Ok(warp::reply::json(&RefreshResponse {
        inserted: photo_ids.len(),
        photo_ids,
    }))
}

pub async fn replace_album(
    location_id: i64,
    coordinator: AlbumCoordinator,
) -> Result<impl Reply, Rejection> {
    let photo_ids = coordinator
        .replace_album(location_id)
        .await
        .map_err(album_error_rejection)?;
    Ok(warp::reply::json(&RefreshResponse {
        inserted: photo_ids.len(),
        photo_ids,
    }))
}

pub async fn remove_selected(
    location_id: i64,
    request: RemoveSelectedRequest,
    coordinator: AlbumCoordinator,
) -> Result<impl Reply, Rejection> {
    let deleted = coordinator
        .remove_selected(location_id, &request.photo_ids)
        .map_err(album_error_rejection)?;
    Ok(warp::reply::json(&json!({ "deleted": deleted })))
}

pub async fn resolve_album(
    location_id: i64,
    coordinator: AlbumCoordinator,
) -> Result<impl Reply, Rejection> {
    let outcome = coordinator
        .resolve_album(location_id)
        .await
        .map_err(album_error_rejection)?;
    Ok(warp::reply::json(&outcome))
}

pub async fn get_photo_content(
    photo_id: i64,
    coordinator: AlbumCoordinator,
) -> Result<impl Reply, Rejection> {
    let bytes = coordinator
        .photo_content(photo_id)
        .await
        .map_err(album_error_rejection)?
        .ok_or_else(|| reject::custom(NotFoundError))?;

    warp::http::Response::builder()
        .header("content-type", "image/jpeg")
        .body(bytes)
        .map_err(|e| {
            log::error!("Failed to build content response: {}", e);
            reject::custom(DatabaseError {
                message: "Failed to build response".to_string(),
            })
        })
}
