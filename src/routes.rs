use warp::{Filter, Rejection, Reply};

use crate::album::AlbumCoordinator;
use crate::db::PhotoStore;
use crate::warp_handlers;
use crate::warp_helpers::{with_coordinator, with_store};

pub fn build_health_routes(
    store: PhotoStore,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::get())
        .and_then(warp_handlers::health_check);

    let ready = warp::path("ready")
        .and(warp::get())
        .and(with_store(store))
        .and_then(warp_handlers::ready_check);

    health.or(ready)
}

pub fn build_location_routes(
    store: PhotoStore,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let api_location_create = warp::path("api")
        .and(warp::path("locations"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json::<warp_handlers::CreateLocationRequest>())
        .and(with_store(store.clone()))
        .and_then(warp_handlers::create_location);

    let api_locations_list = warp::path("api")
        .and(warp::path("locations"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_store(store.clone()))
        .and_then(warp_handlers::list_locations);

    let api_location_delete = warp::path("api")
        .and(warp::path("locations"))
        .and(warp::path::param::<i64>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_store(store))
        .and_then(warp_handlers::delete_location);

    api_location_create
        .or(api_locations_list)
        .or(api_location_delete)
}

pub fn build_album_routes(
    coordinator: AlbumCoordinator,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let api_album_get = warp::path("api")
        .and(warp::path("locations"))
        .and(warp::path::param::<i64>())
        .and(warp::path("album"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<warp_handlers::AlbumQuery>())
        .and(with_coordinator(coordinator.clone()))
        .and_then(warp_handlers::get_album);

    let api_album_refresh = warp::path("api")
        .and(warp::path("locations"))
        .and(warp::path::param::<i64>())
        .and(warp::path("album"))
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_coordinator(coordinator.clone()))
        .and_then(warp_handlers::refresh_album);

    let api_album_replace = warp::path("api")
        .and(warp::path("locations"))
        .and(warp::path::param::<i64>())
        .and(warp::path("album"))
        .and(warp::path("replace"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_coordinator(coordinator.clone()))
        .and_then(warp_handlers::replace_album);

    let api_album_resolve = warp::path("api")
        .and(warp::path("locations"))
        .and(warp::path::param::<i64>())
        .and(warp::path("album"))
        .and(warp::path("resolve"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_coordinator(coordinator.clone()))
        .and_then(warp_handlers::resolve_album);

    let api_album_remove_selected = warp::path("api")
        .and(warp::path("locations"))
        .and(warp::path::param::<i64>())
        .and(warp::path("album"))
        .and(warp::path::end())
        .and(warp::delete())
        .and(warp::body::json::<warp_handlers::RemoveSelectedRequest>())
        .and(with_coordinator(coordinator))
        .and_then(warp_handlers::remove_selected);

    api_album_refresh
        .or(api_album_replace)
        .or(api_album_resolve)
        .or(api_album_remove_selected)
        .or(api_album_get)
}

pub fn build_photo_routes(
    coordinator: AlbumCoordinator,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("api")
        .and(warp::path("photos"))
        .and(warp::path::param::<i64>())
        .and(warp::path("content"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_coordinator(coordinator))
        .and_then(warp_handlers::get_photo_content)
}
