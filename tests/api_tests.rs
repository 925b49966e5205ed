use std::net::SocketAddr;

use warp::Filter;

use pin_pix::album::AlbumCoordinator;
use pin_pix::db::{create_in_memory_pool, PhotoStore};
use pin_pix::resolver::PhotoResolver;
use pin_pix::routes;
use pin_pix::search_client::SearchClient;
use pin_pix::warp_helpers::handle_rejection;

async fn spawn_search_api(body: String) -> SocketAddr {
    let route = warp::path!("services" / "rest").map(move || body.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(warp::serve(route).incoming(listener).run());
    addr
}

fn search_body(urls: &[&str]) -> String {
    let photo: Vec<serde_json::Value> =
        urls.iter().map(|u| serde_json::json!({ "url_m": u })).collect();
    serde_json::json!({
        "photos": { "pages": 1, "photo": photo },
        "stat": "ok"
    })
    .to_string()
}

fn test_api(
    search_addr: SocketAddr,
) -> (
    PhotoStore,
    impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible>
        + Clone
        + Send
        + Sync
        + 'static,
) {
    let store = PhotoStore::new(create_in_memory_pool().unwrap());
    let search = SearchClient::new(
        format!("http://{}/services/rest", search_addr),
        "test-key".to_string(),
        30,
        5,
    )
    .unwrap();
    let resolver = PhotoResolver::new(5).unwrap();
    let coordinator =
        AlbumCoordinator::new(store.clone(), search, resolver, 1.0, 1.0, 45);

    let api = routes::build_health_routes(store.clone())
        .or(routes::build_location_routes(store.clone()))
        .or(routes::build_album_routes(coordinator.clone()))
        .or(routes::build_photo_routes(coordinator))
        .recover(handle_rejection);
    (store, api)
}

#[tokio::test]
async fn test_create_and_list_locations() {
    let search_addr = spawn_search_api(search_body(&[])).await;
    let (_store, api) = test_api(search_addr);

    let resp = warp::test::request()
        .method("POST")
        .path("/api/locations")
        .json(&serde_json::json!({ "latitude": 48.85, "longitude": 2.35 }))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 201);
    let created: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(created["latitude"], 48.85);

    let resp = warp::test::request()
        .method("GET")
        .path("/api/locations")
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 200);
    let listed: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_location_rejects_out_of_range_coordinates() {
    let search_addr = spawn_search_api(search_body(&[])).await;
    let (_store, api) = test_api(search_addr);

    let resp = warp::test::request()
        .method("POST")
        .path("/api/locations")
        .json(&serde_json::json!({ "latitude": 91.0, "longitude": 0.0 }))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 400);

    let resp = warp::test::request()
        .method("POST")
        .path("/api/locations")
        .json(&serde_json::json!({ "latitude": 0.0, "longitude": -180.5 }))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_delete_location_then_404() {
    let search_addr = spawn_search_api(search_body(&[])).await;
    let (store, api) = test_api(search_addr);
    let location = store.create_location(1.0, 2.0).unwrap();

    let resp = warp::test::request()
        .method("DELETE")
        .path(&format!("/api/locations/{}", location.id))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 204);

    let resp = warp::test::request()
        .method("DELETE")
        .path(&format!("/api/locations/{}", location.id))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_album_refresh_and_get() {
    let search_addr = spawn_search_api(search_body(&[
        "http://photos/a.jpg",
        "http://photos/b.jpg",
    ]))
    .await;
    let (store, api) = test_api(search_addr);
    let location = store.create_location(10.0, 20.0).unwrap();

    let resp = warp::test::request()
        .method("POST")
        .path(&format!("/api/locations/{}/album/refresh", location.id))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["inserted"], 2);

    let resp = warp::test::request()
        .method("GET")
        .path(&format!("/api/locations/{}/album", location.id))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 200);
    let album: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(album["state"], "populating");
    assert_eq!(album["total"], 2);
    assert_eq!(album["resolved"], 0);
    assert_eq!(album["photos"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_album_populates_on_first_view_when_asked() {
    let search_addr = spawn_search_api(search_body(&["http://photos/a.jpg"])).await;
    let (store, api) = test_api(search_addr);
    let location = store.create_location(10.0, 20.0).unwrap();

    let resp = warp::test::request()
        .method("GET")
        .path(&format!("/api/locations/{}/album?populate=true", location.id))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 200);
    let album: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(album["total"], 1);
}

#[tokio::test]
async fn test_remove_selected_photos() {
    let search_addr = spawn_search_api(search_body(&[])).await;
    let (store, api) = test_api(search_addr);
    let location = store.create_location(10.0, 20.0).unwrap();
    let ids = store
        .insert_pending_batch(
            location.id,
            &["http://a/1.jpg".to_string(), "http://a/2.jpg".to_string()],
        )
        .unwrap();

    let resp = warp::test::request()
        .method("DELETE")
        .path(&format!("/api/locations/{}/album", location.id))
        .json(&serde_json::json!({ "photo_ids": [ids[0]] }))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["deleted"], 1);
    assert_eq!(store.list_for_location(location.id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_album_refresh_surfaces_upstream_failure() {
    let search_addr =
        spawn_search_api(r#"{"stat":"fail","code":100,"message":"Invalid API Key"}"#.to_string())
            .await;
    let (store, api) = test_api(search_addr);
    let location = store.create_location(10.0, 20.0).unwrap();

    let resp = warp::test::request()
        .method("POST")
        .path(&format!("/api/locations/{}/album/refresh", location.id))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 502);
    let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert!(body["error"].as_str().unwrap().contains("Invalid API Key"));
}

#[tokio::test]
async fn test_unknown_photo_content_is_404() {
    let search_addr = spawn_search_api(search_body(&[])).await;
    let (_store, api) = test_api(search_addr);

    let resp = warp::test::request()
        .method("GET")
        .path("/api/photos/12345/content")
        .reply(&api)
        .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_health_endpoints() {
    let search_addr = spawn_search_api(search_body(&[])).await;
    let (_store, api) = test_api(search_addr);

    let resp = warp::test::request().path("/health").reply(&api).await;
    assert_eq!(resp.status(), 200);

    let resp = warp::test::request().path("/ready").reply(&api).await;
    assert_eq!(resp.status(), 200);
}
