use log::{error, info};
use std::net::TcpListener;
use warp::Filter;

use pin_pix::album::AlbumCoordinator;
use pin_pix::config::Config;
use pin_pix::db::{create_db_pool, PhotoStore};
use pin_pix::resolver::PhotoResolver;
use pin_pix::routes;
use pin_pix::search_client::SearchClient;
use pin_pix::warp_helpers::{cors, handle_rejection};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env()?;
    let port = config.port;

    info!("Starting PinPix server on Port {}", port);
    info!("Database: {}", config.db_path);
    info!("Search endpoint: {}", config.search_endpoint);

    // Check if port is available BEFORE initializing services
    if !is_port_available(port) {
        error!(
            "Port {} is already in use. Please stop any existing PinPix instances or use a different port.",
            port
        );
        return Err(format!("Port {} is already in use", port).into());
    }

    let (store, coordinator) = initialize_services(&config)?;

    let health_routes = routes::build_health_routes(store.clone());
    let location_routes = routes::build_location_routes(store);
    let album_routes = routes::build_album_routes(coordinator.clone());
    let photo_routes = routes::build_photo_routes(coordinator);

    let api = health_routes
        .or(location_routes)
        .or(album_routes)
        .or(photo_routes)
        .with(cors())
        .with(warp::log("pin_pix"))
        .recover(handle_rejection);

    info!(
        "Server started successfully, listening on http://localhost:{}",
        port
    );

    warp::serve(api).run(([0, 0, 0, 0], port)).await;

    Ok(())
}

fn is_port_available(port: u16) -> bool {
    TcpListener::bind(("0.0.0.0", port)).is_ok()
}

fn initialize_services(
    config: &Config,
) -> Result<(PhotoStore, AlbumCoordinator), Box<dyn std::error::Error>> {
    let pool = create_db_pool(&config.db_path)?;
    info!("Database initialized successfully");

    let store = PhotoStore::new(pool);
    let search = SearchClient::new(
        config.search_endpoint.clone(),
        config.api_key.clone(),
        config.page_cap,
        config.network_timeout_secs,
    )?;
    let resolver = PhotoResolver::new(config.network_timeout_secs)?;
    let coordinator = AlbumCoordinator::new(
        store.clone(),
        search,
        resolver,
        config.bbox_half_width,
        config.bbox_half_height,
        config.sample_max,
    );
    info!("Album coordinator initialized");

    Ok((store, coordinator))
}
