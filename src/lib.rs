pub mod album;
pub mod bounding_box;
pub mod config;
pub mod db;
pub mod db_pool;
pub mod db_schema;
pub mod resolver;
pub mod routes;
pub mod sampler;
pub mod search_client;
pub mod warp_handlers;
pub mod warp_helpers;
