use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub db_path: String,
    pub search_endpoint: String,
    pub api_key: String,
    pub bbox_half_width: f64,
    pub bbox_half_height: f64,
    pub page_cap: u32,
    pub sample_max: usize,
    pub network_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            port: env::var("PIN_PIX_PORT")
                .unwrap_or_else(|_| "18474".to_string())
                .parse()?,
            host: env::var("PIN_PIX_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            db_path: env::var("PIN_PIX_DB_PATH")
                .unwrap_or_else(|_| "./data/database/pin-pix.db".to_string()),
            search_endpoint: env::var("PIN_PIX_SEARCH_ENDPOINT")
                .unwrap_or_else(|_| "https://api.flickr.com/services/rest".to_string()),
            api_key: env::var("PIN_PIX_API_KEY").unwrap_or_default(),
            bbox_half_width: env::var("PIN_PIX_BBOX_HALF_WIDTH")
                .unwrap_or_else(|_| "1.0".to_string())
                .parse()?,
            bbox_half_height: env::var("PIN_PIX_BBOX_HALF_HEIGHT")
                .unwrap_or_else(|_| "1.0".to_string())
                .parse()?,
            // The search API's result depth is unreliable beyond ~30 pages.
            page_cap: env::var("PIN_PIX_PAGE_CAP")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            sample_max: env::var("PIN_PIX_SAMPLE_MAX")
                .unwrap_or_else(|_| "45".to_string())
                .parse()?,
            network_timeout_secs: env::var("PIN_PIX_NETWORK_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
        })
    }
}
