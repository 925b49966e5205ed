use std::time::Duration;

use log::debug;
use rand::Rng;
use serde::Deserialize;

use crate::bounding_box::BoundingBox;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("search request returned status {0}")]
    Status(u16),
    #[error("search response had an empty body")]
    EmptyBody,
    #[error("could not parse search response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("search API returned an error status: {0}")]
    Api(String),
    #[error("search response is missing the '{0}' field")]
    MissingField(&'static str),
}

/// One page of search results: the total page count reported by the API and
/// the photo entries on this page.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoPage {
    pub pages: Option<u32>,
    #[serde(default)]
    pub photo: Vec<PageItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageItem {
    #[serde(default)]
    pub url_m: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    stat: Option<String>,
    message: Option<String>,
    photos: Option<PhotoPage>,
}

/// Client for the remote paginated photo-search API.
#[derive(Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    page_cap: u32,
}

impl SearchClient {
    pub fn new(
        endpoint: String,
        api_key: String,
        page_cap: u32,
        timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(SearchClient {
            http,
            endpoint,
            api_key,
            page_cap,
        })
    }

    /// Picks a page uniformly at random within `[1, min(pages, page_cap)]`.
    /// Also returns the first response's page so callers can reuse it when
    /// the drawn page is 1 instead of repeating an identical request.
    pub async fn pick_random_page(&self, bbox: &BoundingBox) -> Result<(u32, PhotoPage), ApiError> {
        let first = self.fetch(bbox, None).await?;
        let total_pages = first.pages.ok_or(ApiError::MissingField("photos.pages"))?;
        let page_limit = total_pages.min(self.page_cap).max(1);
        let page = rand::rng().random_range(1..=page_limit);
        debug!("picked page {} of {} (cap {})", page, total_pages, self.page_cap);
        Ok((page, first))
    }

    pub async fn fetch_page(&self, bbox: &BoundingBox, page: u32) -> Result<PhotoPage, ApiError> {
        self.fetch(bbox, Some(page)).await
    }

    async fn fetch(&self, bbox: &BoundingBox, page: Option<u32>) -> Result<PhotoPage, ApiError> {
        let mut query = vec![
            ("method", "flickr.photos.search".to_string()),
            ("api_key", self.api_key.clone()),
            ("bbox", bbox.to_string()),
            ("safe_search", "1".to_string()),
            ("extras", "url_m".to_string()),
            ("format", "json".to_string()),
            ("nojsoncallback", "1".to_string()),
        ];
        if let Some(page) = page {
            query.push(("page", page.to_string()));
        }

        let response = self.http.get(&self.endpoint).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_search_body(&body)
    }
}

/// Shared guard-and-parse step for both search calls.
pub fn parse_search_body(body: &str) -> Result<PhotoPage, ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::EmptyBody);
    }
    let envelope: SearchEnvelope = serde_json::from_str(body)?;
    match envelope.stat.as_deref() {
        Some("ok") => {}
        Some(stat) => {
            let detail = envelope.message.unwrap_or_else(|| stat.to_string());
            return Err(ApiError::Api(detail));
        }
        None => return Err(ApiError::MissingField("stat")),
    }
    envelope.photos.ok_or(ApiError::MissingField("photos"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok_response() {
        let body = r#"{"photos":{"pages":5,"photo":[{"url_m":"http://a/1.jpg"},{}]},"stat":"ok"}"#;
        let page = parse_search_body(body).unwrap();
        assert_eq!(page.pages, Some(5));
        assert_eq!(page.photo.len(), 2);
        assert_eq!(page.photo[0].url_m.as_deref(), Some("http://a/1.jpg"));
        assert!(page.photo[1].url_m.is_none());
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(matches!(parse_search_body("  "), Err(ApiError::EmptyBody)));
    }

    #[test]
    fn test_parse_malformed_json() {
        assert!(matches!(
            parse_search_body("{not json"),
            Err(ApiError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_api_failure_status() {
        let body = r#"{"stat":"fail","code":100,"message":"Invalid API Key"}"#;
        match parse_search_body(body) {
            Err(ApiError::Api(message)) => assert_eq!(message, "Invalid API Key"),
            other => panic!("expected api error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_parse_missing_photos_field() {
        let body = r#"{"stat":"ok"}"#;
        assert!(matches!(
            parse_search_body(body),
            Err(ApiError::MissingField("photos"))
        ));
    }
}
