use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("download failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("download returned status {0}")]
    Status(u16),
    #[error("photo {0} is already being resolved")]
    InFlight(i64),
}

/// Fetches the binary content behind a Pending reference's source URL.
///
/// Failures are per-photo; one failed download never aborts sibling
/// resolutions. An in-flight set keeps a reference that is visible to two
/// overlapping refreshes from being downloaded twice concurrently.
#[derive(Clone)]
pub struct PhotoResolver {
    http: reqwest::Client,
    in_flight: Arc<Mutex<HashSet<i64>>>,
}

struct InFlightGuard {
    set: Arc<Mutex<HashSet<i64>>>,
    id: i64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.id);
        }
    }
}

impl PhotoResolver {
    pub fn new(timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(PhotoResolver {
            http,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    pub async fn resolve(&self, photo_id: i64, url: &str) -> Result<Vec<u8>, DownloadError> {
        let _guard = self.begin(photo_id)?;

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    fn begin(&self, photo_id: i64) -> Result<InFlightGuard, DownloadError> {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !set.insert(photo_id) {
            return Err(DownloadError::InFlight(photo_id));
        }
        Ok(InFlightGuard {
            set: Arc::clone(&self.in_flight),
            id: photo_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_guard_blocks_and_releases() {
        let resolver = PhotoResolver::new(30).unwrap();

        let guard = resolver.begin(7).unwrap();
        assert!(matches!(resolver.begin(7), Err(DownloadError::InFlight(7))));
        // A different reference is unaffected.
        let other = resolver.begin(8).unwrap();
        drop(other);

        drop(guard);
        assert!(resolver.begin(7).is_ok());
    }
}
