use log::{info, warn};

use crate::bounding_box::BoundingBox;
use crate::db::{AlbumCounts, PhotoStore, StoreError};
use crate::resolver::{DownloadError, PhotoResolver};
use crate::sampler::{sample_urls, SampleError};
use crate::search_client::{ApiError, SearchClient};

#[derive(Debug, thiserror::Error)]
pub enum AlbumError {
    #[error("location {0} not found")]
    LocationMissing(i64),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    NoPhotos(#[from] SampleError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AlbumError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LocationMissing(id) => AlbumError::LocationMissing(id),
            other => AlbumError::Store(other),
        }
    }
}

/// Outcome of resolving one location's pending references.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ResolveOutcome {
    pub resolved: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Orchestrates the acquisition flow for one location: bounding box ->
/// random page -> page fetch -> bounded sample -> pending inserts, and the
/// later on-demand resolution of pending references.
#[derive(Clone)]
pub struct AlbumCoordinator {
    store: PhotoStore,
    search: SearchClient,
    resolver: PhotoResolver,
    bbox_half_width: f64,
    bbox_half_height: f64,
    sample_max: usize,
}

impl AlbumCoordinator {
    pub fn new(
        store: PhotoStore,
        search: SearchClient,
        resolver: PhotoResolver,
        bbox_half_width: f64,
        bbox_half_height: f64,
        sample_max: usize,
    ) -> Self {
        AlbumCoordinator {
            store,
            search,
            resolver,
            bbox_half_width,
            bbox_half_height,
            sample_max,
        }
    }

    pub fn store(&self) -> &PhotoStore {
        &self.store
    }

    /// Fetches a fresh batch of Pending references for a location. Nothing is
    /// inserted until the remote search and the sampling have both succeeded,
    /// so a failed refresh leaves the album exactly as it was.
    pub async fn refresh_album(&self, location_id: i64) -> Result<Vec<i64>, AlbumError> {
        let location = self
            .store
            .location(location_id)?
            .ok_or(AlbumError::LocationMissing(location_id))?;

        let bbox = BoundingBox::around(
            location.latitude,
            location.longitude,
            self.bbox_half_width,
            self.bbox_half_height,
        );

        let (page, first) = self.search.pick_random_page(&bbox).await?;
        // The page-count lookup already carried page 1's photo list; only
        // pages beyond it need a second round trip.
        let page_items = if page == 1 {
            first
        } else {
            self.search.fetch_page(&bbox, page).await?
        };

        let urls = sample_urls(&page_items.photo, self.sample_max)?;
        let ids = self.store.insert_pending_batch(location_id, &urls)?;
        info!(
            "refreshed album for location {}: {} pending references from page {}",
            location_id,
            ids.len(),
            page
        );
        Ok(ids)
    }

    /// Clears the album to Empty immediately, then refetches. Observers see
    /// one atomic delete batch before the new pending batch arrives.
    pub async fn replace_album(&self, location_id: i64) -> Result<Vec<i64>, AlbumError> {
        if self.store.location(location_id)?.is_none() {
            return Err(AlbumError::LocationMissing(location_id));
        }
        let cleared = self.store.delete_all_for_location(location_id)?;
        info!(
            "replacing album for location {}: cleared {} references",
            location_id, cleared
        );
        self.refresh_album(location_id).await
    }

    /// Deletes exactly the given references, leaving the rest untouched.
    pub fn remove_selected(
        &self,
        location_id: i64,
        photo_ids: &[i64],
    ) -> Result<usize, AlbumError> {
        if self.store.location(location_id)?.is_none() {
            return Err(AlbumError::LocationMissing(location_id));
        }
        Ok(self.store.delete_photos(location_id, photo_ids)?)
    }

    /// Resolves all pending references of a location concurrently. Download
    /// failures are isolated per photo: the failing reference stays Pending
    /// and its siblings keep resolving.
    pub async fn resolve_album(&self, location_id: i64) -> Result<ResolveOutcome, AlbumError> {
        if self.store.location(location_id)?.is_none() {
            return Err(AlbumError::LocationMissing(location_id));
        }
        let pending = self.store.pending_for_location(location_id)?;

        let mut tasks = Vec::with_capacity(pending.len());
        for photo in pending {
            let coordinator = self.clone();
            tasks.push(tokio::spawn(async move {
                coordinator.resolve_one(photo.id, &photo.source_url).await
            }));
        }

        let mut outcome = ResolveOutcome {
            resolved: 0,
            failed: 0,
            skipped: 0,
        };
        for task in tasks {
            match task.await {
                Ok(Ok(true)) => outcome.resolved += 1,
                Ok(Ok(false)) => outcome.skipped += 1,
                Ok(Err(())) => outcome.failed += 1,
                Err(e) => {
                    warn!("resolution task panicked: {}", e);
                    outcome.failed += 1;
                }
            }
        }
        info!(
            "resolved album for location {}: {} resolved, {} failed, {} skipped",
            location_id, outcome.resolved, outcome.failed, outcome.skipped
        );
        Ok(outcome)
    }

    /// Returns true if this call transitioned the reference to Resolved,
    /// false if it was skipped (mid-flight elsewhere, already resolved, or
    /// deleted underneath us), Err(()) on a download failure.
    async fn resolve_one(&self, photo_id: i64, url: &str) -> Result<bool, ()> {
        match self.resolver.resolve(photo_id, url).await {
            Ok(bytes) => match self.store.fill_content(photo_id, &bytes) {
                Ok(filled) => Ok(filled),
                Err(e) => {
                    warn!("failed to persist content for photo {}: {}", photo_id, e);
                    Err(())
                }
            },
            Err(DownloadError::InFlight(_)) => Ok(false),
            Err(e) => {
                warn!("failed to download photo {}: {}", photo_id, e);
                Err(())
            }
        }
    }

    /// Cache-first content access: serves stored bytes when the reference is
    /// Resolved, otherwise downloads, persists, and serves. Returns Ok(None)
    /// for an unknown reference.
    pub async fn photo_content(&self, photo_id: i64) -> Result<Option<Vec<u8>>, AlbumError> {
        let photo = match self.store.photo(photo_id)? {
            Some(photo) => photo,
            None => return Ok(None),
        };
        if let Some(bytes) = self.store.photo_content(photo_id)? {
            return Ok(Some(bytes));
        }

        match self.resolver.resolve(photo.id, &photo.source_url).await {
            Ok(bytes) => {
                // fill_content is idempotent; a concurrent resolver or a
                // deleted location makes it a no-op and we still serve the
                // bytes we fetched.
                self.store.fill_content(photo.id, &bytes)?;
                Ok(Some(bytes))
            }
            Err(DownloadError::InFlight(_)) => Ok(self.store.photo_content(photo_id)?),
            Err(e) => Err(e.into()),
        }
    }

    pub fn album_counts(&self, location_id: i64) -> Result<AlbumCounts, AlbumError> {
        if self.store.location(location_id)?.is_none() {
            return Err(AlbumError::LocationMissing(location_id));
        }
        Ok(self.store.album_counts(location_id)?)
    }
}
