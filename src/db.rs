use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Result as SqlResult, Row};
use serde::Serialize;
use tokio::sync::broadcast;

pub use crate::db_pool::{create_db_pool, create_in_memory_pool, DbPool};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("location {0} not found")]
    LocationMissing(i64),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A saved geographic point of interest.
#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

/// One photo associated with a location. Pending while only the source URL is
/// known, Resolved once the binary content has been cached.
#[derive(Debug, Clone, Serialize)]
pub struct PhotoRecord {
    pub id: i64,
    pub location_id: i64,
    pub source_url: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreEventKind {
    Inserted,
    Deleted,
}

/// Emitted once per committed batch so observers see one atomic change-set
/// instead of N row-level notifications.
#[derive(Debug, Clone, Serialize)]
pub struct StoreEvent {
    pub location_id: i64,
    pub kind: StoreEventKind,
    pub photo_ids: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlbumState {
    Empty,
    Populating,
    Populated,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AlbumCounts {
    pub total: i64,
    pub resolved: i64,
}

impl AlbumCounts {
    pub fn state(&self) -> AlbumState {
        if self.total == 0 {
            AlbumState::Empty
        } else if self.resolved < self.total {
            AlbumState::Populating
        } else {
            AlbumState::Populated
        }
    }
}

fn parse_datetime(value: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(&value, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}

impl Location {
    pub fn from_row(row: &Row) -> SqlResult<Self> {
        Ok(Location {
            id: row.get(0)?,
            latitude: row.get(1)?,
            longitude: row.get(2)?,
            created_at: parse_datetime(row.get::<_, String>(3)?),
        })
    }
}

impl PhotoRecord {
    pub fn from_row(row: &Row) -> SqlResult<Self> {
        Ok(PhotoRecord {
            id: row.get(0)?,
            location_id: row.get(1)?,
            source_url: row.get(2)?,
            resolved: row.get(3)?,
            created_at: parse_datetime(row.get::<_, String>(4)?),
        })
    }
}

const PHOTO_COLUMNS: &str = "id, location_id, source_url, content IS NOT NULL, created_at";

/// The persisted table of photo references keyed by owning location. All
/// writes go through pooled connections and single-transaction batches.
#[derive(Clone)]
pub struct PhotoStore {
    pool: DbPool,
    events: broadcast::Sender<StoreEvent>,
}

impl PhotoStore {
    pub fn new(pool: DbPool) -> Self {
        let (events, _) = broadcast::channel(64);
        PhotoStore { pool, events }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, location_id: i64, kind: StoreEventKind, photo_ids: Vec<i64>) {
        if photo_ids.is_empty() {
            return;
        }
        // No receivers is fine; events are advisory.
        let _ = self.events.send(StoreEvent {
            location_id,
            kind,
            photo_ids,
        });
    }

    // ===== Locations =====

    pub fn create_location(&self, latitude: f64, longitude: f64) -> StoreResult<Location> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO locations (latitude, longitude, created_at) VALUES (?1, ?2, ?3)",
            params![latitude, longitude, Utc::now().to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();
        let location = conn.query_row(
            "SELECT id, latitude, longitude, created_at FROM locations WHERE id = ?1",
            [id],
            Location::from_row,
        )?;
        Ok(location)
    }

    pub fn location(&self, id: i64) -> StoreResult<Option<Location>> {
        let conn = self.pool.get()?;
        match conn.query_row(
            "SELECT id, latitude, longitude, created_at FROM locations WHERE id = ?1",
            [id],
            Location::from_row,
        ) {
            Ok(location) => Ok(Some(location)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_locations(&self) -> StoreResult<Vec<Location>> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT id, latitude, longitude, created_at FROM locations ORDER BY id")?;
        let locations = stmt
            .query_map([], Location::from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(locations)
    }

    /// Deletes a location; its photo references go with it in one transaction.
    pub fn delete_location(&self, id: i64) -> StoreResult<bool> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let photo_ids = {
            let mut stmt = tx.prepare("SELECT id FROM photos WHERE location_id = ?1")?;
            let ids = stmt
                .query_map([id], |row| row.get::<_, i64>(0))?
                .collect::<SqlResult<Vec<_>>>()?;
            ids
        };
        let deleted = tx.execute("DELETE FROM locations WHERE id = ?1", [id])?;
        tx.commit()?;
        self.emit(id, StoreEventKind::Deleted, photo_ids);
        Ok(deleted > 0)
    }

    // ===== Photo references =====

    /// Appends a batch of Pending references for a location in one
    /// transaction. Never overwrites existing references; a location deleted
    /// mid-flight makes this fail instead of inserting orphans.
    pub fn insert_pending_batch(&self, location_id: i64, urls: &[String]) -> StoreResult<Vec<i64>> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT COUNT(*) FROM locations WHERE id = ?1",
            [location_id],
            |row| row.get::<_, i64>(0).map(|n| n > 0),
        )?;
        if !exists {
            return Err(StoreError::LocationMissing(location_id));
        }

        let mut ids = Vec::with_capacity(urls.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO photos (location_id, source_url, created_at) VALUES (?1, ?2, ?3)",
            )?;
            let now = Utc::now().to_rfc3339();
            for url in urls {
                stmt.execute(params![location_id, url, now])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;

        self.emit(location_id, StoreEventKind::Inserted, ids.clone());
        Ok(ids)
    }

    /// Insertion order is not guaranteed to be preserved by the underlying
    /// store; callers must not depend on positional stability across fetches.
    pub fn list_for_location(&self, location_id: i64) -> StoreResult<Vec<PhotoRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM photos WHERE location_id = ?1",
            PHOTO_COLUMNS
        ))?;
        let photos = stmt
            .query_map([location_id], PhotoRecord::from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(photos)
    }

    pub fn pending_for_location(&self, location_id: i64) -> StoreResult<Vec<PhotoRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM photos WHERE location_id = ?1 AND content IS NULL",
            PHOTO_COLUMNS
        ))?;
        let photos = stmt
            .query_map([location_id], PhotoRecord::from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(photos)
    }

    pub fn photo(&self, id: i64) -> StoreResult<Option<PhotoRecord>> {
        let conn = self.pool.get()?;
        match conn.query_row(
            &format!("SELECT {} FROM photos WHERE id = ?1", PHOTO_COLUMNS),
            [id],
            PhotoRecord::from_row,
        ) {
            Ok(photo) => Ok(Some(photo)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn photo_content(&self, id: i64) -> StoreResult<Option<Vec<u8>>> {
        let conn = self.pool.get()?;
        match conn.query_row("SELECT content FROM photos WHERE id = ?1", [id], |row| {
            row.get::<_, Option<Vec<u8>>>(0)
        }) {
            Ok(content) => Ok(content),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Transitions Pending -> Resolved exactly once. Returns false without
    /// touching anything when the reference is already Resolved or gone
    /// (e.g. its location was deleted while the download was in flight).
    pub fn fill_content(&self, id: i64, content: &[u8]) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let updated = conn.execute(
            "UPDATE photos SET content = ?1 WHERE id = ?2 AND content IS NULL",
            params![content, id],
        )?;
        Ok(updated > 0)
    }

    /// Deletes exactly the given references of one location as a single
    /// transaction, leaving the rest untouched.
    pub fn delete_photos(&self, location_id: i64, photo_ids: &[i64]) -> StoreResult<usize> {
        if photo_ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let placeholders = photo_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "DELETE FROM photos WHERE location_id = ?1 AND id IN ({})",
            placeholders
        );
        let mut params: Vec<&dyn rusqlite::ToSql> = vec![&location_id];
        params.extend(photo_ids.iter().map(|id| id as &dyn rusqlite::ToSql));
        let deleted = tx.execute(&sql, params.as_slice())?;
        tx.commit()?;
        self.emit(location_id, StoreEventKind::Deleted, photo_ids.to_vec());
        Ok(deleted)
    }

    pub fn delete_all_for_location(&self, location_id: i64) -> StoreResult<usize> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let photo_ids = {
            let mut stmt = tx.prepare("SELECT id FROM photos WHERE location_id = ?1")?;
            let ids = stmt
                .query_map([location_id], |row| row.get::<_, i64>(0))?
                .collect::<SqlResult<Vec<_>>>()?;
            ids
        };
        let deleted = tx.execute("DELETE FROM photos WHERE location_id = ?1", [location_id])?;
        tx.commit()?;
        self.emit(location_id, StoreEventKind::Deleted, photo_ids);
        Ok(deleted)
    }

    pub fn album_counts(&self, location_id: i64) -> StoreResult<AlbumCounts> {
        let conn = self.pool.get()?;
        let (total, resolved) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(content IS NOT NULL), 0)
             FROM photos WHERE location_id = ?1",
            [location_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        Ok(AlbumCounts { total, resolved })
    }
}
