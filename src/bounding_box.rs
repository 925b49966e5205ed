use std::fmt;

pub const LON_RANGE: (f64, f64) = (-180.0, 180.0);
pub const LAT_RANGE: (f64, f64) = (-90.0, 90.0);

/// Rectangular lat/lon search region derived from a point, clamped to the
/// valid coordinate ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn around(latitude: f64, longitude: f64, half_width: f64, half_height: f64) -> Self {
        BoundingBox {
            min_lon: (longitude - half_width).max(LON_RANGE.0),
            min_lat: (latitude - half_height).max(LAT_RANGE.0),
            max_lon: (longitude + half_width).min(LON_RANGE.1),
            max_lat: (latitude + half_height).min(LAT_RANGE.1),
        }
    }
}

impl fmt::Display for BoundingBox {
    /// The wire form the search API expects: "minLon,minLat,maxLon,maxLat".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}
