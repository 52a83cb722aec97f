/// Geographic position in degrees.
///
/// No projection is implied; this is the order the hazard feeds and map
/// providers agree on.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Finite and inside `[-90, 90] x [-180, 180]`.
    pub fn is_valid(self) -> bool {
        self.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Vertex mean of `points`, or `None` for an empty slice.
pub fn centroid(points: &[LatLng]) -> Option<LatLng> {
    if points.is_empty() {
        return None;
    }
    let (mut lat, mut lng) = (0.0, 0.0);
    for p in points {
        lat += p.lat;
        lng += p.lng;
    }
    let n = points.len() as f64;
    Some(LatLng::new(lat / n, lng / n))
}
