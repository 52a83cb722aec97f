use crate::latlng::LatLng;

/// Mean Earth radius (kilometres) used for great-circle distances.
pub const EARTH_MEAN_RADIUS_KM: f64 = 6_371.008_8;

/// Haversine great-circle distance between two positions, in kilometres.
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// True when `p` lies within `radius_km` of `center`.
pub fn within_radius_km(center: LatLng, p: LatLng, radius_km: f64) -> bool {
    haversine_km(center, p) <= radius_km
}
