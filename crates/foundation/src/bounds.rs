use crate::latlng::LatLng;

/// Axis-aligned lat/lng bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl GeoBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        GeoBounds {
            south_west,
            north_east,
        }
    }

    /// A degenerate box containing exactly `p`.
    pub fn from_point(p: LatLng) -> Self {
        GeoBounds::new(p, p)
    }

    /// Smallest box containing every point, or `None` when `points` is empty.
    pub fn from_points(points: &[LatLng]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut b = GeoBounds::from_point(*first);
        for p in rest {
            b.extend(*p);
        }
        Some(b)
    }

    pub fn extend(&mut self, p: LatLng) {
        self.south_west.lat = self.south_west.lat.min(p.lat);
        self.south_west.lng = self.south_west.lng.min(p.lng);
        self.north_east.lat = self.north_east.lat.max(p.lat);
        self.north_east.lng = self.north_east.lng.max(p.lng);
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }

    pub fn contains(&self, p: LatLng) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&p.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&p.lng)
    }

    pub fn is_point(&self) -> bool {
        self.south_west == self.north_east
    }
}

#[cfg(test)]
mod tests {
    use super::GeoBounds;
    use crate::latlng::LatLng;

    #[test]
    fn from_points_spans_all_inputs() {
        let b = GeoBounds::from_points(&[
            LatLng::new(10.73, 122.55),
            LatLng::new(10.70, 122.60),
            LatLng::new(10.75, 122.50),
        ])
        .expect("bounds");
        assert_eq!(b.south_west, LatLng::new(10.70, 122.50));
        assert_eq!(b.north_east, LatLng::new(10.75, 122.60));
        assert!(b.contains(LatLng::new(10.72, 122.58)));
        assert!(!b.is_point());
    }

    #[test]
    fn single_point_is_degenerate() {
        let p = LatLng::new(1.0, 2.0);
        let b = GeoBounds::from_points(&[p]).expect("bounds");
        assert!(b.is_point());
        assert_eq!(b.center(), p);
        assert_eq!(GeoBounds::from_points(&[]), None);
    }
}
