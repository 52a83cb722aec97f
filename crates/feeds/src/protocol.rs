//! Wire-level vocabulary shared by hazard feed clients and servers.
//!
//! A feed is addressed as `GET {base}/hazard/{kind}` with an optional scope
//! in the query string (`lat`, `lng`, `radiusKm`, `hours`).

use std::fmt;
use std::str::FromStr;

use foundation::LatLng;
use serde::{Deserialize, Serialize};

/// One hazard category with its own feed endpoint and classifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardKind {
    Flood,
    Landslide,
    Seismic,
    Weather,
    Fire,
}

impl HazardKind {
    /// Sources every deployment is expected to register.
    pub const REQUIRED: [HazardKind; 4] = [
        HazardKind::Flood,
        HazardKind::Landslide,
        HazardKind::Seismic,
        HazardKind::Weather,
    ];

    pub const ALL: [HazardKind; 5] = [
        HazardKind::Flood,
        HazardKind::Landslide,
        HazardKind::Seismic,
        HazardKind::Weather,
        HazardKind::Fire,
    ];

    /// Path segment under `/hazard/`.
    pub fn path(self) -> &'static str {
        match self {
            HazardKind::Flood => "flood",
            HazardKind::Landslide => "landslide",
            HazardKind::Seismic => "seismic",
            HazardKind::Weather => "weather",
            HazardKind::Fire => "fire",
        }
    }

    /// Human-facing name, used in popup titles and notices.
    pub fn title(self) -> &'static str {
        match self {
            HazardKind::Flood => "Flood",
            HazardKind::Landslide => "Landslide",
            HazardKind::Seismic => "Seismic",
            HazardKind::Weather => "Weather",
            HazardKind::Fire => "Fire",
        }
    }
}

impl fmt::Display for HazardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownHazardKind(pub String);

impl fmt::Display for UnknownHazardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown hazard kind: {}", self.0)
    }
}

impl std::error::Error for UnknownHazardKind {}

impl FromStr for HazardKind {
    type Err = UnknownHazardKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HazardKind::ALL
            .into_iter()
            .find(|k| k.path().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownHazardKind(s.to_string()))
    }
}

/// Geographic window a fetch is restricted to.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HazardScope {
    pub center: LatLng,
    pub radius_km: f64,
    /// Only events newer than this many hours, where the feed supports it.
    pub hours: Option<u32>,
}

impl HazardScope {
    pub fn new(center: LatLng, radius_km: f64) -> Self {
        Self {
            center,
            radius_km,
            hours: None,
        }
    }

    pub fn with_hours(mut self, hours: Option<u32>) -> Self {
        self.hours = hours;
        self
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("lat", self.center.lat.to_string()),
            ("lng", self.center.lng.to_string()),
            ("radiusKm", self.radius_km.to_string()),
        ];
        if let Some(hours) = self.hours {
            pairs.push(("hours", hours.to_string()));
        }
        pairs
    }
}

/// Query parameters as sent on the wire. Servers deserialize this.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(rename = "radiusKm")]
    pub radius_km: Option<f64>,
    pub hours: Option<u32>,
}

impl ScopeQuery {
    /// A scope only exists when both center coordinates are given.
    pub fn scope(&self, default_radius_km: f64) -> Option<HazardScope> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(
                HazardScope::new(
                    LatLng::new(lat, lng),
                    self.radius_km.unwrap_or(default_radius_km),
                )
                .with_hours(self.hours),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{HazardKind, HazardScope, ScopeQuery};
    use foundation::LatLng;
    use pretty_assertions::assert_eq;

    #[test]
    fn kinds_parse_from_paths() {
        for kind in HazardKind::ALL {
            assert_eq!(kind.path().parse::<HazardKind>(), Ok(kind));
        }
        assert_eq!("FLOOD".parse::<HazardKind>(), Ok(HazardKind::Flood));
        assert!("tsunami".parse::<HazardKind>().is_err());
    }

    #[test]
    fn scope_query_pairs() {
        let scope = HazardScope::new(LatLng::new(10.5, 122.25), 25.0).with_hours(Some(24));
        assert_eq!(
            scope.query_pairs(),
            vec![
                ("lat", "10.5".to_string()),
                ("lng", "122.25".to_string()),
                ("radiusKm", "25".to_string()),
                ("hours", "24".to_string()),
            ]
        );
    }

    #[test]
    fn scope_query_requires_center() {
        let q = ScopeQuery {
            lat: Some(10.0),
            ..ScopeQuery::default()
        };
        assert_eq!(q.scope(25.0), None);

        let q = ScopeQuery {
            lat: Some(10.0),
            lng: Some(122.0),
            radius_km: None,
            hours: Some(6),
        };
        let scope = q.scope(25.0).expect("scope");
        assert_eq!(scope.radius_km, 25.0);
        assert_eq!(scope.hours, Some(6));
    }
}
