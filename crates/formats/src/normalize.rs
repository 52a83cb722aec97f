use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use foundation::{FeatureId, LatLng};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::hazard::{AttributeValue, GeometryKind, HazardFeature};
use crate::payload::RawFeature;

const LAT_KEYS: &[&str] = &["latitude", "lat"];
const LNG_KEYS: &[&str] = &["longitude", "lng", "lon"];
const TIMESTAMP_KEYS: &[&str] = &[
    "timestamp",
    "event_time",
    "recorded_at",
    "last_updated",
    "updated_at",
];

/// Why a raw feature could not become a [`HazardFeature`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejected {
    #[error("feature has no geometry and no latitude/longitude fields")]
    MissingGeometry,
    #[error("unsupported geometry type `{0}`")]
    UnknownGeometry(String),
    #[error("coordinates are not a position or ring")]
    MalformedCoordinates,
    #[error("polygon ring has {len} distinct vertices, need at least 3")]
    RingTooShort { len: usize },
    #[error("coordinate {index} is not finite")]
    NonFiniteCoordinate { index: usize },
    #[error("coordinate {index} is outside lat [-90, 90] / lng [-180, 180]")]
    OutOfRange { index: usize },
}

/// Converts one raw feature into canonical form. Pure; the caller logs.
///
/// Risk classification is taken from `raw.risk` as assigned by the source.
pub fn normalize(raw: &RawFeature) -> Result<HazardFeature, Rejected> {
    let (geometry_kind, coordinates) = match &raw.geometry {
        Some(geometry) => read_geometry(geometry)?,
        None => (GeometryKind::Point, vec![read_flat_position(&raw.properties)?]),
    };

    validate(&coordinates)?;

    let id = raw
        .id
        .clone()
        .unwrap_or_else(|| format!("feature-{}", raw.index));

    Ok(HazardFeature {
        id: FeatureId::new(id),
        geometry_kind,
        coordinates,
        risk_score: raw.risk.score,
        risk_level: raw.risk.level,
        attributes: attributes(&raw.properties),
        source_timestamp: timestamp(&raw.properties),
    })
}

fn read_geometry(geometry: &Value) -> Result<(GeometryKind, Vec<LatLng>), Rejected> {
    let obj = geometry.as_object().ok_or(Rejected::MalformedCoordinates)?;
    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Rejected::UnknownGeometry("<missing>".to_string()))?;
    let coords = obj.get("coordinates");

    match ty {
        "Point" => {
            let coords = coords.ok_or(Rejected::MalformedCoordinates)?;
            Ok((GeometryKind::Point, vec![read_position(coords)?]))
        }
        "Polygon" => {
            let rings = coords
                .and_then(Value::as_array)
                .ok_or(Rejected::MalformedCoordinates)?;
            Ok((GeometryKind::Polygon, read_ring(rings.first())?))
        }
        "MultiPolygon" => {
            let polygons = coords
                .and_then(Value::as_array)
                .ok_or(Rejected::MalformedCoordinates)?;
            let first_ring = match polygons.first() {
                Some(polygon) => polygon
                    .as_array()
                    .ok_or(Rejected::MalformedCoordinates)?
                    .first(),
                None => None,
            };
            Ok((GeometryKind::Polygon, read_ring(first_ring)?))
        }
        other => Err(Rejected::UnknownGeometry(other.to_string())),
    }
}

fn read_ring(ring: Option<&Value>) -> Result<Vec<LatLng>, Rejected> {
    let Some(ring) = ring else {
        return Err(Rejected::RingTooShort { len: 0 });
    };
    let positions = ring.as_array().ok_or(Rejected::MalformedCoordinates)?;
    let mut out = Vec::with_capacity(positions.len());
    for position in positions {
        out.push(read_position(position)?);
    }
    drop_closing_duplicate(&mut out);
    if out.len() < 3 {
        return Err(Rejected::RingTooShort { len: out.len() });
    }
    Ok(out)
}

/// `[lng, lat, ...]` or `{ "lat": .., "lng": .. }`.
fn read_position(value: &Value) -> Result<LatLng, Rejected> {
    match value {
        Value::Array(arr) if arr.len() >= 2 => {
            Ok(LatLng::new(component(&arr[1])?, component(&arr[0])?))
        }
        Value::Object(obj) => {
            let lat = pick(obj, LAT_KEYS).ok_or(Rejected::MalformedCoordinates)?;
            let lng = pick(obj, LNG_KEYS).ok_or(Rejected::MalformedCoordinates)?;
            Ok(LatLng::new(component(lat)?, component(lng)?))
        }
        _ => Err(Rejected::MalformedCoordinates),
    }
}

fn read_flat_position(properties: &Map<String, Value>) -> Result<LatLng, Rejected> {
    match (pick(properties, LAT_KEYS), pick(properties, LNG_KEYS)) {
        (Some(lat), Some(lng)) => Ok(LatLng::new(component(lat)?, component(lng)?)),
        (None, None) => Err(Rejected::MissingGeometry),
        _ => Err(Rejected::MalformedCoordinates),
    }
}

fn pick<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

/// Numbers and numeric strings. `null` reads as NaN so it is reported as a
/// non-finite coordinate with its index.
fn component(value: &Value) -> Result<f64, Rejected> {
    match value {
        Value::Number(n) => n.as_f64().ok_or(Rejected::MalformedCoordinates),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Rejected::MalformedCoordinates),
        Value::Null => Ok(f64::NAN),
        _ => Err(Rejected::MalformedCoordinates),
    }
}

fn drop_closing_duplicate(ring: &mut Vec<LatLng>) {
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
}

fn validate(coordinates: &[LatLng]) -> Result<(), Rejected> {
    for (index, p) in coordinates.iter().enumerate() {
        if !p.is_finite() {
            return Err(Rejected::NonFiniteCoordinate { index });
        }
        if !p.is_valid() {
            return Err(Rejected::OutOfRange { index });
        }
    }
    Ok(())
}

fn attributes(properties: &Map<String, Value>) -> BTreeMap<String, AttributeValue> {
    properties
        .iter()
        .filter_map(|(key, value)| {
            let attr = match value {
                Value::String(s) => AttributeValue::Text(s.clone()),
                Value::Number(n) => AttributeValue::Number(n.as_f64()?),
                Value::Bool(b) => AttributeValue::Bool(*b),
                _ => return None,
            };
            Some((key.clone(), attr))
        })
        .collect()
}

fn timestamp(properties: &Map<String, Value>) -> Option<DateTime<Utc>> {
    let value = TIMESTAMP_KEYS
        .iter()
        .filter_map(|k| properties.get(*k))
        .find(|v| !v.is_null())?;
    match value {
        Value::String(s) => parse_instant(s),
        Value::Number(n) => DateTime::from_timestamp_millis(n.as_i64()?),
        _ => None,
    }
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Offset-less timestamps are taken as UTC.
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::{Rejected, normalize};
    use crate::hazard::{AttributeValue, GeometryKind, RiskClass, RiskLevel};
    use crate::payload::{FeaturePayload, RawFeature};
    use foundation::LatLng;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, Value, json};

    fn geojson(geometry: Value) -> RawFeature {
        RawFeature::new(0, Some(geometry), Map::new()).with_id("f-0")
    }

    fn polygon(ring: Value) -> RawFeature {
        geojson(json!({ "type": "Polygon", "coordinates": [ring] }))
    }

    #[test]
    fn normalizes_polygon_first_ring_with_axis_swap() {
        let mut raw = polygon(json!([
            [122.55, 10.73],
            [122.551, 10.731],
            [122.55, 10.732],
            [122.55, 10.73]
        ]));
        raw.risk = RiskClass::new(2.7, RiskLevel::High);

        let feature = normalize(&raw).expect("valid polygon");
        assert_eq!(feature.geometry_kind, GeometryKind::Polygon);
        assert_eq!(
            feature.coordinates,
            vec![
                LatLng::new(10.73, 122.55),
                LatLng::new(10.731, 122.551),
                LatLng::new(10.732, 122.55),
            ]
        );
        assert_eq!(feature.risk_level, RiskLevel::High);
        assert_eq!(feature.id.as_str(), "f-0");
    }

    #[test]
    fn short_rings_are_rejected() {
        let rings = [
            json!([]),
            json!([[122.5, 10.7]]),
            json!([[122.5, 10.7], [122.6, 10.8]]),
            json!([[122.5, 10.7], [122.6, 10.8], [122.5, 10.7]]),
        ];
        let expected = [0, 1, 2, 2];
        for (ring, len) in rings.into_iter().zip(expected) {
            assert_eq!(
                normalize(&polygon(ring)),
                Err(Rejected::RingTooShort { len })
            );
        }
        let empty = geojson(json!({ "type": "Polygon", "coordinates": [] }));
        assert_eq!(normalize(&empty), Err(Rejected::RingTooShort { len: 0 }));
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let ring = json!([[122.5, 10.7], [122.6, null], [122.5, 10.9]]);
        assert_eq!(
            normalize(&polygon(ring)),
            Err(Rejected::NonFiniteCoordinate { index: 1 })
        );

        let ring = json!([[122.5, 10.7], [122.6, 10.8], ["NaN", 10.9]]);
        assert_eq!(
            normalize(&polygon(ring)),
            Err(Rejected::NonFiniteCoordinate { index: 2 })
        );

        let point = geojson(json!({ "type": "Point", "coordinates": ["inf", 10.0] }));
        assert_eq!(
            normalize(&point),
            Err(Rejected::NonFiniteCoordinate { index: 0 })
        );
    }

    #[test]
    fn out_of_range_and_malformed_inputs() {
        let point = geojson(json!({ "type": "Point", "coordinates": [200.0, 10.0] }));
        assert_eq!(normalize(&point), Err(Rejected::OutOfRange { index: 0 }));

        let point = geojson(json!({ "type": "Point", "coordinates": [1.0] }));
        assert_eq!(normalize(&point), Err(Rejected::MalformedCoordinates));

        let line = geojson(json!({ "type": "LineString", "coordinates": [] }));
        assert_eq!(
            normalize(&line),
            Err(Rejected::UnknownGeometry("LineString".to_string()))
        );

        let bare = RawFeature::new(3, None, Map::new());
        assert_eq!(normalize(&bare), Err(Rejected::MissingGeometry));

        let untyped = geojson(json!({ "coordinates": [1.0, 2.0] }));
        assert!(matches!(
            normalize(&untyped),
            Err(Rejected::UnknownGeometry(_))
        ));
    }

    #[test]
    fn multipolygon_takes_first_ring_of_first_polygon() {
        let raw = geojson(json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                [[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0]]]
            ]
        }));
        let feature = normalize(&raw).expect("valid multipolygon");
        assert_eq!(feature.coordinates.len(), 3);
        assert_eq!(feature.coordinates[1], LatLng::new(0.0, 1.0));
    }

    #[test]
    fn object_positions_are_accepted() {
        let raw = geojson(json!({
            "type": "Point",
            "coordinates": { "lat": 10.7, "lng": 122.5 }
        }));
        let feature = normalize(&raw).expect("valid point");
        assert_eq!(feature.coordinates, vec![LatLng::new(10.7, 122.5)]);
    }

    #[test]
    fn flat_records_become_points_with_attributes() {
        let payload = FeaturePayload::from_value(
            json!([{
                "id": 9,
                "latitude": "10.72",
                "longitude": 122.56,
                "location": "Jaro",
                "magnitude": 4.6,
                "verified": true,
                "extra": { "nested": 1 },
                "notes": null,
                "event_time": "2024-03-01T08:30:00"
            }]),
            "seismic",
        )
        .expect("parse");
        let feature = normalize(&payload.features[0]).expect("valid record");

        assert_eq!(feature.id.as_str(), "9");
        assert_eq!(feature.geometry_kind, GeometryKind::Point);
        assert_eq!(feature.coordinates, vec![LatLng::new(10.72, 122.56)]);
        assert_eq!(
            feature.attribute("location"),
            Some(&AttributeValue::Text("Jaro".to_string()))
        );
        assert_eq!(feature.number("magnitude"), Some(4.6));
        assert_eq!(feature.attribute("extra"), None);
        assert_eq!(feature.attribute("notes"), None);
        let ts = feature.source_timestamp.expect("timestamp");
        assert_eq!(ts.to_rfc3339(), "2024-03-01T08:30:00+00:00");
    }

    #[test]
    fn half_located_record_is_malformed() {
        let mut props = Map::new();
        props.insert("lat".to_string(), json!(10.0));
        let raw = RawFeature::new(0, None, props);
        assert_eq!(normalize(&raw), Err(Rejected::MalformedCoordinates));
    }

    #[test]
    fn epoch_millis_timestamps() {
        let mut props = Map::new();
        props.insert("lat".to_string(), json!(10.0));
        props.insert("lng".to_string(), json!(120.0));
        props.insert("timestamp".to_string(), json!(1_700_000_000_000_i64));
        let feature = normalize(&RawFeature::new(0, None, props)).expect("valid");
        assert_eq!(
            feature.source_timestamp.map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }
}
