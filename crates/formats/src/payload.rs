use serde_json::{Map, Value};
use thiserror::Error;

use crate::hazard::RiskClass;

/// One feature as it came off the wire, before geometry validation.
///
/// GeoJSON features keep their `geometry` value and `properties` object.
/// Flat records (station readings, event rows) have no `geometry` and the
/// whole record becomes `properties`; the normalizer then looks for
/// `latitude`/`longitude` fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeature {
    /// Position within the payload, used for fallback ids and logs.
    pub index: usize,
    pub id: Option<String>,
    pub geometry: Option<Value>,
    pub properties: Map<String, Value>,
    /// Filled in by the hazard source's classifier.
    pub risk: RiskClass,
}

impl RawFeature {
    pub fn new(index: usize, geometry: Option<Value>, properties: Map<String, Value>) -> Self {
        Self {
            index,
            id: None,
            geometry,
            properties,
            risk: RiskClass::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// First of `keys` that is present and not null.
    pub fn first_property(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|k| self.properties.get(*k))
            .find(|v| !v.is_null())
    }
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is neither a feature collection nor an array of records")]
    NotACollection,
}

/// Lenient reader for hazard feed responses.
///
/// Accepts `{ "features": [...] }` or a bare array of records. Items that are
/// not objects are kept as empty features so the normalizer can reject them
/// with a reason instead of the whole payload failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeaturePayload {
    pub features: Vec<RawFeature>,
}

impl FeaturePayload {
    pub fn from_json_str(input: &str, label: &str) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_str(input)?;
        Self::from_value(value, label)
    }

    /// `label` prefixes generated ids, e.g. `flood-3`.
    pub fn from_value(value: Value, label: &str) -> Result<Self, PayloadError> {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("features") {
                Some(Value::Array(items)) => items,
                Some(Value::Null) => Vec::new(),
                _ => return Err(PayloadError::NotACollection),
            },
            _ => return Err(PayloadError::NotACollection),
        };

        let features = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| parse_item(index, item, label))
            .collect();
        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn parse_item(index: usize, item: Value, label: &str) -> RawFeature {
    let Value::Object(mut obj) = item else {
        return RawFeature::new(index, None, Map::new()).with_id(format!("{label}-{index}"));
    };

    let is_geojson = obj.get("type").and_then(Value::as_str) == Some("Feature")
        || obj.contains_key("geometry")
        || obj.contains_key("properties");

    let (geometry, properties, top_level_id) = if is_geojson {
        let geometry = obj.remove("geometry").filter(|g| !g.is_null());
        let properties = match obj.remove("properties") {
            Some(Value::Object(props)) => props,
            _ => Map::new(),
        };
        (geometry, properties, obj.get("id").and_then(id_string))
    } else {
        (None, obj, None)
    };

    let id = properties
        .get("id")
        .and_then(id_string)
        .or(top_level_id)
        .unwrap_or_else(|| format!("{label}-{index}"));

    RawFeature::new(index, geometry, properties).with_id(id)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{FeaturePayload, PayloadError};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn reads_feature_collection() {
        let payload = FeaturePayload::from_value(
            json!({
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "id": 17,
                        "geometry": { "type": "Point", "coordinates": [122.55, 10.73] },
                        "properties": { "risk_level": 2.7 }
                    },
                    {
                        "type": "Feature",
                        "geometry": null,
                        "properties": { "id": "zone-a" }
                    }
                ]
            }),
            "flood",
        )
        .expect("parse payload");

        assert_eq!(payload.len(), 2);
        assert_eq!(payload.features[0].id.as_deref(), Some("17"));
        assert!(payload.features[0].geometry.is_some());
        assert_eq!(payload.features[1].id.as_deref(), Some("zone-a"));
        assert_eq!(payload.features[1].geometry, None);
    }

    #[test]
    fn reads_bare_record_array() {
        let payload = FeaturePayload::from_json_str(
            r#"[{"latitude": 10.7, "longitude": 122.5, "magnitude": 4.8}, 42]"#,
            "seismic",
        )
        .expect("parse payload");

        assert_eq!(payload.len(), 2);
        let first = &payload.features[0];
        assert_eq!(first.id.as_deref(), Some("seismic-0"));
        assert_eq!(first.geometry, None);
        assert_eq!(first.property("magnitude"), Some(&json!(4.8)));
        assert_eq!(payload.features[1].id.as_deref(), Some("seismic-1"));
        assert!(payload.features[1].properties.is_empty());
    }

    #[test]
    fn rejects_non_collections() {
        assert!(matches!(
            FeaturePayload::from_value(json!({"status": "ok"}), "x"),
            Err(PayloadError::NotACollection)
        ));
        assert!(matches!(
            FeaturePayload::from_json_str("{not json", "x"),
            Err(PayloadError::Json(_))
        ));
    }

    #[test]
    fn null_features_is_empty() {
        let payload =
            FeaturePayload::from_value(json!({"features": null}), "weather").expect("parse");
        assert!(payload.is_empty());
    }
}
